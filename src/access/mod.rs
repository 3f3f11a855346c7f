//! Chat-triggered access authorization.

pub mod classifier;
pub mod codec;
pub mod eligibility;
pub mod grant;
pub mod opening;
pub mod outcome;
pub mod phone;
pub mod service;
pub mod types;

pub use codec::TokenCodec;
pub use eligibility::{
    DwellerDirectoryValidator, EligibilityValidator, Validators, WhitelistValidator,
};
pub use grant::GrantExecutor;
pub use opening::{OpeningOutcome, OpeningRequest, OpeningService};
pub use outcome::Outcome;
pub use service::AccessService;
