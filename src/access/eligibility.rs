//! Eligibility strategies: pre-registered whitelist and occupant directory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::access::phone::SenderPhone;
use crate::access::types::{
    AccessRequest, AccessType, DecisionReason, EligibilityDecision, GrantTarget, WhitelistKey,
};
use crate::error::Error;
use crate::panel::RemoteDirectoryClient;
use crate::store::WhitelistStore;

/// Decides whether a requester may open a target.
#[async_trait]
pub trait EligibilityValidator: Send + Sync {
    async fn check(
        &self,
        request: &AccessRequest,
        target: &GrantTarget,
    ) -> Result<EligibilityDecision, Error>;
}

/// Grants when the exact target tuple is whitelisted and active.
pub struct WhitelistValidator {
    store: Arc<dyn WhitelistStore>,
}

impl WhitelistValidator {
    pub fn new(store: Arc<dyn WhitelistStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EligibilityValidator for WhitelistValidator {
    async fn check(
        &self,
        request: &AccessRequest,
        target: &GrantTarget,
    ) -> Result<EligibilityDecision, Error> {
        let key = WhitelistKey::from(target);
        match self.store.find_active(&key).await? {
            Some(entry) => {
                debug!(entry_id = %entry.id, "Whitelist target matched");
                Ok(EligibilityDecision::grant(DecisionReason::WhitelistMatch))
            }
            None => {
                warn!(
                    phone = request.phone(),
                    account_id = %target.account_id,
                    command_id = %target.command_id,
                    reader_id = %target.reader_id,
                    receiver_id = %target.receiver_id,
                    "Access denied for whitelist validation"
                );
                Ok(EligibilityDecision::deny(DecisionReason::WhitelistMissing))
            }
        }
    }
}

/// Grants when the sender's phone belongs to an occupant of the account.
///
/// Pages are fetched one after another; the next page is only requested once
/// the previous one has been scanned without a match.
pub struct DwellerDirectoryValidator {
    directory: Arc<dyn RemoteDirectoryClient>,
    page_size: u32,
    max_pages: u32,
}

impl DwellerDirectoryValidator {
    pub fn new(directory: Arc<dyn RemoteDirectoryClient>, page_size: u32, max_pages: u32) -> Self {
        Self {
            directory,
            page_size,
            max_pages,
        }
    }
}

#[async_trait]
impl EligibilityValidator for DwellerDirectoryValidator {
    async fn check(
        &self,
        request: &AccessRequest,
        target: &GrantTarget,
    ) -> Result<EligibilityDecision, Error> {
        let sender = SenderPhone::parse(request.phone());
        let mut page = 0u32;

        loop {
            if page >= self.max_pages {
                warn!(
                    phone = request.phone(),
                    account_id = %target.account_id,
                    pages = page,
                    "Dweller directory never reported its last page, giving up"
                );
                return Ok(EligibilityDecision::deny(DecisionReason::DirectoryExhausted));
            }

            let listing = self
                .directory
                .list_dwellers(&target.account_id, page, self.page_size)
                .await?;

            let is_dweller = listing
                .records
                .iter()
                .flat_map(|record| record.phones.iter())
                .any(|entry| sender.matches(&entry.phone));

            if is_dweller {
                debug!(page, "Dweller phone matched");
                return Ok(EligibilityDecision::grant(DecisionReason::DwellerMatch));
            }

            if listing.is_last_page {
                break;
            }
            page += 1;
        }

        info!(
            phone = request.phone(),
            account_id = %target.account_id,
            command_id = %target.command_id,
            reader_id = %target.reader_id,
            receiver_id = %target.receiver_id,
            "Access denied for dweller validation"
        );
        Ok(EligibilityDecision::deny(DecisionReason::DwellerMissing))
    }
}

/// The two strategies, selected by access type.
pub struct Validators {
    pub whitelist: WhitelistValidator,
    pub dweller: DwellerDirectoryValidator,
}

impl Validators {
    pub fn for_type(&self, access_type: AccessType) -> &dyn EligibilityValidator {
        match access_type {
            AccessType::Dweller => &self.dweller,
            AccessType::Whitelist => &self.whitelist,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::access::types::{
        AccessToken, DwellerPage, DwellerRecord, PhoneEntry, WhitelistEntry,
    };
    use crate::error::{DatabaseError, RemoteError};

    struct FixedWhitelist(Option<WhitelistEntry>);

    #[async_trait]
    impl WhitelistStore for FixedWhitelist {
        async fn find_active(
            &self,
            _key: &WhitelistKey,
        ) -> Result<Option<WhitelistEntry>, DatabaseError> {
            Ok(self.0.clone())
        }

        async fn upsert(
            &self,
            _key: &WhitelistKey,
            _active: bool,
        ) -> Result<WhitelistEntry, DatabaseError> {
            unimplemented!("not used in validator tests")
        }
    }

    /// Serves canned pages and records which ones were requested.
    struct PagedDirectory {
        pages: Vec<DwellerPage>,
        requested: Mutex<Vec<u32>>,
    }

    impl PagedDirectory {
        fn new(pages: Vec<DwellerPage>) -> Self {
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteDirectoryClient for PagedDirectory {
        async fn list_dwellers(
            &self,
            _account_id: &str,
            page: u32,
            page_size: u32,
        ) -> Result<DwellerPage, RemoteError> {
            assert_eq!(page_size, 50);
            self.requested.lock().unwrap().push(page);
            self.pages
                .get(page as usize)
                .cloned()
                .ok_or_else(|| RemoteError::Status {
                    service: "directory".into(),
                    status: 404,
                    body: String::new(),
                })
        }
    }

    fn page(phones: &[&str], is_last_page: bool) -> DwellerPage {
        DwellerPage {
            records: vec![DwellerRecord {
                name: None,
                phones: phones
                    .iter()
                    .map(|p| PhoneEntry {
                        phone: p.to_string(),
                    })
                    .collect(),
            }],
            is_last_page,
        }
    }

    fn request(jid: &str, access_type: AccessType) -> (AccessRequest, GrantTarget) {
        let token = AccessToken::new("1001", "7", "3", "12");
        let target = token.complete().unwrap();
        (
            AccessRequest {
                sender_jid: jid.into(),
                display_name: "Ana".into(),
                raw_text: String::new(),
                access_type,
                token,
            },
            target,
        )
    }

    // ── Whitelist ───────────────────────────────────────────────────

    #[tokio::test]
    async fn whitelist_grants_active_entry() {
        let (req, target) = request("5511987654321@s.whatsapp.net", AccessType::Whitelist);
        let entry = WhitelistEntry {
            id: uuid::Uuid::new_v4(),
            key: WhitelistKey::from(&target),
            active: true,
        };
        let validator = WhitelistValidator::new(Arc::new(FixedWhitelist(Some(entry))));
        let decision = validator.check(&req, &target).await.unwrap();
        assert_eq!(decision, EligibilityDecision::grant(DecisionReason::WhitelistMatch));
    }

    #[tokio::test]
    async fn whitelist_denies_absent_entry() {
        let (req, target) = request("5511987654321@s.whatsapp.net", AccessType::Whitelist);
        let validator = WhitelistValidator::new(Arc::new(FixedWhitelist(None)));
        let decision = validator.check(&req, &target).await.unwrap();
        assert!(!decision.granted);
        assert_eq!(decision.reason, DecisionReason::WhitelistMissing);
    }

    // ── Dweller ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn dweller_match_on_first_page_stops() {
        let directory = Arc::new(PagedDirectory::new(vec![
            page(&["+55 (11) 98765-4321"], false),
            page(&[], true),
        ]));
        let validator = DwellerDirectoryValidator::new(directory.clone(), 50, 10);
        let (req, target) = request("551187654321@s.whatsapp.net", AccessType::Dweller);

        let decision = validator.check(&req, &target).await.unwrap();
        assert!(decision.granted);
        assert_eq!(directory.requested(), vec![0]);
    }

    #[tokio::test]
    async fn dweller_match_on_later_page() {
        let directory = Arc::new(PagedDirectory::new(vec![
            page(&["+55 21 99999-0000"], false),
            page(&["+55 11 98765-4321"], true),
        ]));
        let validator = DwellerDirectoryValidator::new(directory.clone(), 50, 10);
        let (req, target) = request("5511987654321@s.whatsapp.net", AccessType::Dweller);

        let decision = validator.check(&req, &target).await.unwrap();
        assert_eq!(decision.reason, DecisionReason::DwellerMatch);
        assert_eq!(directory.requested(), vec![0, 1]);
    }

    #[tokio::test]
    async fn dweller_pagination_stops_at_last_page() {
        let directory = Arc::new(PagedDirectory::new(vec![
            page(&["+55 21 99999-0000"], false),
            page(&["+55 31 98888-1111"], true),
            page(&["+55 11 98765-4321"], true),
        ]));
        let validator = DwellerDirectoryValidator::new(directory.clone(), 50, 10);
        let (req, target) = request("5511987654321@s.whatsapp.net", AccessType::Dweller);

        let decision = validator.check(&req, &target).await.unwrap();
        assert!(!decision.granted);
        assert_eq!(decision.reason, DecisionReason::DwellerMissing);
        assert_eq!(directory.requested(), vec![0, 1]);
    }

    #[tokio::test]
    async fn dweller_pagination_ceiling() {
        let directory = Arc::new(PagedDirectory::new(vec![page(&[], false); 5]));
        let validator = DwellerDirectoryValidator::new(directory.clone(), 50, 3);
        let (req, target) = request("5511987654321@s.whatsapp.net", AccessType::Dweller);

        let decision = validator.check(&req, &target).await.unwrap();
        assert_eq!(decision.reason, DecisionReason::DirectoryExhausted);
        assert_eq!(directory.requested(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn dweller_without_marker_never_matches() {
        let directory = Arc::new(PagedDirectory::new(vec![page(&["+55 11 88765-4321"], true)]));
        let validator = DwellerDirectoryValidator::new(directory, 50, 10);
        let (req, target) = request("5511887654321@s.whatsapp.net", AccessType::Dweller);

        let decision = validator.check(&req, &target).await.unwrap();
        assert!(!decision.granted);
    }

    #[tokio::test]
    async fn dweller_foreign_number_uses_raw_digits() {
        let directory = Arc::new(PagedDirectory::new(vec![page(&["+1 415 555 0123"], true)]));
        let validator = DwellerDirectoryValidator::new(directory, 50, 10);
        let (req, target) = request("14155550123@s.whatsapp.net", AccessType::Dweller);

        assert!(validator.check(&req, &target).await.unwrap().granted);
    }

    #[tokio::test]
    async fn directory_error_propagates() {
        let directory = Arc::new(PagedDirectory::new(vec![]));
        let validator = DwellerDirectoryValidator::new(directory, 50, 10);
        let (req, target) = request("5511987654321@s.whatsapp.net", AccessType::Dweller);

        assert!(matches!(
            validator.check(&req, &target).await,
            Err(Error::Remote(_))
        ));
    }
}
