//! Command grammar: `AC:<TYPE>(-<ARG>)?` anywhere in free text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::access::types::AccessType;

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"AC:([a-zA-Z0-9]+)(?:-([a-zA-Z0-9]+))?").expect("command pattern compiles")
});

/// What the classifier made of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No command in the text. Not an error from the sender's point of view.
    NotACommand,
    /// Command present but its type is not one we serve.
    UnknownType { tag: String },
    /// Known type without the token argument.
    MissingArgument { access_type: AccessType },
    /// Known type with its (still encrypted) token.
    Command {
        access_type: AccessType,
        argument: String,
    },
}

/// Classify a message text.
pub fn classify(text: &str) -> Classification {
    let Some(caps) = COMMAND_RE.captures(text) else {
        debug!(text_len = text.len(), "No access command in message");
        return Classification::NotACommand;
    };

    let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let argument = caps.get(2).map(|m| m.as_str().to_string());

    let Some(access_type) = AccessType::from_tag(tag) else {
        debug!(tag, "Unrecognized access type");
        return Classification::UnknownType {
            tag: tag.to_string(),
        };
    };

    match argument {
        Some(argument) => Classification::Command {
            access_type,
            argument,
        },
        None => Classification::MissingArgument { access_type },
    }
}
