//! Phone number matching between chat senders and directory entries.
//!
//! Both sides are reduced to digits. When the sender's country code has a
//! known national format, both numbers are normalized to that format before
//! comparing; otherwise the raw digit strings must be equal.

/// Country code prefix length as it appears at the start of a sender JID.
const COUNTRY_CODE_LEN: usize = 2;

/// Countries with a national normalization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneLocale {
    Brazil,
}

impl PhoneLocale {
    pub fn from_country_code(code: &str) -> Option<Self> {
        match code {
            "55" => Some(Self::Brazil),
            _ => None,
        }
    }

    /// National form used for comparison, or `None` if the number does not fit.
    pub fn normalize(self, digits: &str) -> Option<String> {
        match self {
            Self::Brazil => normalize_brazilian(digits),
        }
    }
}

/// Keep only ASCII digits.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Reduce a Brazilian number to area code + 8-digit subscriber number.
///
/// Looks at the last 11 digits, so a leading country code is ignored. Ten
/// digits pass through. Eleven digits must carry the mobile `9` right after
/// the area code, which is dropped.
pub fn normalize_brazilian(digits: &str) -> Option<String> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let national = &digits[digits.len().saturating_sub(11)..];
    match national.len() {
        11 if national.as_bytes()[2] == b'9' => {
            Some(format!("{}{}", &national[..2], &national[3..]))
        }
        10 => Some(national.to_string()),
        _ => None,
    }
}

/// Sender's phone, pre-split for repeated matching against a directory.
#[derive(Debug, Clone)]
pub struct SenderPhone {
    digits: String,
    locale: Option<PhoneLocale>,
    national: Option<String>,
}

impl SenderPhone {
    /// Parse the local part of a sender JID.
    pub fn parse(phone: &str) -> Self {
        let digits = digits(phone);
        let locale = digits
            .get(..COUNTRY_CODE_LEN)
            .and_then(PhoneLocale::from_country_code);
        let national = locale.and_then(|l| l.normalize(&digits[COUNTRY_CODE_LEN..]));
        Self {
            digits,
            locale,
            national,
        }
    }

    pub fn locale(&self) -> Option<PhoneLocale> {
        self.locale
    }

    /// Whether a directory phone refers to this sender.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = digits(candidate);
        match self.locale {
            Some(locale) => {
                let Some(ref national) = self.national else {
                    return false;
                };
                let Some(stripped) = candidate.get(COUNTRY_CODE_LEN..) else {
                    return false;
                };
                locale.normalize(stripped).as_ref() == Some(national)
            }
            None => !self.digits.is_empty() && self.digits == candidate,
        }
    }
}
