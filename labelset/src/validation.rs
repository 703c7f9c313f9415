//! Label name/value grammar.
//!
//! There is no process-wide mode: every validating call takes the
//! [`ValidationScheme`] it should check against. Parse it once from
//! configuration and pass it down.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

static LEGACY_LABEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid regex"));

static LEGACY_METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("valid regex"));

/// Grammar that label and metric names must follow.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValidationScheme {
    /// Names must match `[a-zA-Z_][a-zA-Z0-9_]*` (metric names may also
    /// contain colons).
    Legacy,
    /// Any non-empty UTF-8 text is a valid name.
    #[default]
    Utf8,
}

impl ValidationScheme {
    pub fn is_valid_label_name(self, name: impl AsRef<[u8]>) -> bool {
        let name = name.as_ref();
        match self {
            ValidationScheme::Legacy => LEGACY_LABEL_NAME.is_match(name),
            ValidationScheme::Utf8 => !name.is_empty() && std::str::from_utf8(name).is_ok(),
        }
    }

    pub fn is_valid_metric_name(self, name: impl AsRef<[u8]>) -> bool {
        let name = name.as_ref();
        match self {
            ValidationScheme::Legacy => LEGACY_METRIC_NAME.is_match(name),
            ValidationScheme::Utf8 => !name.is_empty() && std::str::from_utf8(name).is_ok(),
        }
    }

    /// Values are unconstrained under both schemes beyond being UTF-8.
    pub fn is_valid_label_value(self, value: impl AsRef<[u8]>) -> bool {
        is_valid_label_value(value)
    }
}

pub fn is_valid_label_name(name: impl AsRef<[u8]>, scheme: ValidationScheme) -> bool {
    scheme.is_valid_label_name(name)
}

pub fn is_valid_metric_name(name: impl AsRef<[u8]>, scheme: ValidationScheme) -> bool {
    scheme.is_valid_metric_name(name)
}

/// An empty value is valid and means "unset".
pub fn is_valid_label_value(value: impl AsRef<[u8]>) -> bool {
    std::str::from_utf8(value.as_ref()).is_ok()
}
