use std::num::ParseIntError;

use strum::{AsRefStr, Display};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidLabel(#[from] InvalidLabel),

    #[error(transparent)]
    ParseFingerprint(#[from] ParseFingerprintError),
}

/// Which half of a label pair failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LabelField {
    Name,
    Value,
}

/// A label name or value that is not well-formed under the active
/// [`ValidationScheme`](crate::ValidationScheme).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} {content:?}")]
pub struct InvalidLabel {
    pub field: LabelField,
    pub content: String,
}

impl InvalidLabel {
    pub(crate) fn name(content: impl Into<String>) -> Self {
        Self {
            field: LabelField::Name,
            content: content.into(),
        }
    }

    pub(crate) fn value(content: impl Into<String>) -> Self {
        Self {
            field: LabelField::Value,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint {input:?}: {source}")]
pub struct ParseFingerprintError {
    pub input: String,
    #[source]
    pub source: ParseIntError,
}
