//! Identity of monitoring time series.
//!
//! A [`LabelSet`] is an unordered mapping of label names to values. This
//! crate turns it into a canonical text form, two 64-bit digests
//! ([`Fingerprint`] and [`FastFingerprint`]) and a deterministic series
//! order, and wraps it in a copy-on-write [`Metric`].
//!
//! ```
//! use labelset::{LabelSet, Metric, ValidationScheme};
//!
//! let labels = LabelSet::from([("__name__", "up"), ("job", "api")]);
//! labels.validate(ValidationScheme::Legacy)?;
//! assert_eq!(labels.to_string(), r#"{__name__="up", job="api"}"#);
//!
//! let mut metric = Metric::from(labels.clone());
//! metric.set("instance", "host:9090");
//! assert_eq!(metric.to_string(), r#"up{instance="host:9090", job="api"}"#);
//! assert_ne!(metric.fingerprint(), labels.fingerprint());
//! # Ok::<(), labelset::InvalidLabel>(())
//! ```

mod error;
pub mod fingerprint;
mod labels;
mod metric;
pub mod natsort;
pub mod validation;

pub use {
    error::{Error, InvalidLabel, LabelField, ParseFingerprintError, Result},
    fingerprint::{FastFingerprint, Fingerprint},
    labels::*,
    metric::Metric,
    validation::ValidationScheme,
};
