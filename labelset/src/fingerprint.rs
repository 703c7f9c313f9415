//! 64-bit identity digests of label sets.
//!
//! Two hash spaces exist and are kept apart by type:
//!
//! - [`Fingerprint`] hashes all pairs in name byte order with FNV-1a.
//!   Equal label sets always produce equal fingerprints.
//! - [`FastFingerprint`] hashes every pair on its own and XORs the
//!   results, which skips the sort. Pairs whose hashes cancel out can make
//!   different label sets collide, so an equal fast fingerprint only
//!   means "possibly equal"; confirm with `==` on the label sets.
//!
//! Values from one space must never be compared with the other.

use std::{fmt, hash::Hasher, str::FromStr};

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::{error::ParseFingerprintError, labels::LabelSet};

/// Byte written after every label name and value. It can never occur in
/// UTF-8 text, so `{ab="c"}` and `{a="bc"}` hash differently.
pub const SEPARATOR_BYTE: u8 = 0xff;

/// Digest of the empty label set: the untouched FNV-1a offset basis.
pub const EMPTY_LABEL_SIGNATURE: u64 = 0xcbf29ce484222325;

macro_rules! fingerprint_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(fp: $name) -> Self {
                fp.0
            }
        }

        /// Sixteen lowercase hex digits.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016x}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseFingerprintError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                u64::from_str_radix(s, 16)
                    .map(Self)
                    .map_err(|source| ParseFingerprintError {
                        input: s.to_owned(),
                        source,
                    })
            }
        }
    };
}

fingerprint_type!(
    /// Order-independent digest of a label set's full content.
    Fingerprint
);

fingerprint_type!(
    /// Cheaper digest with a higher collision rate; see the module docs.
    FastFingerprint
);

pub fn fingerprint(labels: &LabelSet) -> Fingerprint {
    labels_to_signature(labels.iter().map(|(name, value)| (name.as_str(), value.as_str())))
}

pub fn fast_fingerprint(labels: &LabelSet) -> FastFingerprint {
    if labels.is_empty() {
        return FastFingerprint(EMPTY_LABEL_SIGNATURE);
    }
    let sum = labels.iter().fold(0u64, |acc, (name, value)| {
        let mut hasher = FnvHasher::default();
        hasher.write(name.as_bytes());
        hasher.write_u8(SEPARATOR_BYTE);
        hasher.write(value.as_bytes());
        acc ^ hasher.finish()
    });
    FastFingerprint(sum)
}

/// Canonical digest of arbitrary name/value pairs, in the same space as
/// [`fingerprint`].
pub fn labels_to_signature<'a, I>(pairs: I) -> Fingerprint
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs = pairs.into_iter().collect::<Vec<_>>();
    pairs.sort_unstable();
    Fingerprint(hash_pairs(pairs))
}

/// Canonical digest over only the labels in `names`. A name missing from
/// `labels` is hashed with an empty value.
pub fn signature_for_labels(labels: &LabelSet, names: &[&str]) -> Fingerprint {
    if names.is_empty() {
        return Fingerprint(EMPTY_LABEL_SIGNATURE);
    }
    let mut names = names.to_vec();
    names.sort_unstable();
    Fingerprint(hash_pairs(
        names
            .into_iter()
            .map(|name| (name, labels.get(name).unwrap_or_default())),
    ))
}

/// `signature_without_labels` is just as [`fingerprint`], but only for
/// labels not matching `names`.
pub fn signature_without_labels(labels: &LabelSet, names: &[&str]) -> Fingerprint {
    labels_to_signature(
        labels
            .iter()
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .map(|(name, value)| (name.as_str(), value.as_str())),
    )
}

fn hash_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> u64 {
    let mut hasher = FnvHasher::default();
    for (name, value) in pairs {
        hasher.write(name.as_bytes());
        hasher.write_u8(SEPARATOR_BYTE);
        hasher.write(value.as_bytes());
        hasher.write_u8(SEPARATOR_BYTE);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use itertools::Itertools;

    fn robot() -> LabelSet {
        LabelSet::from([
            ("first_name", "electro"),
            ("occupation", "robot"),
            ("manufacturer", "westinghouse"),
        ])
    }

    #[test]
    fn test_fingerprint_fixtures() {
        let empty = LabelSet::new();
        assert_eq!(u64::from(fingerprint(&empty)), 14695981039346656037);
        assert_eq!(u64::from(fast_fingerprint(&empty)), 14695981039346656037);
        assert_eq!(EMPTY_LABEL_SIGNATURE, 14695981039346656037);

        assert_eq!(robot().fingerprint().as_u64(), 5911716720268894962);
        assert_eq!(robot().fast_fingerprint().as_u64(), 11310079640881077873);

        let xy = LabelSet::from([("x", "y")]);
        assert_eq!(xy.fingerprint().as_u64(), 8241431561484471700);
        assert_eq!(xy.fast_fingerprint().as_u64(), 13948396922932177635);
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let reference = robot();
        let pairs = reference.iter().collect::<Vec<_>>();
        for perm in pairs.iter().permutations(pairs.len()) {
            let labels = perm
                .into_iter()
                .map(|&(name, value)| (name.clone(), value.clone()))
                .collect::<LabelSet>();
            assert_eq!(labels.fingerprint(), reference.fingerprint());
            assert_eq!(labels.fast_fingerprint(), reference.fast_fingerprint());
        }
        assert_eq!(reference.clone().fingerprint(), reference.fingerprint());
    }

    #[test]
    fn test_separator_disambiguates() {
        let a = LabelSet::from([("ab", "c")]);
        let b = LabelSet::from([("a", "bc")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fast_fingerprint(), b.fast_fingerprint());
    }

    #[test]
    fn test_fast_fingerprint_is_xor_of_pairs() {
        let a = LabelSet::from([("a", "1")]);
        let b = LabelSet::from([("b", "2")]);
        let ab = LabelSet::from([("a", "1"), ("b", "2")]);
        assert_eq!(
            ab.fast_fingerprint().as_u64(),
            a.fast_fingerprint().as_u64() ^ b.fast_fingerprint().as_u64()
        );
    }

    #[test]
    fn test_labels_to_signature() {
        assert_eq!(
            labels_to_signature(std::iter::empty()).as_u64(),
            EMPTY_LABEL_SIGNATURE
        );
        assert_eq!(
            labels_to_signature([
                ("occupation", "robot"),
                ("manufacturer", "westinghouse"),
                ("first_name", "electro"),
            ]),
            robot().fingerprint()
        );
    }

    #[test]
    fn test_signature_for_labels() {
        let labels = robot();
        assert_eq!(
            signature_for_labels(&labels, &[]).as_u64(),
            EMPTY_LABEL_SIGNATURE
        );
        assert_eq!(
            signature_for_labels(&labels, &["occupation", "first_name", "manufacturer"]),
            labels.fingerprint()
        );
        assert_eq!(
            signature_for_labels(&labels, &["occupation"]),
            LabelSet::from([("occupation", "robot")]).fingerprint()
        );
        // Missing names hash as empty values.
        assert_eq!(
            signature_for_labels(&labels, &["missing"]),
            LabelSet::from([("missing", "")]).fingerprint()
        );
    }

    #[test]
    fn test_signature_without_labels() {
        let labels = LabelSet::from([("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
        assert_eq!(
            signature_without_labels(&labels, &["a", "c"]),
            LabelSet::from([("b", "2"), ("d", "4")]).fingerprint()
        );
        assert_eq!(signature_without_labels(&labels, &[]), labels.fingerprint());
        assert_eq!(
            signature_without_labels(&labels, &["a", "b", "c", "d"]).as_u64(),
            EMPTY_LABEL_SIGNATURE
        );
    }

    #[test]
    fn test_fingerprint_text() {
        let fp = robot().fingerprint();
        expect!["520aa309145d62f2"].assert_eq(&fp.to_string());
        assert_eq!("520aa309145d62f2".parse::<Fingerprint>().unwrap(), fp);
        expect!["Fingerprint(5911716720268894962)"].assert_eq(&format!("{fp:?}"));
        expect!["0000000000000001"].assert_eq(&Fingerprint::from(1).to_string());

        let err = "xyz".parse::<FastFingerprint>().unwrap_err();
        expect![[r#"invalid fingerprint "xyz": invalid digit found in string"#]]
            .assert_eq(&err.to_string());
    }
}
