use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    hash::{BuildHasherDefault, Hash, Hasher},
    ops::{Deref, Index},
};

use indexmap::IndexMap;
use itertools::Itertools;
use rustc_hash::FxHasher;
use serde::{
    de::{DeserializeSeed, Error as _},
    Deserialize, Deserializer, Serialize,
};

use crate::{
    error::InvalidLabel,
    fingerprint::{self, FastFingerprint, Fingerprint},
    natsort,
    validation::{self, ValidationScheme},
};

/// Label holding the metric name of a series.
pub const METRIC_NAME_LABEL: &str = "__name__";
pub const ALERT_NAME_LABEL: &str = "alertname";
pub const JOB_LABEL: &str = "job";
pub const INSTANCE_LABEL: &str = "instance";
pub const BUCKET_LABEL: &str = "le";
pub const QUANTILE_LABEL: &str = "quantile";
pub const ADDRESS_LABEL: &str = "__address__";
pub const SCHEME_LABEL: &str = "__scheme__";
pub const METRICS_PATH_LABEL: &str = "__metrics_path__";
pub const SCRAPE_INTERVAL_LABEL: &str = "__scrape_interval__";
pub const SCRAPE_TIMEOUT_LABEL: &str = "__scrape_timeout__";

/// Names starting with this prefix are reserved for internal use.
pub const RESERVED_LABEL_PREFIX: &str = "__";
pub const META_LABEL_PREFIX: &str = "__meta_";
pub const TMP_LABEL_PREFIX: &str = "__tmp_";
pub const PARAM_LABEL_PREFIX: &str = "__param_";

// See https://docs.rs/indexmap/latest/indexmap/#alternate-hashers
type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

macro_rules! label_string {
    ($name:ident) => {
        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<$name> for String {
            fn from(s: $name) -> Self {
                s.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// Name half of a label. Whether it is well-formed depends on the
/// [`ValidationScheme`] it is checked against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LabelName(String);

label_string!(LabelName);

impl LabelName {
    pub fn is_valid(&self, scheme: ValidationScheme) -> bool {
        scheme.is_valid_label_name(self.as_str())
    }

    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_LABEL_PREFIX)
    }
}

impl<'de> Deserialize<'de> for LabelName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        if !ValidationScheme::default().is_valid_label_name(&name) {
            return Err(D::Error::custom(InvalidLabel::name(name)));
        }
        Ok(Self(name))
    }
}

/// Value half of a label. The empty value means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelValue(String);

label_string!(LabelValue);

impl LabelValue {
    pub fn is_valid(&self) -> bool {
        validation::is_valid_label_value(self.as_str())
    }
}

/// Unordered mapping of label names to values identifying a series.
///
/// Equality, hashing, fingerprints and the textual form ignore insertion
/// order. Iteration yields pairs in insertion order, which callers must
/// not rely on. Nothing is validated on mutation; call
/// [`validate`](Self::validate) at the boundaries that need it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet(FxIndexMap<LabelName, LabelValue>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(FxIndexMap::with_capacity_and_hasher(
            capacity,
            Default::default(),
        ))
    }

    /// Builds a label set from raw bytes, rejecting names that are not
    /// valid under `scheme` and values that are not UTF-8.
    ///
    /// A repeated name keeps the last value.
    pub fn from_raw_pairs<I, N, V>(
        pairs: I,
        scheme: ValidationScheme,
    ) -> Result<Self, InvalidLabel>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        pairs
            .into_iter()
            .map(|(name, value)| {
                let (name, value) = (name.as_ref(), value.as_ref());
                let name = match std::str::from_utf8(name) {
                    Ok(name) if scheme.is_valid_label_name(name) => name,
                    _ => return Err(InvalidLabel::name(String::from_utf8_lossy(name))),
                };
                let value = std::str::from_utf8(value)
                    .map_err(|_| InvalidLabel::value(String::from_utf8_lossy(value)))?;
                Ok((LabelName::from(name), LabelValue::from(value)))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value of the label with given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(LabelValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Sets `name` to `value`, returning the previous value. An existing
    /// name keeps its iteration position.
    pub fn insert(
        &mut self,
        name: impl Into<LabelName>,
        value: impl Into<LabelValue>,
    ) -> Option<LabelValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<LabelValue> {
        self.0.shift_remove(name)
    }

    /// Retains only the labels specified by the predicate.
    pub fn retain<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&LabelName, &LabelValue) -> bool,
    {
        self.0.retain(|name, value| predicate(name, value))
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&LabelName, &LabelValue)> + '_ {
        self.0.iter()
    }

    /// Label names in byte order.
    pub fn names(&self) -> Vec<&LabelName> {
        let mut names = self.0.keys().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Checks every pair against `scheme`, failing on the first invalid
    /// name or value.
    pub fn validate(&self, scheme: ValidationScheme) -> Result<(), InvalidLabel> {
        for (name, value) in &self.0 {
            if !name.is_valid(scheme) {
                return Err(InvalidLabel::name(name.as_str()));
            }
            if !value.is_valid() {
                return Err(InvalidLabel::value(value.as_str()));
            }
        }
        Ok(())
    }

    /// Right-biased union: pairs of `other` win on overlapping names.
    /// Neither input is modified.
    pub fn merge(&self, other: &LabelSet) -> LabelSet {
        let mut merged = self.clone();
        merged
            .0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint::fingerprint(self)
    }

    pub fn fast_fingerprint(&self) -> FastFingerprint {
        fingerprint::fast_fingerprint(self)
    }

    /// Whether `self` sorts strictly before `other` in series order; see
    /// the [`Ord`] impl.
    pub fn before(&self, other: &LabelSet) -> bool {
        self.cmp(other) == Ordering::Less
    }

    /// Like the [`Display`](fmt::Display) form, but with pairs ordered by
    /// [`natsort::compare`] over the whole `name="value"` token.
    pub fn to_natural_string(&self) -> String {
        format!("{{{}}}", self.natural_tokens(None).join(", "))
    }

    /// `name="value"` tokens in natural order, leaving out `exclude`.
    pub(crate) fn natural_tokens(&self, exclude: Option<&str>) -> Vec<String> {
        let mut tokens = self
            .0
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != exclude)
            .map(|(name, value)| format!("{name}={}", Quoted(value)))
            .collect::<Vec<_>>();
        natsort::sort(&mut tokens);
        tokens
    }
}

/// Series order: fewer labels first; for equal sizes the values of the
/// union of names are compared in name byte order, and a name missing
/// on one side puts that side first.
impl Ord for LabelSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len().cmp(&other.len()).then_with(|| {
            for name in self.names().into_iter().merge(other.names()).dedup() {
                let ord = match (self.get(name), other.get(name)) {
                    (None, _) => Ordering::Less,
                    (_, None) => Ordering::Greater,
                    (Some(a), Some(b)) => a.cmp(b),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        })
    }
}

impl PartialOrd for LabelSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for LabelSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint().into());
    }
}

/// `{name1="value1", name2="value2"}` with pairs in name byte order.
impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, name) in self.names().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={}", Quoted(&self.0[name]))?;
        }
        f.write_str("}")
    }
}

impl Index<&str> for LabelSet {
    type Output = str;

    fn index(&self, name: &str) -> &Self::Output {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no label found for name {name:?}"),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<LabelName>,
    V: Into<LabelValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for LabelSet
where
    K: Into<LabelName>,
    V: Into<LabelValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = (&'a LabelName, &'a LabelValue);
    type IntoIter = indexmap::map::Iter<'a, LabelName, LabelValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for LabelSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        LabelSetSeed::default().deserialize(deserializer)
    }
}

/// Deserializes a [`LabelSet`] and validates it against `scheme`.
///
/// The plain [`Deserialize`] impl uses the default scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelSetSeed {
    pub scheme: ValidationScheme,
}

impl<'de> DeserializeSeed<'de> for LabelSetSeed {
    type Value = LabelSet;

    fn deserialize<D>(self, deserializer: D) -> Result<LabelSet, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = FxIndexMap::<String, String>::deserialize(deserializer)?;
        let labels = LabelSet(
            raw.into_iter()
                .map(|(name, value)| (LabelName(name), LabelValue(value)))
                .collect(),
        );
        if let Err(error) = labels.validate(self.scheme) {
            tracing::debug!(%error, scheme = %self.scheme, "rejecting label set");
            return Err(D::Error::custom(error));
        }
        Ok(labels)
    }
}

/// Double-quoted form of a value: `"` and `\` are backslash-escaped, as
/// are control characters.
pub(crate) struct Quoted<'a>(pub(crate) &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\u{07}' => f.write_str("\\a")?,
                '\u{08}' => f.write_str("\\b")?,
                '\u{0c}' => f.write_str("\\f")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                '\u{0b}' => f.write_str("\\v")?,
                c if c.is_ascii_control() => write!(f, "\\x{:02x}", c as u32)?,
                c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}
