use std::{fmt, ops::Deref, sync::Arc};

use serde::{Serialize, Serializer};

use crate::labels::{LabelName, LabelSet, LabelValue, METRIC_NAME_LABEL};

/// Identity of a single series: a label set behind a copy-on-write
/// ownership tag.
///
/// A metric starts out [`Shared`](Metric::Shared) with whoever produced
/// its labels. The first [`set`](Metric::set) or [`del`](Metric::del)
/// turns it [`Owned`](Metric::Owned), deep-copying the labels unless this
/// metric was their only holder. Cloning always yields a shared handle,
/// so edits made through one handle are never observed through another.
#[derive(Debug)]
pub enum Metric {
    Shared(Arc<LabelSet>),
    Owned(LabelSet),
}

impl Metric {
    pub fn new(labels: Arc<LabelSet>) -> Self {
        Metric::Shared(labels)
    }

    pub fn labels(&self) -> &LabelSet {
        match self {
            Metric::Shared(labels) => labels,
            Metric::Owned(labels) => labels,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Metric::Owned(_))
    }

    /// Value of the `__name__` label.
    pub fn name(&self) -> Option<&str> {
        self.labels().get(METRIC_NAME_LABEL)
    }

    pub fn set(
        &mut self,
        name: impl Into<LabelName>,
        value: impl Into<LabelValue>,
    ) -> Option<LabelValue> {
        self.to_mut().insert(name, value)
    }

    pub fn del(&mut self, name: &str) -> Option<LabelValue> {
        self.to_mut().remove(name)
    }

    /// Mutable access to the labels, taking ownership of them first.
    pub fn to_mut(&mut self) -> &mut LabelSet {
        match self {
            Metric::Shared(shared) => {
                let labels = Arc::try_unwrap(std::mem::take(shared)).unwrap_or_else(|shared| {
                    tracing::trace!(labels = shared.len(), "cloning shared label set on write");
                    LabelSet::clone(&shared)
                });
                *self = Metric::Owned(labels);
                match self {
                    Metric::Owned(labels) => labels,
                    Metric::Shared(_) => unreachable!(),
                }
            }
            Metric::Owned(labels) => labels,
        }
    }

    /// Returns another handle to the same labels without copying them.
    /// Both `self` and the returned metric end up shared.
    pub fn share(&mut self) -> Metric {
        if let Metric::Owned(labels) = self {
            *self = Metric::Shared(Arc::new(std::mem::take(labels)));
        }
        self.clone()
    }

    pub fn into_labels(self) -> LabelSet {
        match self {
            Metric::Shared(shared) => {
                Arc::try_unwrap(shared).unwrap_or_else(|shared| LabelSet::clone(&shared))
            }
            Metric::Owned(labels) => labels,
        }
    }
}

/// The returned metric is always shared; an owned original is copied
/// once so that neither side can see the other's later edits.
impl Clone for Metric {
    fn clone(&self) -> Self {
        match self {
            Metric::Shared(labels) => Metric::Shared(Arc::clone(labels)),
            Metric::Owned(labels) => Metric::Shared(Arc::new(labels.clone())),
        }
    }
}

impl Deref for Metric {
    type Target = LabelSet;

    fn deref(&self) -> &LabelSet {
        self.labels()
    }
}

impl AsRef<LabelSet> for Metric {
    fn as_ref(&self) -> &LabelSet {
        self.labels()
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Self) -> bool {
        self.labels() == other.labels()
    }
}

impl Eq for Metric {}

impl From<LabelSet> for Metric {
    fn from(labels: LabelSet) -> Self {
        Metric::Shared(Arc::new(labels))
    }
}

impl From<Arc<LabelSet>> for Metric {
    fn from(labels: Arc<LabelSet>) -> Self {
        Metric::Shared(labels)
    }
}

/// `name{label="value", ...}`: the metric name is printed bare in front
/// of the braces and the remaining labels follow in natural order.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        let tokens = self.labels().natural_tokens(Some(METRIC_NAME_LABEL));
        match name {
            Some(name) if tokens.is_empty() => f.write_str(name),
            _ => write!(f, "{}{{{}}}", name.unwrap_or_default(), tokens.join(", ")),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.labels().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn series() -> LabelSet {
        LabelSet::from([("__name__", "http_requests_total"), ("job", "api")])
    }

    #[test]
    fn test_set_does_not_touch_shared_original() {
        let original = Arc::new(series());
        let mut metric = Metric::new(Arc::clone(&original));
        assert!(!metric.is_owned());

        assert_eq!(metric.set("job", "web"), Some(LabelValue::from("api")));
        assert!(metric.is_owned());
        assert_eq!(metric.get("job"), Some("web"));
        assert_eq!(*original, series());

        metric.del("__name__");
        assert_eq!(metric.name(), None);
        assert_eq!(original.get("__name__"), Some("http_requests_total"));
    }

    #[test]
    fn test_del_takes_ownership() {
        let original = Arc::new(series());
        let mut metric = Metric::from(Arc::clone(&original));
        assert_eq!(metric.del("missing"), None);
        assert!(metric.is_owned());
        assert_eq!(metric.labels(), &*original);
    }

    #[test]
    fn test_unique_shared_labels_are_reused() {
        let mut metric = Metric::from(series());
        metric.set("env", "prod");
        assert!(metric.is_owned());
        assert_eq!(metric.len(), 3);
    }

    #[test]
    fn test_clone_isolates_edits() {
        let mut original = Metric::from(series());
        original.set("env", "prod");
        assert!(original.is_owned());

        let mut copy = original.clone();
        assert!(!copy.is_owned());
        assert_eq!(copy, original);

        copy.set("env", "dev");
        assert_eq!(original.get("env"), Some("prod"));
        assert_eq!(copy.get("env"), Some("dev"));

        original.del("env");
        assert_eq!(copy.get("env"), Some("dev"));
        assert!(!original.contains("env"));

        let mut again = copy.clone();
        again.del("job");
        assert_eq!(copy.get("job"), Some("api"));
    }

    #[test]
    fn test_share() {
        let mut original = Metric::from(series());
        original.set("env", "prod");

        let mut shared = original.share();
        assert!(!original.is_owned());
        assert!(!shared.is_owned());
        match (&original, &shared) {
            (Metric::Shared(a), Metric::Shared(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => unreachable!(),
        }

        shared.set("env", "dev");
        assert_eq!(original.get("env"), Some("prod"));
        assert_eq!(shared.get("env"), Some("dev"));
    }

    #[test]
    fn test_into_labels() {
        let metric = Metric::from(series());
        let copy = metric.clone();
        assert_eq!(metric.into_labels(), series());
        assert_eq!(copy.into_labels(), series());
    }

    #[test]
    fn test_identity_matches_labels() {
        let metric = Metric::from(series());
        assert_eq!(metric.fingerprint(), series().fingerprint());
        assert_eq!(metric.fast_fingerprint(), series().fast_fingerprint());

        let smaller = Metric::from(LabelSet::from([("__name__", "up")]));
        assert!(smaller.before(&metric));
        assert!(!metric.before(&smaller));
    }

    #[test]
    fn test_display() {
        let display = |pairs: &[(&str, &str)]| {
            Metric::from(pairs.iter().copied().collect::<LabelSet>()).to_string()
        };
        expect!["{}"].assert_eq(&display(&[]));
        expect!["test_metric"].assert_eq(&display(&[("__name__", "test_metric")]));
        expect![[r#"{foo="bar"}"#]].assert_eq(&display(&[("foo", "bar")]));
        expect![[r#"test_metric{foo="bar"}"#]]
            .assert_eq(&display(&[("__name__", "test_metric"), ("foo", "bar")]));
        expect![[r#"node_cpu{cpu2="x", cpu11="y", mode="idle \"busy\""}"#]].assert_eq(&display(
            &[
                ("mode", r#"idle "busy""#),
                ("cpu11", "y"),
                ("__name__", "node_cpu"),
                ("cpu2", "x"),
            ],
        ));
    }

    #[test]
    fn test_serialize() {
        let metric = Metric::from(LabelSet::from([("__name__", "up"), ("job", "api")]));
        expect![[r#"{"__name__":"up","job":"api"}"#]]
            .assert_eq(&serde_json::to_string(&metric).unwrap());
    }
}
