use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for feature ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Identifier of a drawn feature, unique within an editing session.
///
/// Ids are assigned by the draw UI (mapbox-gl-draw hands out random hex
/// strings) and are interned so that store lookups compare a `Spur` instead
/// of a string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureId(Spur);

impl FeatureId {
    /// Intern a string as a FeatureId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        FeatureId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice. The interner is never cleared, so the
    /// text outlives the id.
    pub fn as_str(&self) -> &'static str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a process-unique id with a prefix (e.g. `draw_0`, `draw_1`).
    /// Used by native draw surfaces that have no UI to hand out ids.
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }

    /// Read a GeoJSON `id` member, which may be a string or a number.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::intern(s)),
            serde_json::Value::Number(n) => Some(Self::intern(&n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Debug for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FeatureId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FeatureId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FeatureId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = FeatureId::intern("3f9a1c");
        let b = FeatureId::intern("3f9a1c");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "3f9a1c");
    }

    #[test]
    fn resolved_text_outlives_the_id() {
        let ids = vec![FeatureId::intern("x1"), FeatureId::intern("x2")];
        let names: Vec<&'static str> = ids.into_iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["x1", "x2"]);
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = FeatureId::with_prefix("draw");
        let b = FeatureId::with_prefix("draw");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("draw_"));
    }

    #[test]
    fn numeric_json_ids_are_accepted() {
        let id = FeatureId::from_json(&serde_json::json!(42)).unwrap();
        assert_eq!(id.as_str(), "42");
        assert!(FeatureId::from_json(&serde_json::json!("")).is_none());
        assert!(FeatureId::from_json(&serde_json::Value::Null).is_none());
    }
}
