//! Offline replay of recorded draw events.
//!
//! Seeds a session from a persisted collection through an in-memory draw
//! surface, applies each recorded event, and reports the value the form
//! field would hold at the end.

use carte_core::{CollectionError, FeatureCollection};
use carte_editor::bridge::{FieldSelector, FormFieldBridge, MemoryField};
use carte_editor::session::{DrawEventKind, DrawSession, MemorySurface, SurfaceError};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error("event log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event log must be a JSON array of events")]
    NotAnArray,
    #[error("event #{0} has unknown kind {1:?}")]
    UnknownKind(usize, String),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Debug)]
pub struct ReplaySummary {
    /// Final form field value.
    pub value: String,
    pub features: usize,
    pub seeded: usize,
    pub rejected: Vec<String>,
    /// Change notifications the form would have received.
    pub notifications: usize,
}

pub fn replay(initial: &str, events: &str) -> Result<ReplaySummary, ReplayError> {
    let initial = FeatureCollection::parse(initial)?;
    let events: Value = serde_json::from_str(events)?;
    let events = events.as_array().ok_or(ReplayError::NotAnArray)?;

    let field = Rc::new(RefCell::new(MemoryField::default()));
    let mut session = DrawSession::new();
    session.subscribe(Box::new(FormFieldBridge::new(
        Rc::clone(&field),
        FieldSelector::for_record("replay"),
    )));

    let seeded = session.on_map_ready(&initial, &mut MemorySurface::default())?;

    let mut rejected = Vec::new();
    for (index, event) in events.iter().enumerate() {
        let name = event.get("kind").and_then(Value::as_str).unwrap_or_default();
        let kind = DrawEventKind::parse(name)
            .ok_or_else(|| ReplayError::UnknownKind(index, name.to_string()))?;
        let report = session.apply_json(kind, event);
        rejected.extend(
            report
                .rejected
                .iter()
                .map(|e| format!("event #{index}: {e}")),
        );
    }

    let field = field.borrow();
    Ok(ReplaySummary {
        // An untouched session never writes the field.
        value: if field.changes == 0 {
            session.to_feature_collection().to_json_string()
        } else {
            field.value.clone()
        },
        features: session.store().len(),
        seeded: seeded.len(),
        rejected,
        notifications: field.changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EMPTY: &str = r#"{"type":"FeatureCollection","features":[]}"#;

    #[test]
    fn replays_create_update_delete() {
        let events = r#"[
            { "kind": "create", "features": [
                { "id": "a", "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [2.0, 48.0] } } ] },
            { "kind": "update", "features": [
                { "id": "a", "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [2.5, 48.5] } } ] },
            { "kind": "create", "features": [
                { "id": "b", "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [3.0, 49.0] } } ] },
            { "kind": "delete", "features": [ { "id": "b" } ] }
        ]"#;
        let summary = replay(EMPTY, events).unwrap();

        assert_eq!(summary.features, 1);
        assert_eq!(summary.notifications, 4);
        assert!(summary.rejected.is_empty());
        let fc = FeatureCollection::parse(&summary.value).unwrap();
        assert_eq!(fc.features[0].geometry.to_json()["coordinates"], serde_json::json!([2.5, 48.5]));
    }

    #[test]
    fn rejected_features_are_reported_with_their_event() {
        let events = r#"[ { "kind": "draw.create", "features": [ { "type": "Feature" } ] } ]"#;
        let summary = replay(EMPTY, events).unwrap();
        assert_eq!(summary.rejected.len(), 1);
        assert!(summary.rejected[0].starts_with("event #0:"));
    }

    #[test]
    fn unknown_kind_stops_the_replay() {
        let err = replay(EMPTY, r#"[ { "kind": "draw.combine", "features": [] } ]"#).unwrap_err();
        assert!(matches!(err, ReplayError::UnknownKind(0, k) if k == "draw.combine"));
    }

    #[test]
    fn empty_log_yields_empty_collection() {
        let summary = replay(EMPTY, "[]").unwrap();
        assert_eq!(summary.notifications, 0);
        assert!(FeatureCollection::parse(&summary.value).unwrap().is_empty());
    }
}
