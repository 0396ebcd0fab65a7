//! Draw session: reconciles draw UI events with the geometry store.
//!
//! The session owns the authoritative `GeometryStore`. The external draw
//! UI is a rendering surface that mirrors it:
//!
//! - **UI → store**: create/update/delete events are applied feature by
//!   feature. A malformed feature is rejected on its own; the rest of the
//!   payload still applies.
//! - **store → UI**: on map load, persisted user selections are pushed to
//!   the draw surface and re-keyed under the id the surface hands back.
//!
//! Every mutation path notifies the subscribed observers, so a host UI (or
//! the form field bridge) reacts deterministically instead of relying on a
//! re-render cycle.
//!
//! Persisted ids do not survive a reload: the draw surface assigns fresh
//! ids when features are re-added. Events after a reload refer to the new
//! ids, which is what the store is keyed by.

use carte_core::{
    Feature, FeatureCollection, FeatureId, FeatureSource, Geometry, GeometryStore, InvalidFeature,
};
use serde_json::Value;
use thiserror::Error;

// ─── Events ───────────────────────────────────────────────────────────────

/// An event emitted by the draw UI.
#[derive(Debug, Clone)]
pub enum DrawEvent {
    Create(Vec<Feature>),
    Update(Vec<Feature>),
    Delete(Vec<Feature>),
}

/// Event kind without payload, as named by the draw UI (`draw.create`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawEventKind {
    Create,
    Update,
    Delete,
}

impl DrawEventKind {
    /// Accepts both the bare (`create`) and namespaced (`draw.create`) names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.strip_prefix("draw.").unwrap_or(name) {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Outcome of applying one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Ids that were inserted, replaced, or removed.
    pub applied: Vec<FeatureId>,
    pub rejected: Vec<InvalidFeature>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

// ─── Observers ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    /// Persisted features were pushed to the draw surface on map load.
    Seeded,
}

/// A store mutation, delivered to observers after it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub kind: ChangeKind,
    pub ids: Vec<FeatureId>,
}

/// Reacts to store mutations. Closures taking `(&StoreChange, &GeometryStore)`
/// are observers too.
pub trait SessionObserver {
    fn store_changed(&mut self, change: &StoreChange, store: &GeometryStore);
}

impl<F> SessionObserver for F
where
    F: FnMut(&StoreChange, &GeometryStore),
{
    fn store_changed(&mut self, change: &StoreChange, store: &GeometryStore) {
        self(change, store)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ─── Draw surface ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("draw control is not mounted")]
    Unavailable,
    #[error("draw control refused the geometry: {0}")]
    Rejected(String),
}

/// The external draw UI, seen from the session.
pub trait DrawSurface {
    /// Show `geometry` as an editable shape. Returns the id the UI assigned,
    /// under which later update/delete events will refer to it.
    fn add(&mut self, geometry: &Geometry) -> Result<FeatureId, SurfaceError>;
}

// ─── Session ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct DrawSession {
    store: GeometryStore,
    observers: Vec<(SubscriptionId, Box<dyn SessionObserver>)>,
    next_subscription: u64,
    /// Set once the map has loaded and the surface has been seeded.
    ready: bool,
}

impl DrawSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &GeometryStore {
        &self.store
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        self.store.to_feature_collection()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    // ─── UI → store ───────────────────────────────────────────────────────

    pub fn apply(&mut self, event: DrawEvent) -> ApplyReport {
        match event {
            DrawEvent::Create(features) => self.on_create(features),
            DrawEvent::Update(features) => self.on_update(features),
            DrawEvent::Delete(features) => self.on_delete(features),
        }
    }

    /// Apply a raw draw UI event body (`{"features": [...]}`).
    pub fn apply_json(&mut self, kind: DrawEventKind, payload: &Value) -> ApplyReport {
        if kind == DrawEventKind::Delete {
            // Deletion only needs ids; geometry may be absent or stale.
            let mut ids = Vec::new();
            let mut rejected = Vec::new();
            match payload.get("features").and_then(Value::as_array) {
                Some(items) => {
                    for item in items {
                        match item.get("id").and_then(FeatureId::from_json) {
                            Some(id) => ids.push(id),
                            None => rejected.push(InvalidFeature::MissingId),
                        }
                    }
                }
                None => rejected.push(InvalidFeature::Payload(payload.to_string())),
            }
            let mut report = self.delete_ids(ids);
            report.rejected.extend(rejected);
            return report;
        }

        let mut features = Vec::new();
        let mut rejected = Vec::new();
        for parsed in FeatureCollection::parse_event_features(payload) {
            match parsed {
                Ok(f) => features.push(f),
                Err(e) => {
                    log::warn!("rejecting draw {kind:?} feature: {e}");
                    rejected.push(e);
                }
            }
        }
        let mut report = match kind {
            DrawEventKind::Create => self.on_create(features),
            _ => self.on_update(features),
        };
        report.rejected.extend(rejected);
        report
    }

    /// Features drawn by the user: tagged as user selections, then stored.
    pub fn on_create(&mut self, features: Vec<Feature>) -> ApplyReport {
        let features = features
            .into_iter()
            .map(|mut f| {
                f.source = FeatureSource::UserSelection;
                f
            })
            .collect();
        self.upsert_all(features, ChangeKind::Created)
    }

    /// Features edited in the UI: replaced by id.
    pub fn on_update(&mut self, features: Vec<Feature>) -> ApplyReport {
        self.upsert_all(features, ChangeKind::Updated)
    }

    pub fn on_delete(&mut self, features: Vec<Feature>) -> ApplyReport {
        let mut ids = Vec::with_capacity(features.len());
        let mut rejected = Vec::new();
        for f in features {
            match f.id {
                Some(id) => ids.push(id),
                None => rejected.push(InvalidFeature::MissingId),
            }
        }
        let mut report = self.delete_ids(ids);
        report.rejected.extend(rejected);
        report
    }

    fn upsert_all(&mut self, features: Vec<Feature>, kind: ChangeKind) -> ApplyReport {
        let mut report = ApplyReport::default();
        for feature in features {
            match self.store.upsert(feature) {
                Ok(id) => {
                    log::debug!("{kind:?} feature {id}");
                    report.applied.push(id);
                }
                Err(e) => {
                    log::warn!("rejecting {kind:?} feature: {e}");
                    report.rejected.push(e);
                }
            }
        }
        self.notify(kind, &report.applied);
        report
    }

    fn delete_ids(&mut self, ids: Vec<FeatureId>) -> ApplyReport {
        let mut report = ApplyReport::default();
        for id in ids {
            if self.store.remove(id) {
                log::debug!("Deleted feature {id}");
                report.applied.push(id);
            } else {
                log::debug!("delete of unknown feature {id} ignored");
            }
        }
        self.notify(ChangeKind::Deleted, &report.applied);
        report
    }

    // ─── store → UI ───────────────────────────────────────────────────────

    /// Push the persisted user selections of `initial` to the draw surface
    /// and seed the store under the ids the surface assigns. Reference
    /// overlays are left alone. Runs once; later calls return no ids.
    ///
    /// # Errors
    /// Stops at the first `SurfaceError`. Features added before the failure
    /// stay in the store, since the surface shows them.
    pub fn on_map_ready(
        &mut self,
        initial: &FeatureCollection,
        surface: &mut dyn DrawSurface,
    ) -> Result<Vec<FeatureId>, SurfaceError> {
        if self.ready {
            log::debug!("map already seeded, ignoring repeated load");
            return Ok(Vec::new());
        }
        self.ready = true;

        let mut seeded = Vec::new();
        let mut failure = None;
        for selection in initial.selections() {
            match surface.add(&selection.geometry) {
                Ok(ui_id) => {
                    if let Some(old) = selection.id
                        && old != ui_id
                    {
                        log::debug!("persisted feature {old} re-added as {ui_id}");
                    }
                    let feature = Feature::new(ui_id, selection.geometry.clone());
                    if let Ok(id) = self.store.upsert(feature) {
                        seeded.push(id);
                    }
                }
                Err(e) => {
                    log::warn!("draw surface refused persisted feature: {e}");
                    failure = Some(e);
                    break;
                }
            }
        }
        self.notify(ChangeKind::Seeded, &seeded);

        match failure {
            Some(e) => Err(e),
            None => Ok(seeded),
        }
    }

    fn notify(&mut self, kind: ChangeKind, ids: &[FeatureId]) {
        if ids.is_empty() {
            return;
        }
        let change = StoreChange {
            kind,
            ids: ids.to_vec(),
        };
        for (_, observer) in &mut self.observers {
            observer.store_changed(&change, &self.store);
        }
    }
}

/// A draw surface with no UI: hands out `draw_N` ids and remembers what it
/// was given. Used for offline replay and tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub shapes: Vec<(FeatureId, Geometry)>,
}

impl DrawSurface for MemorySurface {
    fn add(&mut self, geometry: &Geometry) -> Result<FeatureId, SurfaceError> {
        let id = FeatureId::with_prefix("draw");
        self.shapes.push((id, geometry.clone()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carte_core::Position;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn point(id: &str, lon: f64) -> Feature {
        Feature::new(FeatureId::intern(id), Geometry::Point(Position::new(lon, 48.0)))
    }

    fn recorder(session: &mut DrawSession) -> Rc<RefCell<Vec<StoreChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        session.subscribe(Box::new(move |change: &StoreChange, _: &GeometryStore| {
            sink.borrow_mut().push(change.clone());
        }));
        log
    }

    #[test]
    fn event_kind_names() {
        assert_eq!(DrawEventKind::parse("draw.create"), Some(DrawEventKind::Create));
        assert_eq!(DrawEventKind::parse("update"), Some(DrawEventKind::Update));
        assert_eq!(DrawEventKind::parse("draw.selectionchange"), None);
    }

    #[test]
    fn create_retags_reference_payloads() {
        let mut session = DrawSession::new();
        let mut f = point("s1", 2.0);
        f.source = FeatureSource::Reference("cadastre".into());

        let report = session.on_create(vec![f]);
        assert!(report.is_clean());
        assert!(session.store().get(FeatureId::intern("s1")).unwrap().source.is_user_selection());
    }

    #[test]
    fn update_of_reference_is_rejected() {
        let mut session = DrawSession::new();
        let mut f = point("s2", 2.0);
        f.source = FeatureSource::Reference("cadastre".into());

        let report = session.on_update(vec![f]);
        assert!(report.applied.is_empty());
        assert_eq!(
            report.rejected,
            vec![InvalidFeature::ReferenceFeature(FeatureId::intern("s2"))]
        );
    }

    #[test]
    fn every_mutation_path_notifies() {
        let mut session = DrawSession::new();
        let log = recorder(&mut session);

        session.on_create(vec![point("n1", 1.0)]);
        session.on_update(vec![point("n1", 2.0)]);
        session.on_delete(vec![point("n1", 2.0)]);

        let kinds: Vec<ChangeKind> = log.borrow().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]
        );
    }

    #[test]
    fn no_op_events_do_not_notify() {
        let mut session = DrawSession::new();
        let log = recorder(&mut session);

        session.on_delete(vec![point("ghost", 0.0)]);
        session.on_create(vec![]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut session = DrawSession::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let sub = session.subscribe(Box::new(move |_: &StoreChange, _: &GeometryStore| {
            *sink.borrow_mut() += 1;
        }));

        session.on_create(vec![point("u1", 1.0)]);
        assert!(session.unsubscribe(sub));
        assert!(!session.unsubscribe(sub));
        session.on_create(vec![point("u2", 1.0)]);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn json_batch_rejects_only_the_bad_feature() {
        let mut session = DrawSession::new();
        let report = session.apply_json(
            DrawEventKind::Create,
            &json!({ "features": [
                { "id": "j1", "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [2.0, 48.0] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [2.0, 48.0] } },
                { "id": "j3", "type": "Feature", "properties": {} },
            ]}),
        );

        assert_eq!(report.applied, vec![FeatureId::intern("j1")]);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn json_delete_needs_only_ids() {
        let mut session = DrawSession::new();
        session.on_create(vec![point("d1", 1.0), point("d2", 2.0)]);

        let report = session.apply_json(
            DrawEventKind::Delete,
            &json!({ "features": [ { "id": "d1" }, { "type": "Feature" } ] }),
        );
        assert_eq!(report.applied, vec![FeatureId::intern("d1")]);
        assert_eq!(report.rejected, vec![InvalidFeature::MissingId]);
        assert_eq!(session.store().ids().collect::<Vec<_>>(), vec![FeatureId::intern("d2")]);
    }

    #[test]
    fn map_ready_runs_once() {
        let initial = FeatureCollection::new(vec![point("persisted", 3.0)]);
        let mut session = DrawSession::new();
        let mut surface = MemorySurface::default();

        let first = session.on_map_ready(&initial, &mut surface).unwrap();
        let second = session.on_map_ready(&initial, &mut surface).unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(surface.shapes.len(), 1);
        assert!(session.is_ready());
    }

    struct BrokenSurface {
        accepted: usize,
    }

    impl DrawSurface for BrokenSurface {
        fn add(&mut self, _: &Geometry) -> Result<FeatureId, SurfaceError> {
            if self.accepted == 0 {
                return Err(SurfaceError::Unavailable);
            }
            self.accepted -= 1;
            Ok(FeatureId::with_prefix("broken"))
        }
    }

    #[test]
    fn surface_failure_keeps_what_was_added() {
        let initial = FeatureCollection::new(vec![point("a", 1.0), point("b", 2.0)]);
        let mut session = DrawSession::new();
        let log = recorder(&mut session);

        let err = session
            .on_map_ready(&initial, &mut BrokenSurface { accepted: 1 })
            .unwrap_err();
        assert_eq!(err, SurfaceError::Unavailable);
        assert_eq!(session.store().len(), 1);
        assert_eq!(log.borrow()[0].kind, ChangeKind::Seeded);
    }
}
