//! In-memory store of the user's drawn features.
//!
//! The store is the single source of truth for a form session; the draw UI
//! only mirrors it. It holds at most one feature per id and only ever holds
//! user selections.

use crate::collection::FeatureCollection;
use crate::error::InvalidFeature;
use crate::id::FeatureId;
use crate::model::{Feature, FeatureSource, Geometry};

#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    /// Kept in mutation order: an upsert of an existing id moves it to the
    /// end. Sessions hold a handful of shapes, so lookups scan linearly.
    features: Vec<Feature>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted features. Reference overlays
    /// and features without an id are left out.
    pub fn seeded(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut store = Self::new();
        for feature in features {
            if let Err(e) = store.upsert(feature) {
                log::debug!("not seeding feature: {e}");
            }
        }
        store
    }

    /// Insert `feature`, replacing any entry with the same id.
    ///
    /// # Errors
    /// `MissingId` when the feature has no id, `ReferenceFeature` when it is a
    /// display-only overlay, `UnsupportedGeometry` when it carries overlay
    /// geometry. The store is unchanged on error.
    pub fn upsert(&mut self, feature: Feature) -> Result<FeatureId, InvalidFeature> {
        let id = feature.id.ok_or(InvalidFeature::MissingId)?;
        if let FeatureSource::Reference(_) = feature.source {
            return Err(InvalidFeature::ReferenceFeature(id));
        }
        if let Geometry::Overlay(_) = feature.geometry {
            let name = feature.geometry.type_name().to_string();
            return Err(InvalidFeature::UnsupportedGeometry(name));
        }
        self.features.retain(|f| f.id != Some(id));
        self.features.push(feature);
        Ok(id)
    }

    /// Remove the entry for `id`. Returns whether anything was removed;
    /// removing an unknown id is not an error.
    pub fn remove(&mut self, id: FeatureId) -> bool {
        let before = self.features.len();
        self.features.retain(|f| f.id != Some(id));
        self.features.len() != before
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == Some(id))
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.get(id).is_some()
    }

    pub fn all(&self) -> &[Feature] {
        &self.features
    }

    pub fn ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.features.iter().filter_map(|f| f.id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Project the store into its wire form. Pure: repeated calls without an
    /// intervening mutation produce equal collections.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut fc = FeatureCollection::new(self.features.clone());
        fc.bbox = fc.compute_bbox();
        fc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use pretty_assertions::assert_eq;

    fn point(id: &str, lon: f64, lat: f64) -> Feature {
        Feature::new(FeatureId::intern(id), Geometry::Point(Position::new(lon, lat)))
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut store = GeometryStore::new();
        store.upsert(point("a", 1.0, 1.0)).unwrap();
        store.upsert(point("b", 2.0, 2.0)).unwrap();
        store.upsert(point("a", 3.0, 3.0)).unwrap();

        assert_eq!(store.len(), 2);
        let a = store.get(FeatureId::intern("a")).unwrap();
        assert_eq!(a.geometry, Geometry::Point(Position::new(3.0, 3.0)));
        // The updated feature moves to the end.
        let order: Vec<&str> = store.ids().map(|id| id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn upsert_without_id_fails_and_keeps_store() {
        let mut store = GeometryStore::new();
        store.upsert(point("a", 1.0, 1.0)).unwrap();
        let mut anonymous = point("x", 0.0, 0.0);
        anonymous.id = None;

        assert_eq!(store.upsert(anonymous), Err(InvalidFeature::MissingId));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reference_features_are_refused() {
        let mut store = GeometryStore::new();
        let mut parcel = point("parcel", 1.0, 1.0);
        parcel.source = FeatureSource::Reference("cadastre".into());

        assert_eq!(
            store.upsert(parcel),
            Err(InvalidFeature::ReferenceFeature(FeatureId::intern("parcel")))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn overlay_geometry_is_refused_even_when_retagged() {
        let mut store = GeometryStore::new();
        let parcel = Feature::new(
            FeatureId::intern("retagged"),
            Geometry::Overlay(serde_json::json!({ "type": "MultiPolygon", "coordinates": [] })),
        );

        assert_eq!(
            store.upsert(parcel),
            Err(InvalidFeature::UnsupportedGeometry("MultiPolygon".into()))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = GeometryStore::new();
        store.upsert(point("a", 1.0, 1.0)).unwrap();
        store.upsert(point("b", 2.0, 2.0)).unwrap();

        assert!(store.remove(FeatureId::intern("a")));
        let once = store.all().to_vec();
        assert!(!store.remove(FeatureId::intern("a")));
        assert_eq!(store.all(), once.as_slice());
    }

    #[test]
    fn projection_is_pure() {
        let mut store = GeometryStore::new();
        store.upsert(point("a", 1.0, 1.0)).unwrap();
        store.upsert(point("b", 2.0, 4.0)).unwrap();

        let first = store.to_feature_collection();
        let second = store.to_feature_collection();
        assert_eq!(first, second);
        assert_eq!(first.to_json_string(), second.to_json_string());
        assert_eq!(first.bbox, Some([1.0, 1.0, 2.0, 4.0]));
    }

    #[test]
    fn seeding_skips_overlays_and_anonymous_features() {
        let mut parcel = point("parcel", 1.0, 1.0);
        parcel.source = FeatureSource::Reference("cadastre".into());
        let mut anonymous = point("anon", 0.0, 0.0);
        anonymous.id = None;

        let store = GeometryStore::seeded(vec![parcel, anonymous, point("kept", 2.0, 2.0)]);
        assert_eq!(store.len(), 1);
        assert!(store.contains(FeatureId::intern("kept")));
    }
}
