//! FeatureCollection wire form.
//!
//! The hosting page hands the editor a collection mixing user selections
//! and reference overlays; the editor hands back a collection holding only
//! user selections. Reading is tolerant: a feature that fails validation is
//! skipped and counted rather than failing the whole document.

use crate::error::{CollectionError, InvalidFeature};
use crate::model::{Feature, FeatureSource};
use serde_json::{Map, Value};

/// `[min_lon, min_lat, max_lon, max_lat]`.
pub type Bbox = [f64; 4];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub bbox: Option<Bbox>,
    pub features: Vec<Feature>,
    /// Features dropped while parsing. Always 0 for collections built in
    /// memory.
    pub skipped: usize,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            bbox: None,
            features,
            skipped: 0,
        }
    }

    /// Parse a GeoJSON FeatureCollection document.
    pub fn parse(text: &str) -> Result<Self, CollectionError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, CollectionError> {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
        if kind != "FeatureCollection" {
            return Err(CollectionError::NotACollection(kind.to_string()));
        }

        let bbox = match value.get("bbox") {
            Some(Value::Array(items)) => {
                let nums: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
                match <[f64; 4]>::try_from(nums.as_slice()) {
                    Ok(b) if nums.len() == items.len() => Some(b),
                    _ => return Err(CollectionError::BadBbox(items.len())),
                }
            }
            _ => None,
        };

        let mut features = Vec::new();
        let mut skipped = 0;
        let raw = value
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for item in raw {
            match Feature::from_json(item) {
                Ok(f) => features.push(f),
                Err(e) => {
                    log::warn!("skipping feature in collection: {e}");
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            bbox,
            features,
            skipped,
        })
    }

    /// Parse the `features` member of a draw UI event body (`{"features": [...]}`),
    /// keeping per-feature results so callers can reject items individually.
    pub fn parse_event_features(value: &Value) -> Vec<Result<Feature, InvalidFeature>> {
        match value.get("features").and_then(Value::as_array) {
            Some(items) => items.iter().map(Feature::from_json).collect(),
            None => vec![Err(InvalidFeature::Payload(value.to_string()))],
        }
    }

    /// Features owned by the user.
    pub fn selections(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.source.is_user_selection())
    }

    /// Display-only overlay features.
    pub fn references(&self) -> impl Iterator<Item = &Feature> {
        self.features
            .iter()
            .filter(|f| matches!(f.source, FeatureSource::Reference(_)))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of every position in the collection.
    pub fn compute_bbox(&self) -> Option<Bbox> {
        let mut positions = self.features.iter().flat_map(|f| f.geometry.positions());
        let first = positions.next()?;
        let mut bbox = [first.lon(), first.lat(), first.lon(), first.lat()];
        for p in positions {
            bbox[0] = bbox[0].min(p.lon());
            bbox[1] = bbox[1].min(p.lat());
            bbox[2] = bbox[2].max(p.lon());
            bbox[3] = bbox[3].max(p.lat());
        }
        Some(bbox)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String("FeatureCollection".into()));
        if let Some(bbox) = self.bbox {
            obj.insert("bbox".into(), serde_json::json!(bbox));
        }
        obj.insert(
            "features".into(),
            Value::Array(self.features.iter().map(Feature::to_json).collect()),
        );
        Value::Object(obj)
    }

    /// Serialize to the compact JSON string written into the form field.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::FeatureId;
    use crate::model::{Geometry, Position};
    use serde_json::json;

    #[test]
    fn rejects_non_collection() {
        let err = FeatureCollection::parse(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, CollectionError::NotACollection(t) if t == "Feature"));
    }

    #[test]
    fn empty_collection_parses() {
        let fc = FeatureCollection::parse(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(fc.is_empty());
        assert_eq!(fc.bbox, None);
        assert_eq!(fc.compute_bbox(), None);
    }

    #[test]
    fn bad_bbox_is_an_error() {
        let err = FeatureCollection::parse(r#"{"type":"FeatureCollection","bbox":[1,2],"features":[]}"#)
            .unwrap_err();
        assert!(matches!(err, CollectionError::BadBbox(2)));
    }

    #[test]
    fn invalid_features_are_skipped() {
        let fc = FeatureCollection::from_json(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1, 2] } },
                { "type": "Feature", "properties": {}, "geometry": { "type": "Circle", "coordinates": [1, 2] } },
                { "type": "Feature", "properties": {} },
            ],
        }))
        .unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.skipped, 2);
    }

    #[test]
    fn overlay_multipolygons_are_references_not_skips() {
        let fc = FeatureCollection::from_json(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "source": "cadastre" },
                  "geometry": { "type": "MultiPolygon",
                                "coordinates": [[[[2.0, 48.0], [2.1, 48.0], [2.1, 48.1], [2.0, 48.0]]]] } },
                { "type": "Feature", "id": 17, "properties": { "source": "selection_utilisateur" },
                  "geometry": { "type": "Point", "coordinates": [2.05, 48.05] } },
            ],
        }))
        .unwrap();
        assert_eq!(fc.references().count(), 1);
        assert_eq!(fc.selections().count(), 1);
        assert_eq!(fc.skipped, 0);
    }

    #[test]
    fn bbox_spans_all_positions() {
        let fc = FeatureCollection::new(vec![
            Feature::new(FeatureId::intern("p"), Geometry::Point(Position::new(2.0, 48.0))),
            Feature::new(
                FeatureId::intern("l"),
                Geometry::LineString(vec![Position::new(1.5, 48.5), Position::new(2.5, 47.5)]),
            ),
        ]);
        assert_eq!(fc.compute_bbox(), Some([1.5, 47.5, 2.5, 48.5]));
    }

    #[test]
    fn event_body_without_features_is_one_rejection() {
        let results = FeatureCollection::parse_event_features(&json!({ "type": "draw.create" }));
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(InvalidFeature::Payload(_))));
    }
}
