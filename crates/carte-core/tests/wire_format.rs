//! Integration tests: reading the hosting page's collection and writing the
//! form field value back.

use carte_core::model::*;
use carte_core::{FeatureCollection, FeatureId, GeometryStore};
use pretty_assertions::assert_eq;

#[test]
fn champ_fixture_splits_selections_and_overlays() {
    let fc = FeatureCollection::parse(include_str!("fixtures/champ_carte.json")).unwrap();

    assert_eq!(fc.len(), 4);
    assert_eq!(fc.skipped, 0);
    assert_eq!(fc.selections().count(), 3);
    assert_eq!(fc.references().count(), 1);
    assert_eq!(
        fc.bbox,
        Some([2.377510070800781, 48.87081237174292, 2.3859214782714844, 48.87442541960633])
    );

    let kinds: Vec<Option<GeometryType>> = fc.selections().map(Feature::geometry_type).collect();
    assert_eq!(
        kinds,
        vec![
            Some(GeometryType::Polygon),
            Some(GeometryType::Point),
            Some(GeometryType::LineString),
        ]
    );
}

#[test]
fn cadastre_multipolygon_overlay_is_kept() {
    let fc = FeatureCollection::parse(include_str!("fixtures/champ_carte.json")).unwrap();
    let parcel = fc.references().next().unwrap();

    assert_eq!(parcel.source, FeatureSource::Reference(CADASTRE_TAG.into()));
    assert_eq!(parcel.geometry.type_name(), "MultiPolygon");
    assert_eq!(parcel.properties.get("numero"), Some(&serde_json::json!("0042")));
    assert_eq!(
        parcel.to_json()["geometry"]["coordinates"][0][0][0],
        serde_json::json!([2.38715792094576, 48.8723062632126])
    );
}

#[test]
fn numeric_persisted_ids_are_interned_as_text() {
    let fc = FeatureCollection::parse(include_str!("fixtures/champ_carte.json")).unwrap();
    let ids: Vec<Option<FeatureId>> = fc.selections().map(|f| f.id).collect();
    assert_eq!(
        ids,
        vec![
            Some(FeatureId::intern("17")),
            Some(FeatureId::intern("18")),
            Some(FeatureId::intern("19")),
        ]
    );
}

#[test]
fn store_output_reparses_to_same_geometries() {
    let fc = FeatureCollection::parse(include_str!("fixtures/champ_carte.json")).unwrap();
    let store = GeometryStore::seeded(fc.features.clone());
    assert_eq!(store.len(), 3);

    let written = store.to_feature_collection().to_json_string();
    let reread = FeatureCollection::parse(&written).unwrap();

    let before: Vec<&Geometry> = fc.selections().map(|f| &f.geometry).collect();
    let after: Vec<&Geometry> = reread.features.iter().map(|f| &f.geometry).collect();
    assert_eq!(before, after);
    assert!(reread.features.iter().all(|f| f.source.is_user_selection()));
    assert!(!written.contains(CADASTRE_TAG));
}

#[test]
fn empty_store_writes_empty_collection() {
    let written = GeometryStore::new().to_feature_collection().to_json_string();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(
        value,
        serde_json::json!({ "type": "FeatureCollection", "features": [] })
    );
}
