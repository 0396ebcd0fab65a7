//! Error types for feature validation and collection parsing.

use crate::id::FeatureId;
use crate::model::GeometryType;
use thiserror::Error;

/// Why a single feature payload was rejected.
///
/// Rejection is always per feature: the store and the rest of a batch are
/// left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidFeature {
    #[error("feature has no id")]
    MissingId,
    #[error("feature {0} has no geometry")]
    MissingGeometry(String),
    #[error("unsupported geometry type `{0}`")]
    UnsupportedGeometry(String),
    #[error("malformed {0:?} coordinates: {1}")]
    MalformedCoordinates(GeometryType, String),
    #[error("feature {0} is a reference overlay and cannot be edited")]
    ReferenceFeature(FeatureId),
    #[error("feature payload is not a GeoJSON object: {0}")]
    Payload(String),
}

/// Failure to read a whole FeatureCollection document.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a FeatureCollection, found type `{0}`")]
    NotACollection(String),
    #[error("bbox must have 4 numbers, found {0}")]
    BadBbox(usize),
}
