//! Feature data model for the map editor.
//!
//! A `Feature` is one user-drawn or overlay shape in GeoJSON terms. Only the
//! three geometry kinds the draw tools produce are modeled: `Point`,
//! `LineString` and `Polygon`. Features carry a `FeatureSource` that tells
//! owned user selections apart from read-only reference overlays such as
//! cadastral parcels.

use crate::error::InvalidFeature;
use crate::id::FeatureId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;

// ─── Positions ───────────────────────────────────────────────────────────

/// A GeoJSON position: `[lon, lat]` or `[lon, lat, alt]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position(SmallVec<[f64; 3]>);

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Position(SmallVec::from_slice(&[lon, lat]))
    }

    pub fn lon(&self) -> f64 {
        self.0[0]
    }

    pub fn lat(&self) -> f64 {
        self.0[1]
    }

    pub fn altitude(&self) -> Option<f64> {
        self.0.get(2).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if !(2..=3).contains(&values.len()) {
            return Err(format!(
                "position must have 2 or 3 numbers, found {}",
                values.len()
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err("position contains a non-finite number".to_string());
        }
        Ok(Position(SmallVec::from_vec(values)))
    }
}

impl From<Position> for Vec<f64> {
    fn from(p: Position) -> Self {
        p.0.into_vec()
    }
}

impl From<LonLat> for Position {
    fn from(ll: LonLat) -> Self {
        Position::new(ll.lon, ll.lat)
    }
}

/// A map coordinate without altitude. Serialized as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for LonLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(ll: LonLat) -> Self {
        [ll.lon, ll.lat]
    }
}

impl From<&Position> for LonLat {
    fn from(p: &Position) -> Self {
        Self::new(p.lon(), p.lat())
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// The geometry kinds offered by the draw controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "LineString" => Some(Self::LineString),
            "Polygon" => Some(Self::Polygon),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature geometry, serialized as `{"type": ..., "coordinates": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    /// Outer ring first, then holes. Every ring is closed.
    Polygon(Vec<Vec<Position>>),
    /// Geometry of a reference overlay, kept as received (cadastre parcels
    /// are `MultiPolygon`). Never accepted into the store.
    #[serde(skip)]
    Overlay(Value),
}

impl Geometry {
    /// `None` for overlay geometry.
    pub fn geometry_type(&self) -> Option<GeometryType> {
        match self {
            Geometry::Point(_) => Some(GeometryType::Point),
            Geometry::LineString(_) => Some(GeometryType::LineString),
            Geometry::Polygon(_) => Some(GeometryType::Polygon),
            Geometry::Overlay(_) => None,
        }
    }

    /// GeoJSON `type` member, including overlay types such as `MultiPolygon`.
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Overlay(raw) => raw.get("type").and_then(Value::as_str).unwrap_or_default(),
            other => other.geometry_type().map_or("", GeometryType::as_str),
        }
    }

    /// Parse a GeoJSON geometry object.
    pub fn from_json(value: &Value) -> Result<Self, InvalidFeature> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| InvalidFeature::UnsupportedGeometry(String::new()))?;
        let kind = GeometryType::parse(type_name)
            .ok_or_else(|| InvalidFeature::UnsupportedGeometry(type_name.to_string()))?;
        let coords = value.get("coordinates").cloned().unwrap_or(Value::Null);
        let malformed = |msg: String| InvalidFeature::MalformedCoordinates(kind, msg);

        match kind {
            GeometryType::Point => serde_json::from_value::<Position>(coords)
                .map(Geometry::Point)
                .map_err(|e| malformed(e.to_string())),
            GeometryType::LineString => {
                let line: Vec<Position> =
                    serde_json::from_value(coords).map_err(|e| malformed(e.to_string()))?;
                if line.len() < 2 {
                    return Err(malformed(format!(
                        "a line needs at least 2 positions, found {}",
                        line.len()
                    )));
                }
                Ok(Geometry::LineString(line))
            }
            GeometryType::Polygon => {
                let rings: Vec<Vec<Position>> =
                    serde_json::from_value(coords).map_err(|e| malformed(e.to_string()))?;
                if rings.is_empty() {
                    return Err(malformed("a polygon needs an outer ring".to_string()));
                }
                for ring in &rings {
                    if ring.len() < 4 {
                        return Err(malformed(format!(
                            "a ring needs at least 4 positions, found {}",
                            ring.len()
                        )));
                    }
                    if ring.first() != ring.last() {
                        return Err(malformed("ring is not closed".to_string()));
                    }
                }
                Ok(Geometry::Polygon(rings))
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Geometry::Overlay(raw) => raw.clone(),
            // Serializing plain vectors of finite floats cannot fail.
            drawn => serde_json::to_value(drawn).unwrap_or(Value::Null),
        }
    }

    /// Visit every position of the geometry. Overlay geometry has none.
    pub fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::LineString(line) => Box::new(line.iter()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
            Geometry::Overlay(_) => Box::new(std::iter::empty()),
        }
    }
}

// ─── Source tag ──────────────────────────────────────────────────────────

/// Wire tag of features owned by the end user.
pub const USER_SELECTION_TAG: &str = "selection_utilisateur";
/// Wire tag of cadastral parcel overlays.
pub const CADASTRE_TAG: &str = "cadastre";

/// Who owns a feature. Carried on the wire as `properties.source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FeatureSource {
    /// Drawn by the user; editable and submitted with the form.
    #[default]
    UserSelection,
    /// Display-only overlay (e.g. `"cadastre"`); never submitted back.
    Reference(String),
}

impl FeatureSource {
    /// Read the tag from `properties.source`. A missing tag means the feature
    /// came straight from the draw UI, which emits empty properties.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            None | Some(USER_SELECTION_TAG) => FeatureSource::UserSelection,
            Some(other) => FeatureSource::Reference(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            FeatureSource::UserSelection => USER_SELECTION_TAG,
            FeatureSource::Reference(name) => name,
        }
    }

    pub fn is_user_selection(&self) -> bool {
        matches!(self, FeatureSource::UserSelection)
    }
}

// ─── Feature ─────────────────────────────────────────────────────────────

/// A single shape with its ownership tag and passthrough properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Present for features coming from the draw UI. Persisted features may
    /// have none.
    pub id: Option<FeatureId>,
    pub geometry: Geometry,
    pub source: FeatureSource,
    /// Remaining `properties` members; `source` is kept out of this map and
    /// modeled by the `source` field.
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry) -> Self {
        Self {
            id: Some(id),
            geometry,
            source: FeatureSource::UserSelection,
            properties: Map::new(),
        }
    }

    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.geometry.geometry_type()
    }

    /// Parse a GeoJSON Feature object. User selections must carry one of the
    /// drawn geometry kinds; reference overlays keep any geometry object.
    pub fn from_json(value: &Value) -> Result<Self, InvalidFeature> {
        let obj = value
            .as_object()
            .ok_or_else(|| InvalidFeature::Payload(value.to_string()))?;
        let id = obj.get("id").and_then(FeatureId::from_json);

        let mut properties = match obj.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let source = match properties.remove("source") {
            Some(Value::String(tag)) => FeatureSource::from_tag(Some(tag.as_str())),
            _ => FeatureSource::from_tag(None),
        };

        let geometry = match obj.get("geometry") {
            Some(g) if !g.is_null() => match Geometry::from_json(g) {
                Ok(geometry) => geometry,
                Err(_) if !source.is_user_selection() && g.is_object() => {
                    Geometry::Overlay(g.clone())
                }
                Err(e) => return Err(e),
            },
            _ => {
                let name = id.map(|i| i.to_string()).unwrap_or_else(|| "<anonymous>".into());
                return Err(InvalidFeature::MissingGeometry(name));
            }
        };

        Ok(Feature {
            id,
            geometry,
            source,
            properties,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut properties = self.properties.clone();
        properties.insert("source".into(), Value::String(self.source.tag().to_string()));

        let mut obj = Map::new();
        obj.insert("type".into(), Value::String("Feature".into()));
        if let Some(id) = self.id {
            obj.insert("id".into(), Value::String(id.as_str().to_string()));
        }
        obj.insert("properties".into(), Value::Object(properties));
        obj.insert("geometry".into(), self.geometry.to_json());
        Value::Object(obj)
    }
}
