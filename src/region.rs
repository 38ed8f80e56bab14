//! GeoJSON-like regions.
//!
//! A context region is parsed from a GeoJSON `FeatureCollection`, `Feature`
//! or bare geometry object into a planar [`GeometryCollection`]. Regions are
//! stored on the [`Context`](crate::config::Context) and compared by value;
//! the stream adapters do not apply them to the subset mask.

use crate::error::{QcError, Result};
use serde_json::{Map, Value, json};
use std::hash::{Hash, Hasher};

/// A (lon, lat) position
pub type Position = [f64; 2];

/// A ring or line string
pub type LineString = Vec<Position>;

/// A polygon: exterior ring followed by any interior rings
pub type Polygon = Vec<LineString>;

/// Planar geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(LineString),
    MultiLineString(Vec<LineString>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
    Collection(Vec<Geometry>),
}

impl Geometry {
    /// Parse a GeoJSON geometry object
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("geometry must be an object"))?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("geometry has no \"type\""))?;

        if kind == "GeometryCollection" {
            let members = obj
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("GeometryCollection has no \"geometries\" array"))?;
            return members
                .iter()
                .map(Geometry::from_geojson)
                .collect::<Result<Vec<_>>>()
                .map(Geometry::Collection);
        }

        let coords = obj
            .get("coordinates")
            .ok_or_else(|| invalid(format!("{kind} has no \"coordinates\"")))?;

        match kind {
            "Point" => Ok(Geometry::Point(parse_position(coords)?)),
            "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
            "LineString" => Ok(Geometry::LineString(parse_positions(coords)?)),
            "MultiLineString" => Ok(Geometry::MultiLineString(parse_nested(
                coords,
                parse_positions,
            )?)),
            "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords)?)),
            "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_nested(coords, parse_polygon)?)),
            other => Err(invalid(format!("unsupported geometry type \"{other}\""))),
        }
    }

    /// Every position of the geometry
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.clone(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().collect(),
            Geometry::Collection(members) => members.iter().flat_map(|g| g.positions()).collect(),
        }
    }

    /// Serialize back to a GeoJSON geometry object
    pub fn to_geojson(&self) -> Value {
        match self {
            Geometry::Point(p) => json!({"type": "Point", "coordinates": p}),
            Geometry::MultiPoint(ps) => json!({"type": "MultiPoint", "coordinates": ps}),
            Geometry::LineString(ps) => json!({"type": "LineString", "coordinates": ps}),
            Geometry::MultiLineString(lines) => {
                json!({"type": "MultiLineString", "coordinates": lines})
            }
            Geometry::Polygon(rings) => json!({"type": "Polygon", "coordinates": rings}),
            Geometry::MultiPolygon(polys) => json!({"type": "MultiPolygon", "coordinates": polys}),
            Geometry::Collection(members) => json!({
                "type": "GeometryCollection",
                "geometries": members.iter().map(Geometry::to_geojson).collect::<Vec<_>>()
            }),
        }
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Geometry::Collection(members) => {
                members.len().hash(state);
                for member in members {
                    member.hash_into(state);
                }
            }
            other => {
                // -0.0 == 0.0, so hash the canonical zero
                for [x, y] in other.positions() {
                    (x + 0.0).to_bits().hash(state);
                    (y + 0.0).to_bits().hash(state);
                }
            }
        }
    }
}

/// An ordered collection of geometries making up a context region
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryCollection {
    pub geometries: Vec<Geometry>,
}

impl Eq for GeometryCollection {}

impl Hash for GeometryCollection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.geometries.len().hash(state);
        for geometry in &self.geometries {
            geometry.hash_into(state);
        }
    }
}

impl GeometryCollection {
    pub fn new(geometries: Vec<Geometry>) -> Self {
        Self { geometries }
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// GeoJSON `GeometryCollection` representation
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "GeometryCollection",
            "geometries": self.geometries.iter().map(Geometry::to_geojson).collect::<Vec<_>>()
        })
    }

    /// Bounding box as (minx, miny, maxx, maxy)
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let positions: Vec<Position> = self.geometries.iter().flat_map(|g| g.positions()).collect();
        if positions.is_empty() {
            return None;
        }
        let init = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        Some(positions.iter().fold(init, |(minx, miny, maxx, maxy), [x, y]| {
            (minx.min(*x), miny.min(*y), maxx.max(*x), maxy.max(*y))
        }))
    }
}

/// Parse the `region` entry of a context declaration.
///
/// Returns `Ok(None)` for values that are not GeoJSON objects at all (a bare
/// string, a number, `null`); the caller warns and ignores them. Objects that
/// look like GeoJSON but carry a malformed geometry are an error.
pub fn parse_region(value: &Value) -> Result<Option<GeometryCollection>> {
    let Some(obj) = value.as_object() else {
        return Ok(None);
    };

    if let Some(features) = obj.get("features") {
        let features = features
            .as_array()
            .ok_or_else(|| invalid("\"features\" must be an array"))?;
        let geometries = features
            .iter()
            .map(feature_geometry)
            .collect::<Result<Vec<_>>>()?;
        return Ok(Some(GeometryCollection::new(geometries)));
    }

    if obj.contains_key("geometry") {
        return Ok(Some(GeometryCollection::new(vec![feature_geometry(value)?])));
    }

    if obj.contains_key("type") {
        return Ok(Some(match Geometry::from_geojson(value)? {
            Geometry::Collection(members) => GeometryCollection::new(members),
            single => GeometryCollection::new(vec![single]),
        }));
    }

    Ok(None)
}

fn feature_geometry(feature: &Value) -> Result<Geometry> {
    let geometry = feature
        .as_object()
        .and_then(|f: &Map<String, Value>| f.get("geometry"))
        .ok_or_else(|| invalid("feature has no \"geometry\""))?;
    Geometry::from_geojson(geometry)
}

fn parse_position(value: &Value) -> Result<Position> {
    let arr = value
        .as_array()
        .ok_or_else(|| invalid("position must be an array"))?;
    if arr.len() < 2 {
        return Err(invalid("position needs at least two coordinates"));
    }
    let x = arr[0].as_f64().ok_or_else(|| invalid("non-numeric coordinate"))?;
    let y = arr[1].as_f64().ok_or_else(|| invalid("non-numeric coordinate"))?;
    Ok([x, y])
}

fn parse_positions(value: &Value) -> Result<Vec<Position>> {
    parse_nested(value, parse_position)
}

fn parse_polygon(value: &Value) -> Result<Polygon> {
    let rings = parse_nested(value, parse_positions)?;
    for ring in &rings {
        if ring.len() < 4 || ring.first() != ring.last() {
            return Err(invalid("polygon rings must be closed with at least 4 positions"));
        }
    }
    Ok(rings)
}

fn parse_nested<T>(value: &Value, parse: fn(&Value) -> Result<T>) -> Result<Vec<T>> {
    value
        .as_array()
        .ok_or_else(|| invalid("coordinates must be an array"))?
        .iter()
        .map(parse)
        .collect()
}

fn invalid(reason: impl Into<String>) -> QcError {
    QcError::InvalidRegion {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[-80.0, 40.0], [-70.0, 40.0], [-70.0, 50.0], [-80.0, 50.0], [-80.0, 40.0]]]
        })
    }

    #[test]
    fn test_feature_collection_region() {
        let region = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": square()},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [-75.0, 45.0]}}
            ]
        });
        let parsed = parse_region(&region).unwrap().unwrap();
        assert_eq!(parsed.geometries.len(), 2);
        assert_eq!(parsed.bounds(), Some((-80.0, 40.0, -70.0, 50.0)));
    }

    #[test]
    fn test_feature_and_bare_geometry_are_equal() {
        let feature = json!({"type": "Feature", "geometry": square()});
        let from_feature = parse_region(&feature).unwrap().unwrap();
        let from_geometry = parse_region(&square()).unwrap().unwrap();
        assert_eq!(from_feature, from_geometry);
    }

    #[test]
    fn test_geojson_round_trip() {
        let parsed = parse_region(&square()).unwrap().unwrap();
        let reparsed = parse_region(&parsed.to_geojson()).unwrap().unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_non_geojson_is_ignored() {
        assert!(parse_region(&json!("something")).unwrap().is_none());
        assert!(parse_region(&Value::Null).unwrap().is_none());
        assert!(parse_region(&json!({"name": "box"})).unwrap().is_none());
    }

    #[test]
    fn test_malformed_geometry_is_an_error() {
        let open_ring = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]
        });
        assert!(matches!(
            parse_region(&open_ring),
            Err(QcError::InvalidRegion { .. })
        ));

        let unknown = json!({"type": "Circle", "coordinates": [0.0, 0.0]});
        assert!(parse_region(&unknown).is_err());
    }
}
