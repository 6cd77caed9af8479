use ::geo::{
    BoundingRect, Contains, Coord, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Rect,
};
use serde_json::Value;

/// Planar geometry in `x = lon`, `y = lat` order.
pub type GeoGeometry = ::geo::Geometry<f64>;
/// One GeoJSON position.
pub type Position = Coord<f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    fn coord(self) -> Position {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("expected a GeoJSON object")]
    NotAnObject,
    #[error("missing or non-string \"type\"")]
    MissingType,
    #[error("unsupported GeoJSON type {0:?}")]
    UnsupportedType(String),
    #[error("malformed {0} member")]
    Malformed(&'static str),
}

/// Parsed GeoJSON. Features and feature collections are flattened into
/// their geometries; properties are not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry(GeoGeometry);

/// What a rendered path represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Point,
    Line,
    Ring,
}

impl From<GeoGeometry> for Geometry {
    fn from(geometry: GeoGeometry) -> Self {
        Self(geometry)
    }
}

impl Geometry {
    /// A collection with no members: no bounds, never hit.
    pub fn empty() -> Self {
        Self(GeoGeometry::GeometryCollection(GeometryCollection(Vec::new())))
    }

    pub fn as_geo(&self) -> &GeoGeometry {
        &self.0
    }

    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| GeometryError::Json(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, GeometryError> {
        parse_value(value).map(Self)
    }

    /// Visit every drawable path. Points are reported as single-position paths.
    pub fn for_each_path(&self, f: &mut impl FnMut(PathKind, &[Position])) {
        visit_paths(&self.0, f);
    }

    /// Bounding box of all positions, `None` when there are none.
    pub fn bounds(&self) -> Option<Bounds> {
        self.0
            .bounding_rect()
            .map(Bounds::from)
            .filter(Bounds::is_valid)
    }

    /// Whether `point` falls inside a polygonal part. Holes are excluded;
    /// points and lines never contain anything.
    pub fn contains(&self, point: LatLng) -> bool {
        polygonal_contains(&self.0, &point.coord())
    }
}

fn parse_value(value: &Value) -> Result<GeoGeometry, GeometryError> {
    let obj = value.as_object().ok_or(GeometryError::NotAnObject)?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(GeometryError::MissingType)?;
    let coords = || obj.get("coordinates").ok_or(GeometryError::Malformed("coordinates"));

    let geometry = match kind {
        "Point" => GeoGeometry::Point(Point(position(coords()?)?)),
        "MultiPoint" => GeoGeometry::MultiPoint(MultiPoint(nested(coords()?, |v| {
            position(v).map(Point)
        })?)),
        "LineString" => GeoGeometry::LineString(line(coords()?)?),
        "MultiLineString" => {
            GeoGeometry::MultiLineString(MultiLineString(nested(coords()?, line)?))
        }
        "Polygon" => GeoGeometry::Polygon(polygon(coords()?)?),
        "MultiPolygon" => GeoGeometry::MultiPolygon(MultiPolygon(nested(coords()?, polygon)?)),
        "GeometryCollection" => {
            let members = obj
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or(GeometryError::Malformed("geometries"))?;
            collection(members)?
        }
        "Feature" => match obj.get("geometry") {
            None | Some(Value::Null) => GeoGeometry::GeometryCollection(GeometryCollection(Vec::new())),
            Some(geometry) => parse_value(geometry)?,
        },
        "FeatureCollection" => {
            let features = obj
                .get("features")
                .and_then(Value::as_array)
                .ok_or(GeometryError::Malformed("features"))?;
            collection(features)?
        }
        other => return Err(GeometryError::UnsupportedType(other.to_owned())),
    };
    Ok(geometry)
}

fn collection(members: &[Value]) -> Result<GeoGeometry, GeometryError> {
    members
        .iter()
        .map(parse_value)
        .collect::<Result<Vec<_>, _>>()
        .map(|members| GeoGeometry::GeometryCollection(GeometryCollection(members)))
}

fn position(value: &Value) -> Result<Position, GeometryError> {
    let arr = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or(GeometryError::Malformed("position"))?;
    let x = arr[0].as_f64().ok_or(GeometryError::Malformed("position"))?;
    let y = arr[1].as_f64().ok_or(GeometryError::Malformed("position"))?;
    Ok(Coord { x, y })
}

fn line(value: &Value) -> Result<LineString<f64>, GeometryError> {
    nested(value, position).map(LineString::new)
}

/// First ring is the exterior, the rest are holes.
fn polygon(value: &Value) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = nested(value, line)?.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Ok(Polygon::new(exterior, rings.collect()))
}

fn nested<T>(
    value: &Value,
    item: impl Fn(&Value) -> Result<T, GeometryError>,
) -> Result<Vec<T>, GeometryError> {
    value
        .as_array()
        .ok_or(GeometryError::Malformed("coordinates"))?
        .iter()
        .map(item)
        .collect()
}

fn visit_paths(geometry: &GeoGeometry, f: &mut impl FnMut(PathKind, &[Position])) {
    match geometry {
        GeoGeometry::Point(p) => f(PathKind::Point, std::slice::from_ref(&p.0)),
        GeoGeometry::MultiPoint(points) => {
            for p in &points.0 {
                f(PathKind::Point, std::slice::from_ref(&p.0));
            }
        }
        GeoGeometry::Line(l) => f(PathKind::Line, &[l.start, l.end]),
        GeoGeometry::LineString(ls) => f(PathKind::Line, &ls.0),
        GeoGeometry::MultiLineString(lines) => {
            for ls in &lines.0 {
                f(PathKind::Line, &ls.0);
            }
        }
        GeoGeometry::Polygon(p) => visit_rings(p, f),
        GeoGeometry::MultiPolygon(polygons) => {
            for p in &polygons.0 {
                visit_rings(p, f);
            }
        }
        GeoGeometry::Rect(r) => visit_rings(&r.to_polygon(), f),
        GeoGeometry::Triangle(t) => visit_rings(&t.to_polygon(), f),
        GeoGeometry::GeometryCollection(members) => {
            for member in &members.0 {
                visit_paths(member, f);
            }
        }
    }
}

fn visit_rings(polygon: &Polygon<f64>, f: &mut impl FnMut(PathKind, &[Position])) {
    f(PathKind::Ring, &polygon.exterior().0);
    for hole in polygon.interiors() {
        f(PathKind::Ring, &hole.0);
    }
}

fn polygonal_contains(geometry: &GeoGeometry, at: &Position) -> bool {
    match geometry {
        GeoGeometry::Polygon(p) => p.contains(at),
        GeoGeometry::MultiPolygon(mp) => mp.contains(at),
        GeoGeometry::Rect(r) => r.to_polygon().contains(at),
        GeoGeometry::Triangle(t) => t.to_polygon().contains(at),
        GeoGeometry::GeometryCollection(members) => {
            members.0.iter().any(|m| polygonal_contains(m, at))
        }
        _ => false,
    }
}

/// Geographic rectangle, southwest/northeast corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::new(LatLng::new(min.y, min.x), LatLng::new(max.y, max.x))
    }
}

impl Bounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Smallest box around every valid box in `boxes`; invalid ones are
    /// skipped. `None` when nothing valid was offered.
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a Bounds>) -> Option<Bounds> {
        let corners: MultiPoint<f64> = boxes
            .into_iter()
            .filter(|b| b.is_valid())
            .flat_map(|b| [b.south_west.coord(), b.north_east.coord()])
            .map(Point)
            .collect();
        corners
            .bounding_rect()
            .map(Bounds::from)
            .filter(Bounds::is_valid)
    }

    /// Both corners finite and correctly ordered. A single point is valid.
    pub fn is_valid(&self) -> bool {
        self.south_west.is_finite()
            && self.north_east.is_finite()
            && self.south_west.lat <= self.north_east.lat
            && self.south_west.lng <= self.north_east.lng
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(x: f64, y: f64) -> GeoGeometry {
        GeoGeometry::Point(Point::new(x, y))
    }

    #[test]
    fn parses_point_and_ignores_altitude() {
        let g = Geometry::parse(r#"{"type":"Point","coordinates":[-75,-9,120]}"#).unwrap();
        assert_eq!(g.as_geo(), &point(-75.0, -9.0));
    }

    #[test]
    fn feature_collection_flattens_to_member_geometries() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1, 2]}},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        });
        let g = Geometry::from_value(&value).unwrap();
        assert_eq!(
            g.as_geo(),
            &GeoGeometry::GeometryCollection(GeometryCollection(vec![
                point(1.0, 2.0),
                GeoGeometry::GeometryCollection(GeometryCollection(vec![])),
            ]))
        );
    }

    #[test]
    fn rejects_malformed_geometry() {
        assert!(matches!(Geometry::parse("{not json"), Err(GeometryError::Json(_))));
        assert_eq!(Geometry::parse("[1,2]"), Err(GeometryError::NotAnObject));
        assert_eq!(
            Geometry::parse(r#"{"type":"Circle","coordinates":[0,0]}"#),
            Err(GeometryError::UnsupportedType("Circle".into()))
        );
        assert_eq!(
            Geometry::parse(r#"{"type":"Point","coordinates":[1]}"#),
            Err(GeometryError::Malformed("position"))
        );
        assert_eq!(
            Geometry::parse(r#"{"coordinates":[1,2]}"#),
            Err(GeometryError::MissingType)
        );
    }

    #[test]
    fn bounds_cover_mixed_geometry() {
        let g = Geometry::parse(
            r#"{"type":"GeometryCollection","geometries":[
                {"type":"Point","coordinates":[-80,-5]},
                {"type":"LineString","coordinates":[[-70,-10],[-72,-12]]}
            ]}"#,
        )
        .unwrap();
        let b = g.bounds().unwrap();
        assert_eq!(b.south_west, LatLng::new(-12.0, -80.0));
        assert_eq!(b.north_east, LatLng::new(-5.0, -70.0));
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        assert_eq!(Geometry::empty().bounds(), None);
        let no_polygons = Geometry::parse(r#"{"type":"MultiPolygon","coordinates":[]}"#).unwrap();
        assert_eq!(no_polygons.bounds(), None);
    }

    #[test]
    fn single_point_bounds_are_valid_and_contain_the_point() {
        let b = Geometry::from(point(-75.0, -9.0)).bounds().unwrap();
        assert!(b.is_valid());
        assert!(b.contains(LatLng::new(-9.0, -75.0)));
    }

    #[test]
    fn polygon_hit_test_respects_holes() {
        let g = Geometry::parse(
            r#"{"type":"Polygon","coordinates":[
                [[0,0],[10,0],[10,10],[0,10],[0,0]],
                [[4,4],[6,4],[6,6],[4,6],[4,4]]
            ]}"#,
        )
        .unwrap();
        assert!(g.contains(LatLng::new(2.0, 2.0)));
        assert!(!g.contains(LatLng::new(5.0, 5.0)));
        assert!(!g.contains(LatLng::new(20.0, 20.0)));
    }

    #[test]
    fn lines_and_points_are_never_hit() {
        let line = Geometry::parse(r#"{"type":"LineString","coordinates":[[0,0],[10,10]]}"#).unwrap();
        assert!(!line.contains(LatLng::new(5.0, 5.0)));
        assert!(!Geometry::from(point(1.0, 1.0)).contains(LatLng::new(1.0, 1.0)));
    }

    #[test]
    fn polygon_paths_report_exterior_then_holes() {
        let g = Geometry::parse(
            r#"{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,0]], [[0.2,0.2],[0.4,0.2],[0.4,0.4],[0.2,0.2]]],
                [[[5,5],[6,5],[6,6],[5,5]]]
            ]}"#,
        )
        .unwrap();
        let mut rings = Vec::new();
        g.for_each_path(&mut |kind, path| rings.push((kind, path.len())));
        assert_eq!(rings, vec![(PathKind::Ring, 4), (PathKind::Ring, 4), (PathKind::Ring, 4)]);
    }

    #[test]
    fn enclosing_skips_invalid_boxes() {
        let nan = LatLng::new(f64::NAN, 1.0);
        let broken = Bounds::new(nan, nan);
        assert_eq!(Bounds::enclosing([&broken]), None);

        let a = Bounds::new(LatLng::new(-10.0, -80.0), LatLng::new(-8.0, -78.0));
        let b = Bounds::new(LatLng::new(-3.0, -75.0), LatLng::new(-3.0, -75.0));
        let merged = Bounds::enclosing([&a, &broken, &b]).unwrap();
        assert_eq!(merged.south_west, LatLng::new(-10.0, -80.0));
        assert_eq!(merged.north_east, LatLng::new(-3.0, -75.0));
    }
}
