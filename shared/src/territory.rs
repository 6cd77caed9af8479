use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::{Bounds, Geometry, GeometryError};
use crate::lenient;

/// One backend row per municipality with service. Every field is optional and
/// decoded leniently; geometry fields hold either serialized GeoJSON text or
/// an already-parsed object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryRecord {
    #[serde(deserialize_with = "lenient::opt_value")]
    pub geo_dep_json: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_value")]
    pub geo_pro_json: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_value")]
    pub geo_dis_json: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub des_dep: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub des_pro: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub des_dis: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_distrito: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub cod_ubi: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub cod_dis: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub cod_eje: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_eje: Option<String>,
}

impl TerritoryRecord {
    /// Decode a row without ever failing: anything that is not an object,
    /// or does not decode, becomes an empty record.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        Self::deserialize(value).unwrap_or_default()
    }

    /// Two-character department prefix of the ubigeo.
    pub fn department_code(&self) -> Option<String> {
        self.cod_ubi.as_deref().map(|c| prefix(c, 2))
    }

    /// Four-character province prefix of the ubigeo.
    pub fn province_code(&self) -> Option<String> {
        self.cod_ubi.as_deref().map(|c| prefix(c, 4))
    }
}

fn prefix(code: &str, chars: usize) -> String {
    code.chars().take(chars).collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Department,
    Province,
    District,
}

impl RegionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Department => "Departamento",
            Self::Province => "Provincia",
            Self::District => "Distrito",
        }
    }
}

/// A parsed region ready for rendering and search.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEntity {
    pub kind: RegionKind,
    pub geometry: Geometry,
    /// Cached bounds of `geometry`; `None` for geometries without positions.
    pub bounds: Option<Bounds>,
    pub name: String,
    pub code: Option<String>,
    /// Department name for provinces and districts.
    pub parent_name: Option<String>,
    /// Province name for districts.
    pub parent_province: Option<String>,
    pub entity_code: Option<String>,
    pub entity_name: Option<String>,
}

impl RegionEntity {
    fn new(kind: RegionKind, geometry: Geometry, name: String, code: Option<String>) -> Self {
        let bounds = geometry.bounds();
        Self {
            kind,
            geometry,
            bounds,
            name,
            code,
            parent_name: None,
            parent_province: None,
            entity_code: None,
            entity_name: None,
        }
    }
}

/// The three region tiers derived from one territory snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerritorySets {
    pub departments: Vec<RegionEntity>,
    pub provinces: Vec<RegionEntity>,
    pub districts: Vec<RegionEntity>,
    /// Geometry fields that were present but could not be parsed.
    pub skipped_fields: usize,
}

impl TerritorySets {
    pub fn is_empty(&self) -> bool {
        self.departments.is_empty() && self.provinces.is_empty() && self.districts.is_empty()
    }

    /// Tiers in drawing order (bottom first).
    pub fn layers(&self) -> [&[RegionEntity]; 3] {
        [
            self.departments.as_slice(),
            self.provinces.as_slice(),
            self.districts.as_slice(),
        ]
    }

    pub fn layer(&self, kind: RegionKind) -> &[RegionEntity] {
        match kind {
            RegionKind::Department => &self.departments,
            RegionKind::Province => &self.provinces,
            RegionKind::District => &self.districts,
        }
    }

    pub fn get(&self, kind: RegionKind, index: usize) -> Option<&RegionEntity> {
        self.layer(kind).get(index)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        compute_bounds(&self.layers())
    }
}

/// Raw key for deduplication: the original text, or the canonical
/// serialization of an object-valued field. Anything else is unusable.
fn geometry_key(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) if !s.is_empty() => Some(Cow::Borrowed(s)),
        Value::Object(_) => Some(Cow::Owned(value.to_string())),
        _ => None,
    }
}

fn parse_field(value: &Value) -> Result<Geometry, GeometryError> {
    match value {
        Value::String(s) => Geometry::parse(s),
        other => Geometry::from_value(other),
    }
}

/// Insertion-ordered map from raw geometry key to output index.
#[derive(Default)]
struct DedupTier {
    seen: HashMap<String, usize>,
    entities: Vec<RegionEntity>,
}

impl DedupTier {
    fn contains(&self, key: &str) -> bool {
        self.seen.contains_key(key)
    }

    fn insert(&mut self, key: String, entity: RegionEntity) {
        self.seen.insert(key, self.entities.len());
        self.entities.push(entity);
    }
}

/// Group flat territory rows into departments, provinces and districts.
///
/// Departments and provinces are deduplicated on the raw geometry key (first
/// row wins); districts keep one entry per row. A field that fails to parse
/// is skipped without affecting the row's other fields or later rows.
pub fn aggregate(records: &[TerritoryRecord]) -> TerritorySets {
    let mut departments = DedupTier::default();
    let mut provinces = DedupTier::default();
    let mut districts = Vec::new();
    let mut skipped_fields = 0usize;

    let mut parse = |tier: &str, value: &Value| match parse_field(value) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            skipped_fields += 1;
            tracing::warn!(tier, error = %e, "skipping unparsable territory geometry");
            None
        }
    };

    for record in records {
        if let Some(value) = record.geo_dep_json.as_ref()
            && let Some(key) = geometry_key(value)
            && !departments.contains(&key)
            && let Some(geometry) = parse("department", value)
        {
            let name = non_empty(&record.des_dep).unwrap_or("Departamento").to_owned();
            let entity =
                RegionEntity::new(RegionKind::Department, geometry, name, record.department_code());
            departments.insert(key.into_owned(), entity);
        }

        if let Some(value) = record.geo_pro_json.as_ref()
            && let Some(key) = geometry_key(value)
            && !provinces.contains(&key)
            && let Some(geometry) = parse("province", value)
        {
            let name = non_empty(&record.des_pro).unwrap_or("Provincia").to_owned();
            let mut entity =
                RegionEntity::new(RegionKind::Province, geometry, name, record.province_code());
            entity.parent_name = record.des_dep.clone();
            provinces.insert(key.into_owned(), entity);
        }

        if let Some(value) = record.geo_dis_json.as_ref()
            && geometry_key(value).is_some()
            && let Some(geometry) = parse("district", value)
        {
            let name = non_empty(&record.nom_distrito)
                .or_else(|| non_empty(&record.des_dis))
                .unwrap_or("Distrito")
                .to_owned();
            let code = non_empty(&record.cod_ubi)
                .or_else(|| non_empty(&record.cod_dis))
                .map(str::to_owned);
            let mut entity = RegionEntity::new(RegionKind::District, geometry, name, code);
            entity.parent_name = record.des_dep.clone();
            entity.parent_province = record.des_pro.clone();
            entity.entity_code = record.cod_eje.clone();
            entity.entity_name = record.nom_eje.clone();
            districts.push(entity);
        }
    }

    TerritorySets {
        departments: departments.entities,
        provinces: provinces.entities,
        districts,
        skipped_fields,
    }
}

/// Aggregate an arbitrary JSON payload. A non-array payload yields empty sets.
pub fn aggregate_json(payload: &Value) -> TerritorySets {
    let Some(rows) = payload.as_array() else {
        tracing::warn!("territory payload is not an array");
        return TerritorySets::default();
    };
    let records: Vec<TerritoryRecord> = rows.iter().map(TerritoryRecord::from_value).collect();
    aggregate(&records)
}

/// Combined bounds of every region in every set. `None` when no region
/// contributes a finite coordinate.
pub fn compute_bounds(sets: &[&[RegionEntity]]) -> Option<Bounds> {
    Bounds::enclosing(
        sets.iter()
            .flat_map(|set| set.iter())
            .filter_map(|entity| entity.bounds.as_ref()),
    )
}

/// Bounds memoized on the identity of the territory snapshot. A new
/// snapshot (a different `Arc`) triggers recomputation; offering the same
/// snapshot again returns the cached box.
#[derive(Debug, Default)]
pub struct BoundsCache {
    source: Option<Arc<TerritorySets>>,
    bounds: Option<Bounds>,
    computations: u64,
}

impl BoundsCache {
    pub fn get(&mut self, sets: &Arc<TerritorySets>) -> Option<Bounds> {
        let fresh = self
            .source
            .as_ref()
            .is_none_or(|current| !Arc::ptr_eq(current, sets));
        if fresh {
            self.bounds = sets.bounds();
            self.source = Some(Arc::clone(sets));
            self.computations += 1;
        }
        self.bounds
    }

    pub fn computations(&self) -> u64 {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;
    use serde_json::json;

    const LIMA_POINT: &str = r#"{"type":"Point","coordinates":[-75,-9]}"#;

    fn square(x: f64, y: f64) -> String {
        json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]]]
        })
        .to_string()
    }

    fn record(dep: Option<&str>, pro: Option<&str>, dis: Option<&str>) -> TerritoryRecord {
        TerritoryRecord {
            geo_dep_json: dep.map(|s| Value::String(s.to_owned())),
            geo_pro_json: pro.map(|s| Value::String(s.to_owned())),
            geo_dis_json: dis.map(|s| Value::String(s.to_owned())),
            ..TerritoryRecord::default()
        }
    }

    #[test]
    fn single_department_row_yields_named_entity_with_prefix_code() {
        let payload = json!([{ "geo_dep_json": LIMA_POINT, "des_dep": "Lima", "cod_ubi": "1501" }]);
        let sets = aggregate_json(&payload);
        assert_eq!(sets.departments.len(), 1);
        assert_eq!(sets.departments[0].name, "Lima");
        assert_eq!(sets.departments[0].code.as_deref(), Some("15"));
        assert!(sets.provinces.is_empty());
        assert!(sets.districts.is_empty());
    }

    #[test]
    fn departments_and_provinces_dedupe_on_raw_geometry_first_seen_wins() {
        let dep = square(0.0, 0.0);
        let pro = square(0.2, 0.2);
        let mut first = record(Some(&dep), Some(&pro), None);
        first.des_dep = Some("Cusco".into());
        first.des_pro = Some("Urubamba".into());
        first.cod_ubi = Some("081301".into());
        let mut second = first.clone();
        second.des_dep = Some("Otro".into());
        second.des_pro = Some("Otra".into());

        let sets = aggregate(&[first, second]);
        assert_eq!(sets.departments.len(), 1);
        assert_eq!(sets.departments[0].name, "Cusco");
        assert_eq!(sets.provinces.len(), 1);
        assert_eq!(sets.provinces[0].name, "Urubamba");
        assert_eq!(sets.provinces[0].code.as_deref(), Some("0813"));
        assert_eq!(sets.provinces[0].parent_name.as_deref(), Some("Cusco"));
    }

    #[test]
    fn districts_are_never_deduplicated() {
        let dis = square(1.0, 1.0);
        let rows: Vec<_> = (0..3).map(|_| record(None, None, Some(&dis))).collect();
        let sets = aggregate(&rows);
        assert_eq!(sets.districts.len(), 3);
    }

    #[test]
    fn output_preserves_first_occurrence_order() {
        let a = square(0.0, 0.0);
        let b = square(5.0, 5.0);
        let mut r1 = record(Some(&b), None, None);
        r1.des_dep = Some("B".into());
        let mut r2 = record(Some(&a), None, None);
        r2.des_dep = Some("A".into());
        let mut r3 = record(Some(&b), None, None);
        r3.des_dep = Some("B2".into());
        let sets = aggregate(&[r1, r2, r3]);
        let names: Vec<_> = sets.departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn parse_failure_in_one_field_does_not_affect_others() {
        let good = square(0.0, 0.0);
        let rows = vec![
            record(Some("{broken"), Some(&good), Some(&good)),
            record(Some(&square(3.0, 3.0)), None, None),
        ];
        let sets = aggregate(&rows);
        assert_eq!(sets.departments.len(), 1);
        assert_eq!(sets.provinces.len(), 1);
        assert_eq!(sets.districts.len(), 1);
        assert_eq!(sets.skipped_fields, 1);
    }

    #[test]
    fn failed_key_is_retried_on_later_rows() {
        // The dedup map only records successfully parsed keys.
        let rows = vec![record(Some("{broken"), None, None), record(Some("{broken"), None, None)];
        let sets = aggregate(&rows);
        assert!(sets.departments.is_empty());
        assert_eq!(sets.skipped_fields, 2);
    }

    #[test]
    fn object_valued_geometry_is_accepted() {
        let payload = json!([{ "geo_dis_json": {"type": "Point", "coordinates": [-71.5, -16.4]} }]);
        let sets = aggregate_json(&payload);
        assert_eq!(sets.districts.len(), 1);
        assert_eq!(sets.districts[0].name, "Distrito");
    }

    #[test]
    fn non_string_non_object_fields_are_skipped() {
        let payload = json!([{ "geo_dep_json": 5, "geo_pro_json": [1, 2], "geo_dis_json": "" }]);
        let sets = aggregate_json(&payload);
        assert!(sets.is_empty());
        assert_eq!(sets.skipped_fields, 0);
    }

    #[test]
    fn malformed_payloads_yield_empty_sets() {
        for payload in [json!(null), json!({"rows": []}), json!("text"), json!(42)] {
            let sets = aggregate_json(&payload);
            assert!(sets.is_empty());
        }
        let sets = aggregate_json(&json!([null, 3, "x", [], {"geo_dep_json": null}]));
        assert!(sets.is_empty());
    }

    #[test]
    fn district_fields_fall_back_in_order() {
        let payload = json!([
            {
                "geo_dis_json": LIMA_POINT,
                "des_dis": "Miraflores",
                "cod_dis": "150122",
                "des_dep": "Lima",
                "des_pro": "Lima",
                "cod_eje": 301,
                "nom_eje": "MUNICIPALIDAD DISTRITAL DE MIRAFLORES"
            },
            { "geo_dis_json": LIMA_POINT, "nom_distrito": "Barranco", "des_dis": "x", "cod_ubi": "150104" }
        ]);
        let sets = aggregate_json(&payload);
        assert_eq!(sets.districts[0].name, "Miraflores");
        assert_eq!(sets.districts[0].code.as_deref(), Some("150122"));
        assert_eq!(sets.districts[0].parent_province.as_deref(), Some("Lima"));
        assert_eq!(sets.districts[0].entity_code.as_deref(), Some("301"));
        assert_eq!(sets.districts[1].name, "Barranco");
        assert_eq!(sets.districts[1].code.as_deref(), Some("150104"));
    }

    #[test]
    fn compute_bounds_of_nothing_is_none() {
        assert_eq!(compute_bounds(&[]), None);
        let empty: Vec<RegionEntity> = Vec::new();
        assert_eq!(compute_bounds(&[empty.as_slice(), empty.as_slice()]), None);
    }

    #[test]
    fn compute_bounds_of_single_point_contains_it() {
        let sets = aggregate_json(&json!([{ "geo_dep_json": LIMA_POINT }]));
        let bounds = compute_bounds(&[sets.departments.as_slice()]).expect("point should give bounds");
        assert!(bounds.contains(LatLng::new(-9.0, -75.0)));
    }

    #[test]
    fn compute_bounds_merges_all_tiers() {
        let sets = aggregate(&[record(Some(&square(0.0, 0.0)), None, Some(&square(10.0, -4.0)))]);
        let bounds = sets.bounds().expect("bounds");
        assert_eq!(bounds.south_west, LatLng::new(-4.0, 0.0));
        assert_eq!(bounds.north_east, LatLng::new(1.0, 11.0));
    }

    #[test]
    fn bounds_cache_recomputes_only_for_new_snapshots() {
        let sets = Arc::new(aggregate_json(&json!([{ "geo_dep_json": LIMA_POINT }])));
        let mut cache = BoundsCache::default();
        let first = cache.get(&sets);
        let again = cache.get(&Arc::clone(&sets));
        assert_eq!(first, again);
        assert_eq!(cache.computations(), 1);

        let equal_but_new = Arc::new((*sets).clone());
        cache.get(&equal_but_new);
        assert_eq!(cache.computations(), 2);
    }
}
