use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;

use crate::error::{Error, Result};
use crate::point::WGS84Point;
use crate::polygon::{CLOSURE_TOLERANCE_DEG, Ring};
use crate::record::{PolygonDraft, PolygonRecord};

pub fn to_feature(record: &PolygonRecord) -> Feature {
    let exterior: Vec<Vec<f64>> = record
        .ring
        .closed()
        .iter()
        .map(|p| vec![p.lon, p.lat])
        .collect();

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![exterior]))),
        id: Some(Id::String(record.id.to_string())),
        properties: Some(properties(record)),
        foreign_members: None,
    }
}

fn properties(record: &PolygonRecord) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("id".to_string(), json!(record.id));
    props.insert("name".to_string(), json!(record.name));
    props.insert("area_sq_meters".to_string(), json!(record.area_sq_meters));
    props.insert("perimeter_meters".to_string(), json!(record.perimeter_meters));
    props.insert("created_at".to_string(), json!(record.created_at));
    props.insert("updated_at".to_string(), json!(record.updated_at));
    props
}

pub fn to_feature_collection(records: &[PolygonRecord]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: records.iter().map(to_feature).collect(),
        foreign_members: None,
    }
}

// metric properties are ignored, the repository recomputes them
pub fn from_feature(feature: &Feature) -> Result<PolygonDraft> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| invalid("feature has no geometry"))?;
    let rings = match &geometry.value {
        Value::Polygon(rings) => rings,
        other => {
            return Err(invalid(format!(
                "expected Polygon geometry, got {}",
                geometry_type(other)
            )));
        }
    };
    let exterior = match rings.as_slice() {
        [] => return Err(invalid("polygon has no exterior ring")),
        [exterior] => exterior,
        _ => return Err(invalid("polygons with interior rings are not supported")),
    };

    let points = exterior
        .iter()
        .enumerate()
        .map(|(i, position)| match position.as_slice() {
            [lon, lat] | [lon, lat, _] => Ok(WGS84Point::new(*lon, *lat)),
            _ => Err(invalid(format!(
                "position {} has {} values, expected 2 or 3",
                i,
                position.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(invalid("exterior ring is empty")),
    };
    if !last.approx_eq(&first, CLOSURE_TOLERANCE_DEG) {
        return Err(invalid("exterior ring is not closed"));
    }
    let ring = Ring::from_closed(points);
    if ring.len() < 3 {
        return Err(invalid(format!(
            "exterior ring has {} positions, expected at least 3",
            ring.len()
        )));
    }

    let name = feature
        .properties
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    log::trace!("codec: decoded '{}' with {} vertices", name, ring.len());

    Ok(PolygonDraft { name, ring })
}

pub fn parse_features(text: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| invalid(e.to_string()))?;
    Ok(match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    })
}

/// Decodes every polygon feature in `text`; any bad feature fails the whole batch.
pub fn drafts_from_str(text: &str) -> Result<Vec<PolygonDraft>> {
    parse_features(text)?.iter().map(from_feature).collect()
}

fn geometry_type(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidGeoJson(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;

    fn plot_a() -> PolygonRecord {
        let repo = Repository::in_memory();
        let ring = Ring::from(vec![
            [-74.01, 40.70],
            [-74.00, 40.70],
            [-74.00, 40.71],
            [-74.01, 40.71],
        ]);
        repo.create("Plot A", ring).unwrap()
    }

    fn feature(text: &str) -> Feature {
        parse_features(text).unwrap().remove(0)
    }

    #[test]
    fn test_feature_is_explicitly_closed() {
        let record = plot_a();
        let feature = to_feature(&record);
        let Some(Value::Polygon(rings)) = feature.geometry.map(|g| g.value) else {
            panic!("expected polygon geometry");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][0], rings[0][4]);
        assert_eq!(rings[0][0], vec![-74.01, 40.70]);
    }

    #[test]
    fn test_properties_carry_record_fields() {
        let record = plot_a();
        let feature = to_feature(&record);
        let props = feature.properties.unwrap();
        assert_eq!(props["area_sq_meters"].as_f64(), Some(record.area_sq_meters));
        assert_eq!(props["perimeter_meters"].as_f64(), Some(record.perimeter_meters));
        assert_eq!(props["name"], "Plot A");
        assert_eq!(props["id"], record.id.to_string());
        assert!(props.contains_key("created_at"));
        assert_eq!(feature.id, Some(Id::String(record.id.to_string())));
    }

    #[test]
    fn test_round_trip_restores_open_ring() {
        let record = plot_a();
        let draft = from_feature(&to_feature(&record)).unwrap();
        assert_eq!(draft.ring, record.ring);
        assert_eq!(draft.name, record.name);
    }

    #[test]
    fn test_round_trip_through_text() {
        let record = plot_a();
        let text = serde_json::to_string(&to_feature(&record)).unwrap();
        let drafts = drafts_from_str(&text).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].ring, record.ring);
    }

    #[test]
    fn test_text_round_trip_keeps_every_bit() {
        let repo = Repository::in_memory();
        let records: Vec<PolygonRecord> = (0..200u32)
            .map(|i| {
                let k = f64::from(i);
                let ring = Ring::from(vec![
                    [12.0 + k / 7.0, -33.0 + k / 11.0],
                    [12.0 + k / 7.0 + 0.1 / 3.0, -33.0 + k / 11.0 + 1e-15],
                    [12.0 + k / 7.0 + 0.2 / 9.0, -33.0 + k / 11.0 + 0.3 / 7.0],
                    [12.0 + k / 7.0 - 1.0 / 17.0, -33.0 + k / 11.0 + 0.1 / 13.0],
                ]);
                repo.create("P", ring).unwrap()
            })
            .collect();

        let text = serde_json::to_string(&to_feature_collection(&records)).unwrap();
        let drafts = drafts_from_str(&text).unwrap();
        assert_eq!(drafts.len(), records.len());
        for (draft, record) in drafts.iter().zip(&records) {
            assert_eq!(draft.ring, record.ring);
        }
    }

    #[test]
    fn test_empty_collection() {
        let collection = to_feature_collection(&[]);
        assert!(collection.features.is_empty());
        let text = serde_json::to_string(&collection).unwrap();
        assert!(drafts_from_str(&text).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_polygon() {
        let f = feature(r#"{"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}}"#);
        let err = from_feature(&f).unwrap_err();
        assert!(matches!(err, Error::InvalidGeoJson(ref m) if m.contains("LineString")));
    }

    #[test]
    fn test_rejects_missing_geometry() {
        let f = feature(r#"{"type":"Feature","properties":{"name":"x"},"geometry":null}"#);
        assert!(matches!(from_feature(&f), Err(Error::InvalidGeoJson(_))));
    }

    #[test]
    fn test_rejects_unclosed_ring() {
        let f = feature(r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1]]]}}"#);
        assert!(matches!(from_feature(&f), Err(Error::InvalidGeoJson(_))));
    }

    #[test]
    fn test_accepts_closure_within_tolerance() {
        let f = feature(r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0.0000000000001,0]]]}}"#);
        let draft = from_feature(&f).unwrap();
        assert_eq!(draft.ring.len(), 3);
        assert_eq!(draft.name, "");
    }

    #[test]
    fn test_rejects_too_few_positions() {
        let f = feature(r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[0,0]]]}}"#);
        assert!(matches!(from_feature(&f), Err(Error::InvalidGeoJson(_))));
    }

    #[test]
    fn test_rejects_interior_rings() {
        let holes = feature(r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,0]],[[1,1],[2,1],[2,2],[1,1]]]}}"#);
        assert!(matches!(from_feature(&holes), Err(Error::InvalidGeoJson(_))));
    }

    #[test]
    fn test_altitude_is_dropped() {
        let f = feature(r#"{"type":"Feature","properties":{"name":"hill"},"geometry":{"type":"Polygon","coordinates":[[[0,0,10],[1,0,12],[1,1,9],[0,0,10]]]}}"#);
        let draft = from_feature(&f).unwrap();
        assert_eq!(draft.ring.points()[1], WGS84Point::new(1.0, 0.0));
        assert_eq!(draft.name, "hill");
    }

    #[test]
    fn test_bare_geometry_and_garbage() {
        let drafts =
            drafts_from_str(r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#).unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(matches!(drafts_from_str("not json"), Err(Error::InvalidGeoJson(_))));
        assert!(matches!(drafts_from_str(r#"{"type":"Nope"}"#), Err(Error::InvalidGeoJson(_))));
    }
}
