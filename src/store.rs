//! In-memory zone dataset: build once, query concurrently.
//!
//! A [`ZoneStore`] is constructed from a serialized GeoJSON
//! FeatureCollection, reprojecting every geometry into the store's
//! target reference system at load time so that all later queries work
//! in a single canonical system. Construction is atomic: any malformed
//! feature, unsupported ring structure, or reprojection failure aborts
//! the whole build and no partial store escapes.
//!
//! Once built a store is immutable. It is `Send + Sync` and safe to
//! share behind an `Arc` across request handlers with no locking.

use crate::crs::Crs;
use crate::error::{DatasetLoadError, ProjectionDomainError};
use crate::geometry::ZoneGeometry;
use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{Feature, GeoJson, feature::Id};
use rstar::{AABB, RTree, RTreeObject};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// An immutable geographic feature: identifier, geometry, attributes.
///
/// Zones are created during dataset load and never mutated. The
/// attribute mapping comes straight from the feature's GeoJSON
/// properties and is opaque to the engine.
#[derive(Debug, Clone)]
pub struct Zone {
    id: String,
    geometry: ZoneGeometry,
    attributes: Map<String, Value>,
}

impl Zone {
    /// Feature identifier: the GeoJSON feature id when present,
    /// otherwise synthesized from the source position.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> &ZoneGeometry {
        &self.geometry
    }

    /// The feature's attribute mapping.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Look up a single attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Bounding rectangle of one zone in the R-tree, carrying its source index.
#[derive(Debug, Clone)]
struct ZoneEnvelope {
    envelope: AABB<[f64; 2]>,
    index: usize,
}

impl RTreeObject for ZoneEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An ordered, immutable collection of zones in one reference system.
#[derive(Debug)]
pub struct ZoneStore {
    zones: Vec<Zone>,
    crs: Crs,
    index: RTree<ZoneEnvelope>,
    by_id: FxHashMap<String, usize>,
}

impl ZoneStore {
    /// Build a store from a serialized GeoJSON FeatureCollection.
    ///
    /// Geometries are reprojected from `source_crs` to `target_crs` when
    /// the systems differ; the returned store is tagged with
    /// `target_crs` and keeps features in source-file order.
    ///
    /// # Errors
    ///
    /// Fails atomically with a [`DatasetLoadError`] on malformed JSON, a
    /// root that is not a FeatureCollection, an invalid ring structure,
    /// or a reprojection domain failure on any feature.
    ///
    /// # Examples
    ///
    /// ```
    /// use hydrozone::{Crs, Point, ZoneStore};
    ///
    /// let dataset = r#"{
    ///     "type": "FeatureCollection",
    ///     "features": [{
    ///         "type": "Feature",
    ///         "properties": {"zone": "A"},
    ///         "geometry": {
    ///             "type": "Polygon",
    ///             "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]
    ///         }
    ///     }]
    /// }"#;
    ///
    /// let store = ZoneStore::from_geojson(dataset.as_bytes(), Crs::Wgs84, Crs::Wgs84)?;
    /// let zone = store.find_containing(Point::new(5.0, 5.0), Crs::Wgs84)?;
    /// assert_eq!(zone.unwrap().attribute("zone").unwrap(), "A");
    /// # Ok::<(), hydrozone::HydrozoneError>(())
    /// ```
    pub fn from_geojson(
        bytes: &[u8],
        source_crs: Crs,
        target_crs: Crs,
    ) -> Result<Self, DatasetLoadError> {
        let geojson: GeoJson = serde_json::from_slice(bytes)?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(DatasetLoadError::NotAFeatureCollection);
        };

        let mut zones = Vec::with_capacity(collection.features.len());
        for (position, feature) in collection.features.into_iter().enumerate() {
            zones.push(build_zone(feature, position, source_crs, target_crs)?);
        }

        let mut by_id = FxHashMap::default();
        let mut envelopes = Vec::new();
        for (index, zone) in zones.iter().enumerate() {
            if by_id.insert(zone.id.clone(), index).is_some() {
                log::warn!("duplicate feature id {:?}; lookup keeps the last one", zone.id);
            }
            if let Some(rect) = zone.geometry.bounding_rect() {
                envelopes.push(ZoneEnvelope {
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    index,
                });
            } else if !zone.geometry.is_polygonal() {
                log::warn!(
                    "feature {} has non-polygonal geometry ({}); it will never match a containment query",
                    zone.id,
                    zone.geometry.kind()
                );
            }
        }

        Ok(Self {
            zones,
            crs: target_crs,
            index: RTree::bulk_load(envelopes),
            by_id,
        })
    }

    /// Reference system every stored geometry is expressed in.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Number of zones, in source order.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Iterate zones in source order.
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Look up a zone by feature id.
    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.by_id.get(id).map(|&index| &self.zones[index])
    }

    /// Find the first zone containing the query point.
    ///
    /// The point is reprojected into the store's system first (identity
    /// if `point_crs` already matches). Zones are tested in source
    /// order, so if polygons overlap the earliest one wins; the R-tree
    /// only narrows the candidate set, it never changes the tie-break.
    /// `Ok(None)` means no zone contains the point and is distinct from
    /// any error.
    pub fn find_containing(
        &self,
        point: Point<f64>,
        point_crs: Crs,
    ) -> Result<Option<&Zone>, ProjectionDomainError> {
        Ok(self.candidates(point, point_crs)?.next())
    }

    /// All zones containing the query point, in source order.
    pub fn find_all_containing(
        &self,
        point: Point<f64>,
        point_crs: Crs,
    ) -> Result<Vec<&Zone>, ProjectionDomainError> {
        Ok(self.candidates(point, point_crs)?.collect())
    }

    fn candidates(
        &self,
        point: Point<f64>,
        point_crs: Crs,
    ) -> Result<impl Iterator<Item = &Zone>, ProjectionDomainError> {
        let query = crate::crs::reproject_point(point, point_crs, self.crs)?;

        let mut hits: SmallVec<[usize; 16]> = self
            .index
            .locate_in_envelope_intersecting(&AABB::from_point([query.x(), query.y()]))
            .map(|envelope| envelope.index)
            .collect();
        hits.sort_unstable();

        Ok(hits
            .into_iter()
            .map(move |index| &self.zones[index])
            .filter(move |zone| zone.geometry.contains(&query)))
    }
}

fn build_zone(
    feature: Feature,
    position: usize,
    source_crs: Crs,
    target_crs: Crs,
) -> Result<Zone, DatasetLoadError> {
    let id = match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => format!("feature-{position}"),
    };

    let geometry = match &feature.geometry {
        Some(geometry) => convert_geometry(geometry, &id)?,
        None => ZoneGeometry::Other {
            kind: "(none)".to_string(),
        },
    };

    let geometry = geometry
        .reproject(source_crs, target_crs)
        .map_err(|source| DatasetLoadError::Reprojection {
            id: id.clone(),
            source,
        })?;

    Ok(Zone {
        id,
        geometry,
        attributes: feature.properties.unwrap_or_default(),
    })
}

fn convert_geometry(
    geometry: &geojson::Geometry,
    id: &str,
) -> Result<ZoneGeometry, DatasetLoadError> {
    match &geometry.value {
        geojson::Value::Polygon(rings) => Ok(ZoneGeometry::Polygon(polygon_from_rings(rings, id)?)),
        geojson::Value::MultiPolygon(polygons) => {
            let polygons = polygons
                .iter()
                .map(|rings| polygon_from_rings(rings, id))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ZoneGeometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        other => Ok(ZoneGeometry::Other {
            kind: geometry_kind(other).to_string(),
        }),
    }
}

fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn polygon_from_rings(
    rings: &[Vec<Vec<f64>>],
    id: &str,
) -> Result<Polygon<f64>, DatasetLoadError> {
    let geometry_err = |reason: String| DatasetLoadError::Geometry {
        id: id.to_string(),
        reason,
    };

    let mut converted = Vec::with_capacity(rings.len());
    for ring in rings {
        if ring.len() < 4 {
            return Err(geometry_err(format!(
                "ring has {} positions, at least 4 are required",
                ring.len()
            )));
        }
        let coords = ring
            .iter()
            .map(|position| {
                if position.len() < 2 {
                    return Err(geometry_err(
                        "position must carry at least 2 coordinates".to_string(),
                    ));
                }
                Ok(Coord {
                    x: position[0],
                    y: position[1],
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if coords.first() != coords.last() {
            return Err(geometry_err("ring is not closed".to_string()));
        }
        converted.push(LineString::from(coords));
    }

    let mut rings = converted.into_iter();
    match rings.next() {
        Some(exterior) => Ok(Polygon::new(exterior, rings.collect())),
        None => Err(geometry_err("polygon has no rings".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_ZONE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"zone": "A"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]
            }
        }]
    }"#;

    fn wgs84_store(json: &str) -> ZoneStore {
        ZoneStore::from_geojson(json.as_bytes(), Crs::Wgs84, Crs::Wgs84).unwrap()
    }

    #[test]
    fn test_square_zone_scenario() {
        let store = wgs84_store(SQUARE_ZONE);
        assert_eq!(store.len(), 1);

        let zone = store
            .find_containing(Point::new(5.0, 5.0), Crs::Wgs84)
            .unwrap()
            .expect("point inside the square");
        assert_eq!(zone.attribute("zone").unwrap(), "A");

        let miss = store
            .find_containing(Point::new(50.0, 50.0), Crs::Wgs84)
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_repeated_queries_are_deterministic() {
        let store = wgs84_store(SQUARE_ZONE);
        let first = store
            .find_containing(Point::new(5.0, 5.0), Crs::Wgs84)
            .unwrap()
            .map(|z| z.id().to_string());
        for _ in 0..10 {
            let again = store
                .find_containing(Point::new(5.0, 5.0), Crs::Wgs84)
                .unwrap()
                .map(|z| z.id().to_string());
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_overlapping_polygons_first_in_source_order_wins() {
        let overlapping = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"zone": "first"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"zone": "second"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
                }
            ]
        }"#;
        let store = wgs84_store(overlapping);

        let zone = store
            .find_containing(Point::new(5.0, 5.0), Crs::Wgs84)
            .unwrap()
            .unwrap();
        assert_eq!(zone.attribute("zone").unwrap(), "first");

        let all = store
            .find_all_containing(Point::new(5.0, 5.0), Crs::Wgs84)
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attribute("zone").unwrap(), "first");
        assert_eq!(all[1].attribute("zone").unwrap(), "second");
    }

    #[test]
    fn test_non_polygonal_features_are_kept_but_never_match() {
        let mixed = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "a point"},
                    "geometry": {"type": "Point", "coordinates": [5, 5]}
                },
                {
                    "type": "Feature",
                    "properties": {"zone": "B"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
                }
            ]
        }"#;
        let store = wgs84_store(mixed);
        assert_eq!(store.len(), 2);

        let zone = store
            .find_containing(Point::new(5.0, 5.0), Crs::Wgs84)
            .unwrap()
            .unwrap();
        assert_eq!(zone.attribute("zone").unwrap(), "B");
    }

    #[test]
    fn test_feature_ids() {
        let with_ids = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "zone-42",
                    "properties": {},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Polygon", "coordinates": [[[2,2],[3,2],[3,3],[2,3],[2,2]]]}
                }
            ]
        }"#;
        let store = wgs84_store(with_ids);
        assert!(store.get("zone-42").is_some());
        assert!(store.get("feature-1").is_some());
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_malformed_json_fails_parse() {
        let err = ZoneStore::from_geojson(b"{not json", Crs::Wgs84, Crs::Wgs84).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Parse(_)));
    }

    #[test]
    fn test_non_collection_root_is_rejected() {
        let geometry_only = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        let err =
            ZoneStore::from_geojson(geometry_only.as_bytes(), Crs::Wgs84, Crs::Wgs84).unwrap_err();
        assert!(matches!(err, DatasetLoadError::NotAFeatureCollection));
    }

    #[test]
    fn test_bad_ring_structure_fails_the_whole_build() {
        let unclosed = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"zone": "ok"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"zone": "bad"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1]]]}
                }
            ]
        }"#;
        let err = ZoneStore::from_geojson(unclosed.as_bytes(), Crs::Wgs84, Crs::Wgs84).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Geometry { .. }));

        let too_short = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[0,0]]]}
            }]
        }"#;
        let err =
            ZoneStore::from_geojson(too_short.as_bytes(), Crs::Wgs84, Crs::Wgs84).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Geometry { .. }));
    }

    #[test]
    fn test_out_of_domain_feature_fails_reprojection() {
        // Tokyo is well outside the National Grid's projection domain.
        let tokyo = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Polygon", "coordinates": [[[139,35],[140,35],[140,36],[139,36],[139,35]]]}
            }]
        }"#;
        let err = ZoneStore::from_geojson(tokyo.as_bytes(), Crs::Wgs84, Crs::NationalGrid)
            .unwrap_err();
        assert!(matches!(err, DatasetLoadError::Reprojection { .. }));
    }

    #[test]
    fn test_load_time_reprojection_enables_cross_system_queries() {
        // A 2km square on the grid around Birmingham city centre.
        let grid_square = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"zone": "brum"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[405000,285000],[407000,285000],[407000,287000],[405000,287000],[405000,285000]]]
                }
            }]
        }"#;
        let store =
            ZoneStore::from_geojson(grid_square.as_bytes(), Crs::NationalGrid, Crs::Wgs84).unwrap();
        assert_eq!(store.crs(), Crs::Wgs84);

        // Query with the grid centre of the square; the engine reprojects it.
        let zone = store
            .find_containing(Point::new(406_000.0, 286_000.0), Crs::NationalGrid)
            .unwrap()
            .unwrap();
        assert_eq!(zone.attribute("zone").unwrap(), "brum");
    }

    #[test]
    fn test_empty_collection_builds_an_empty_store() {
        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        let store = wgs84_store(empty);
        assert!(store.is_empty());
        assert!(
            store
                .find_containing(Point::new(0.0, 0.0), Crs::Wgs84)
                .unwrap()
                .is_none()
        );
    }
}
