//! Dekodowanie dokumentu TopoJSON (konwencja world-atlas) do GeoJSON.
//!
//! Dokument jest sprawdzany tylko strukturalnie (`type == "Topology"` oraz pole
//! `objects`); pojedynczy obiekt geometrii dekodujemy dopiero na żądanie, ze
//! wspólnej tablicy łuków.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoValue, feature::Id};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Obiekt preferowany przy wyborze warstwy.
pub const COUNTRIES_OBJECT: &str = "countries";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("invalid topology document: {0}")]
    InvalidDocument(String),
    #[error("topology has no geometry objects")]
    NoGeometryObject,
    #[error("object {0:?} decodes to a single feature, not a feature collection")]
    DecodeMismatch(String),
    #[error("object {object:?} is malformed: {reason}")]
    MalformedObject { object: String, reason: String },
}

/// Kwantyzacja: pozycja = (x * scale) + translate.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// Załadowany, niezmienny dokument topologii.
#[derive(Clone, Debug)]
pub struct Topology {
    objects: Map<String, Value>,
    arcs: Vec<Vec<Vec<f64>>>,
    transform: Option<Transform>,
}

#[derive(Deserialize)]
struct RawTopology {
    objects: Map<String, Value>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    transform: Option<Transform>,
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TopologyError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| TopologyError::InvalidDocument(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, TopologyError> {
        let is_topology = value.get("type").and_then(Value::as_str) == Some("Topology")
            && value.get("objects").is_some();
        if !is_topology {
            return Err(TopologyError::InvalidDocument(
                "expected a \"Topology\" type marker and an \"objects\" field".to_string(),
            ));
        }

        let raw: RawTopology = serde_json::from_value(value)
            .map_err(|e| TopologyError::InvalidDocument(e.to_string()))?;
        Ok(Self {
            objects: raw.objects,
            arcs: raw.arcs,
            transform: raw.transform,
        })
    }

    /// Nazwy obiektów w kolejności z dokumentu.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// "countries", a jeśli go brak, pierwszy obiekt w dokumencie.
    /// Obiekty `null` liczą się jak nieobecne.
    pub fn select_object(&self) -> Result<&str, TopologyError> {
        if self
            .objects
            .get(COUNTRIES_OBJECT)
            .is_some_and(|object| !object.is_null())
        {
            return Ok(COUNTRIES_OBJECT);
        }
        match self.objects.iter().find(|(_, object)| !object.is_null()).map(|(name, _)| name.as_str()) {
            Some(name) => {
                // Nic nie gwarantuje, że to warstwa krajów.
                warn!(object = %name, "no \"countries\" object in topology, using first object");
                Ok(name)
            }
            None => Err(TopologyError::NoGeometryObject),
        }
    }

    /// Dekoduje nazwany obiekt do kolekcji cech.
    ///
    /// Obiekt, który nie jest `GeometryCollection`, daje pojedynczą cechę i
    /// jest odrzucany jako [`TopologyError::DecodeMismatch`].
    pub fn feature_collection(&self, name: &str) -> Result<FeatureCollection, TopologyError> {
        let malformed = |reason: String| TopologyError::MalformedObject {
            object: name.to_string(),
            reason,
        };

        let raw = self
            .objects
            .get(name)
            .ok_or_else(|| malformed("no such object".to_string()))?;
        let raw = RawGeometry::deserialize(raw).map_err(|e| malformed(e.to_string()))?;
        let object = TopoGeometry::try_from(raw).map_err(malformed)?;

        let members = match &object.shape {
            TopoShape::Collection(members) => members,
            _ => return Err(TopologyError::DecodeMismatch(name.to_string())),
        };

        let decoder = Decoder {
            arcs: self.decode_arcs().map_err(malformed)?,
            transform: self.transform,
        };
        let features = members
            .iter()
            .map(|member| decoder.feature(member))
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;

        debug!(object = name, features = features.len(), "decoded topology object");
        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    /// Łuki w pozycjach bezwzględnych (delta + kwantyzacja rozwinięte).
    fn decode_arcs(&self) -> Result<Vec<Vec<[f64; 2]>>, String> {
        self.arcs
            .iter()
            .enumerate()
            .map(|(index, arc)| {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .map(|position| {
                        let [px, py] = match position.as_slice() {
                            [px, py, ..] => [*px, *py],
                            _ => return Err(format!("arc {index} has a position with fewer than two values")),
                        };
                        Ok(match &self.transform {
                            Some(t) => {
                                x += px;
                                y += py;
                                [x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]]
                            }
                            None => [px, py],
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()
            })
            .collect()
    }
}

/// Wybiera warstwę krajów i dekoduje ją.
pub fn decode_countries(topology: &Topology) -> Result<FeatureCollection, TopologyError> {
    let name = topology.select_object()?;
    topology.feature_collection(name)
}

/// Geometria TopoJSON: kolekcja albo pojedyncza geometria.
#[derive(Clone, Debug)]
pub struct TopoGeometry {
    pub id: Option<Id>,
    pub properties: Option<JsonObject>,
    pub shape: TopoShape,
}

#[derive(Clone, Debug)]
pub enum TopoShape {
    Collection(Vec<TopoGeometry>),
    Point(Vec<f64>),
    MultiPoint(Vec<Vec<f64>>),
    LineString(Vec<i64>),
    MultiLineString(Vec<Vec<i64>>),
    Polygon(Vec<Vec<i64>>),
    MultiPolygon(Vec<Vec<Vec<i64>>>),
    /// `"type": null`
    Null,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<JsonObject>,
    #[serde(default)]
    arcs: Value,
    #[serde(default)]
    coordinates: Value,
    #[serde(default)]
    geometries: Vec<RawGeometry>,
}

impl TryFrom<RawGeometry> for TopoGeometry {
    type Error = String;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        fn field<T: for<'de> Deserialize<'de>>(kind: &str, value: Value) -> Result<T, String> {
            serde_json::from_value(value).map_err(|e| format!("{kind}: {e}"))
        }

        let shape = match raw.kind.as_deref() {
            None => TopoShape::Null,
            Some("GeometryCollection") => TopoShape::Collection(
                raw.geometries
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Some(kind @ "Point") => TopoShape::Point(field(kind, raw.coordinates)?),
            Some(kind @ "MultiPoint") => TopoShape::MultiPoint(field(kind, raw.coordinates)?),
            Some(kind @ "LineString") => TopoShape::LineString(field(kind, raw.arcs)?),
            Some(kind @ "MultiLineString") => TopoShape::MultiLineString(field(kind, raw.arcs)?),
            Some(kind @ "Polygon") => TopoShape::Polygon(field(kind, raw.arcs)?),
            Some(kind @ "MultiPolygon") => TopoShape::MultiPolygon(field(kind, raw.arcs)?),
            Some(other) => return Err(format!("unknown geometry type {other:?}")),
        };

        let id = match raw.id {
            Some(Value::String(s)) => Some(Id::String(s)),
            Some(Value::Number(n)) => Some(Id::Number(n)),
            _ => None,
        };

        Ok(Self {
            id,
            properties: raw.properties,
            shape,
        })
    }
}

struct Decoder {
    arcs: Vec<Vec<[f64; 2]>>,
    transform: Option<Transform>,
}

impl Decoder {
    fn feature(&self, object: &TopoGeometry) -> Result<Feature, String> {
        Ok(Feature {
            bbox: None,
            geometry: self.geometry(&object.shape)?,
            id: object.id.clone(),
            properties: Some(object.properties.clone().unwrap_or_default()),
            foreign_members: None,
        })
    }

    fn geometry(&self, shape: &TopoShape) -> Result<Option<Geometry>, String> {
        let value = match shape {
            TopoShape::Null => return Ok(None),
            TopoShape::Point(position) => GeoValue::Point(self.point(position)?),
            TopoShape::MultiPoint(positions) => GeoValue::MultiPoint(
                positions.iter().map(|p| self.point(p)).collect::<Result<_, _>>()?,
            ),
            TopoShape::LineString(arcs) => GeoValue::LineString(self.line(arcs)?),
            TopoShape::MultiLineString(lines) => GeoValue::MultiLineString(
                lines.iter().map(|arcs| self.line(arcs)).collect::<Result<_, _>>()?,
            ),
            TopoShape::Polygon(rings) => GeoValue::Polygon(self.polygon(rings)?),
            TopoShape::MultiPolygon(polygons) => GeoValue::MultiPolygon(
                polygons.iter().map(|rings| self.polygon(rings)).collect::<Result<_, _>>()?,
            ),
            TopoShape::Collection(members) => {
                let mut geometries = Vec::with_capacity(members.len());
                for member in members {
                    if let Some(geometry) = self.geometry(&member.shape)? {
                        geometries.push(geometry);
                    }
                }
                GeoValue::GeometryCollection(geometries)
            }
        };
        Ok(Some(Geometry::new(value)))
    }

    fn point(&self, position: &[f64]) -> Result<Vec<f64>, String> {
        let mut out = position.to_vec();
        if out.len() < 2 {
            return Err("point position has fewer than two values".to_string());
        }
        if let Some(t) = &self.transform {
            out[0] = out[0] * t.scale[0] + t.translate[0];
            out[1] = out[1] * t.scale[1] + t.translate[1];
        }
        Ok(out)
    }

    /// Dokleja łuk; ujemny indeks `!i` oznacza łuk `i` odwrócony.
    /// Punkt łączenia z poprzednim łukiem jest wspólny.
    fn arc(&self, index: i64, points: &mut Vec<[f64; 2]>) -> Result<(), String> {
        let (resolved, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(resolved)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or_else(|| format!("arc index {index} out of range"))?;

        points.pop();
        let start = points.len();
        points.extend_from_slice(arc);
        if reversed {
            points[start..].reverse();
        }
        Ok(())
    }

    fn line(&self, arcs: &[i64]) -> Result<Vec<Vec<f64>>, String> {
        let mut points = Vec::new();
        for &index in arcs {
            self.arc(index, &mut points)?;
        }
        if points.len() == 1 {
            let first = points[0];
            points.push(first);
        }
        Ok(points.into_iter().map(|p| p.to_vec()).collect())
    }

    fn ring(&self, arcs: &[i64]) -> Result<Vec<Vec<f64>>, String> {
        let mut points = self.line(arcs)?;
        if let Some(first) = points.first().cloned() {
            while points.len() < 4 {
                points.push(first.clone());
            }
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<Vec<f64>>>, String> {
        rings.iter().map(|arcs| self.ring(arcs)).collect()
    }
}
