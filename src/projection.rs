//! Odwzorowanie Equal Earth i dopasowanie do obszaru rysowania.
//!
//! Dwa tryby: cały świat na stałym płótnie ([`fit_world`]) oraz pojedynczy
//! kraj dopasowany do rozmiaru kontenera ([`fit_country`]). Projekcja jest
//! wyliczana od nowa przy każdej zmianie wejścia.

use geo::{BoundingRect, Contains, Coord, Geometry, MapCoords, MultiPolygon, Point, Polygon, Rect};
use geojson::Feature;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{path, viewport::Viewport};

const A1: f64 = 1.340264;
const A2: f64 = -0.081106;
const A3: f64 = 0.000893;
const A4: f64 = 0.003796;
// sqrt(3) / 2
const M: f64 = 0.866_025_403_784_438_6;

pub const DEFAULT_SCALE: f64 = 177.158;

/// Stałe płótno widoku świata.
pub const WORLD_WIDTH: f64 = 980.0;
pub const WORLD_HEIGHT: f64 = 520.0;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum FitError {
    #[error("target size {width}x{height} has no area")]
    DegenerateTarget { width: f64, height: f64 },
    #[error("geometry is empty")]
    EmptyGeometry,
    #[error("geometry extent cannot be fitted")]
    DegenerateExtent,
}

/// Surowe Equal Earth (radiany → jednostki płaskie, y w górę).
fn equal_earth_raw(lambda: f64, phi: f64) -> (f64, f64) {
    let l = (M * phi.sin()).asin();
    let l2 = l * l;
    let l6 = l2 * l2 * l2;
    let x = lambda * l.cos() / (M * (A1 + 3.0 * A2 * l2 + l6 * (7.0 * A3 + 9.0 * A4 * l2)));
    let y = l * (A1 + A2 * l2 + l6 * (A3 + A4 * l2));
    (x, y)
}

fn wrap_longitude(lambda: f64) -> f64 {
    if lambda > PI {
        lambda - 2.0 * PI
    } else if lambda < -PI {
        lambda + 2.0 * PI
    } else {
        lambda
    }
}

/// Konfiguracja projekcji: środek (stopnie), skala i przesunięcie (piksele).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    center: Coord<f64>,
    scale: f64,
    translate: Coord<f64>,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            center: Coord { x: 0.0, y: 0.0 },
            scale: DEFAULT_SCALE,
            translate: Coord { x: 480.0, y: 250.0 },
        }
    }
}

impl Projection {
    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> Coord<f64> {
        self.translate
    }

    /// (lon, lat) w stopniach → piksele, y rośnie w dół.
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        let (x, y) = equal_earth_raw(wrap_longitude(coord.x.to_radians()), coord.y.to_radians());
        let (cx, cy) = equal_earth_raw(self.center.x.to_radians(), self.center.y.to_radians());
        Coord {
            x: self.translate.x + self.scale * (x - cx),
            y: self.translate.y - self.scale * (y - cy),
        }
    }

    pub fn project_geometry(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        let projection = *self;
        geometry.map_coords(move |coord| projection.project(coord))
    }

    /// Dopasowuje skalę i przesunięcie tak, by geometrie wypełniły `[0,0]..[w,h]`.
    pub fn fit_size(size: Viewport, geometries: &[Geometry<f64>]) -> Result<Self, FitError> {
        if size.is_degenerate() {
            return Err(FitError::DegenerateTarget {
                width: size.width(),
                height: size.height(),
            });
        }

        let unit = Self {
            scale: 1.0,
            translate: Coord { x: 0.0, y: 0.0 },
            ..Self::default()
        };
        let bounds = geometries
            .iter()
            .filter_map(|geometry| unit.project_geometry(geometry).bounding_rect())
            .reduce(merge_rects)
            .ok_or(FitError::EmptyGeometry)?;

        let (min, max) = (bounds.min(), bounds.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(FitError::DegenerateExtent);
        }

        let k = (size.width() / bounds.width()).min(size.height() / bounds.height());
        if !k.is_finite() || k <= 0.0 {
            return Err(FitError::DegenerateExtent);
        }

        let fitted = Self {
            scale: k,
            translate: Coord {
                x: (size.width() - k * (min.x + max.x)) / 2.0,
                y: (size.height() - k * (min.y + max.y)) / 2.0,
            },
            ..unit
        };
        debug!(scale = fitted.scale, tx = fitted.translate.x, ty = fitted.translate.y, "fitted projection");
        Ok(fitted)
    }
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Geometria cechy jako typ `geo`; `None` dla braku geometrii lub błędu konwersji.
pub fn feature_geometry(feature: &Feature) -> Option<Geometry<f64>> {
    let geometry = feature.geometry.as_ref()?;
    match Geometry::try_from(geometry.value.clone()) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            warn!(id = ?feature.id, error = %e, "feature geometry cannot be converted");
            None
        }
    }
}

/// Jedna wspólna projekcja dla wszystkich krajów świata.
pub fn fit_world(canvas: Viewport, features: &[Feature]) -> Result<Projection, FitError> {
    let geometries: Vec<_> = features.iter().filter_map(feature_geometry).collect();
    Projection::fit_size(canvas, &geometries)
}

/// Projekcja dopasowana do jednego kraju.
pub fn fit_country(target: Viewport, feature: &Feature) -> Result<Projection, FitError> {
    let geometry = feature_geometry(feature).ok_or(FitError::EmptyGeometry)?;
    Projection::fit_size(target, std::slice::from_ref(&geometry))
}

/// Geometria po projekcji: do rysowania i trafień wskaźnikiem.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedShape {
    geometry: Geometry<f64>,
    polygons: MultiPolygon<f64>,
}

impl ProjectedShape {
    pub fn new(geometry: &Geometry<f64>, projection: &Projection) -> Self {
        let geometry = projection.project_geometry(geometry);
        let mut polygons = Vec::new();
        collect_polygons(&geometry, &mut polygons);
        Self {
            geometry,
            polygons: MultiPolygon(polygons),
        }
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.contains(&Point::new(x, y))
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    pub fn path(&self) -> String {
        path::geometry_path(&self.geometry)
    }
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for member in &gc.0 {
                collect_polygons(member, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use proptest::prelude::*;

    fn germany() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 6.0, y: 47.0),
            (x: 15.0, y: 47.0),
            (x: 15.0, y: 55.0),
            (x: 6.0, y: 55.0),
            (x: 6.0, y: 47.0),
        ])
    }

    #[test]
    fn origin_projects_to_translate() {
        let projection = Projection::default();
        let p = projection.project(Coord { x: 0.0, y: 0.0 });
        assert!((p.x - 480.0).abs() < 1e-9);
        assert!((p.y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let projection = Projection::default();
        let origin = projection.project(Coord { x: 0.0, y: 0.0 });
        let north_east = projection.project(Coord { x: 10.0, y: 10.0 });
        assert!(north_east.x > origin.x);
        assert!(north_east.y < origin.y);
    }

    #[test]
    fn fitted_shape_fills_target() {
        let size = Viewport::new(640.0, 360.0);
        let projection = Projection::fit_size(size, &[germany()]).unwrap();
        let bounds = ProjectedShape::new(&germany(), &projection).bounds().unwrap();

        let eps = 1e-6;
        assert!(bounds.min().x >= -eps && bounds.min().y >= -eps);
        assert!(bounds.max().x <= 640.0 + eps && bounds.max().y <= 360.0 + eps);
        let touches_x = bounds.min().x.abs() < eps && (bounds.max().x - 640.0).abs() < eps;
        let touches_y = bounds.min().y.abs() < eps && (bounds.max().y - 360.0).abs() < eps;
        assert!(touches_x || touches_y);
    }

    #[test]
    fn degenerate_target_has_no_projection() {
        for (w, h) in [(0.0, 360.0), (640.0, 0.0), (0.0, 0.0), (-5.0, 10.0)] {
            assert!(matches!(
                Projection::fit_size(Viewport::new(w, h), &[germany()]),
                Err(FitError::DegenerateTarget { .. })
            ));
        }
    }

    #[test]
    fn empty_and_point_geometry_cannot_be_fitted() {
        let size = Viewport::new(100.0, 100.0);
        assert_eq!(Projection::fit_size(size, &[]), Err(FitError::EmptyGeometry));
        let point = Geometry::Point(Point::new(10.0, 10.0));
        assert_eq!(Projection::fit_size(size, &[point]), Err(FitError::DegenerateExtent));
    }

    #[test]
    fn hit_test_uses_projected_polygons() {
        let size = Viewport::new(200.0, 100.0);
        let projection = Projection::fit_size(size, &[germany()]).unwrap();
        let shape = ProjectedShape::new(&germany(), &projection);
        let bounds = shape.bounds().unwrap();
        let center = bounds.center();
        assert!(shape.contains(center.x, center.y));
        assert!(!shape.contains(bounds.max().x + 5.0, center.y));
    }

    #[test]
    fn longitudes_past_antimeridian_wrap() {
        let projection = Projection::default();
        let a = projection.project(Coord { x: 190.0, y: 0.0 });
        let b = projection.project(Coord { x: -170.0, y: 0.0 });
        assert!((a.x - b.x).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn fit_is_deterministic_and_contained(w in 1.0f64..2000.0, h in 1.0f64..2000.0) {
            let size = Viewport::new(w, h);
            let first = Projection::fit_size(size, &[germany()]).unwrap();
            let second = Projection::fit_size(size, &[germany()]).unwrap();
            prop_assert_eq!(first, second);

            let bounds = ProjectedShape::new(&germany(), &first).bounds().unwrap();
            let eps = 1e-6 * w.max(h);
            prop_assert!(bounds.min().x >= -eps && bounds.min().y >= -eps);
            prop_assert!(bounds.max().x <= w + eps && bounds.max().y <= h + eps);
        }
    }
}
