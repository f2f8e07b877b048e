//! Ciąg ścieżki SVG dla geometrii po projekcji.
//!
//! Format jak w d3-geo: `M x,y L x,y ... Z` dla każdego pierścienia, bez
//! separatorów, liczby zaokrąglone do 3 miejsc po przecinku.

use geo::{Coord, Geometry};
use geojson::Feature;

use crate::projection::{Projection, feature_geometry};

const POINT_RADIUS: f64 = 4.5;

/// Ścieżka cechy; pusty ciąg, gdy brak cechy albo projekcji.
pub fn feature_path(feature: Option<&Feature>, projection: Option<&Projection>) -> String {
    match (feature.and_then(feature_geometry), projection) {
        (Some(geometry), Some(projection)) => path_string(&geometry, projection),
        _ => String::new(),
    }
}

/// Rzutuje geometrię (lon/lat) i zwraca jej ścieżkę.
pub fn path_string(geometry: &Geometry<f64>, projection: &Projection) -> String {
    geometry_path(&projection.project_geometry(geometry))
}

/// Ścieżka geometrii, która jest już w pikselach.
pub fn geometry_path(projected: &Geometry<f64>) -> String {
    let mut out = String::new();
    write_geometry(&mut out, projected);
    out
}

fn write_geometry(out: &mut String, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => write_point(out, p.0),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| write_point(out, p.0)),
        Geometry::Line(line) => write_ring(out, &[line.start, line.end], false),
        Geometry::LineString(ls) => write_ring(out, &ls.0, false),
        Geometry::MultiLineString(mls) => mls.0.iter().for_each(|ls| write_ring(out, &ls.0, false)),
        Geometry::Polygon(polygon) => write_polygon(out, polygon),
        Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|polygon| write_polygon(out, polygon)),
        Geometry::Rect(r) => write_polygon(out, &r.to_polygon()),
        Geometry::Triangle(t) => write_polygon(out, &t.to_polygon()),
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| write_geometry(out, g)),
    }
}

fn write_polygon(out: &mut String, polygon: &geo::Polygon<f64>) {
    write_ring(out, &polygon.exterior().0, true);
    for interior in polygon.interiors() {
        write_ring(out, &interior.0, true);
    }
}

fn write_ring(out: &mut String, coords: &[Coord<f64>], closed: bool) {
    // Zamykający duplikat pomijamy, domyka go "Z".
    let n = match coords {
        [first, .., last] if closed && first == last => coords.len() - 1,
        _ => coords.len(),
    };
    for (i, c) in coords[..n].iter().enumerate() {
        out.push(if i == 0 { 'M' } else { 'L' });
        push_coord(out, *c);
    }
    if closed && n > 0 {
        out.push('Z');
    }
}

fn write_point(out: &mut String, c: Coord<f64>) {
    out.push('M');
    push_coord(out, c);
    let r = format_number(POINT_RADIUS);
    let d = format_number(2.0 * POINT_RADIUS);
    out.push_str(&format!("m0,{r}a{r},{r} 0 1,1 0,-{d}a{r},{r} 0 1,1 0,{d}z"));
}

fn push_coord(out: &mut String, c: Coord<f64>) {
    out.push_str(&format_number(c.x));
    out.push(',');
    out.push_str(&format_number(c.y));
}

/// 3 miejsca po przecinku, bez zbędnych zer; `-0` jako `0`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}
