//! Samodzielne dokumenty SVG z gotowych ścieżek.

use crate::{
    iso::Alpha2,
    path::format_number,
    views::{CountryOutline, WorldMap},
};

const LAND: &str = "#d6d6da";
const HIGHLIGHT: &str = "#f53";
const STROKE: &str = "#ffffff";

fn open_document(svg: &mut String, width: f64, height: f64) {
    let (w, h) = (format_number(width), format_number(height));
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">"#,
    ));
}

fn push_path(svg: &mut String, d: &str, fill: &str, title: Option<&str>) {
    // puste ścieżki nic nie rysują
    if d.is_empty() {
        return;
    }
    svg.push_str(&format!(
        r#"<path d="{d}" fill="{fill}" stroke="{STROKE}" stroke-width="0.5">"#,
    ));
    if let Some(title) = title {
        svg.push_str(&format!("<title>{}</title>", escape_xml(title)));
    }
    svg.push_str("</path>");
}

/// Mapa świata; `highlight` wyróżnia jeden kraj.
pub fn render_world_svg(map: &WorldMap, highlight: Option<Alpha2>) -> String {
    let canvas = map.canvas();
    let mut svg = String::with_capacity(map.regions().len() * 512);
    open_document(&mut svg, canvas.width(), canvas.height());
    for region in map.regions() {
        let fill = if Some(region.code) == highlight { HIGHLIGHT } else { LAND };
        let title = format!("{} ({})", region.name, region.code);
        push_path(&mut svg, &region.path, fill, Some(&title));
    }
    svg.push_str("</svg>\n");
    svg
}

pub fn render_country_svg(outline: &CountryOutline) -> String {
    let mut svg = String::new();
    open_document(&mut svg, outline.viewport.width(), outline.viewport.height());
    let title = outline.name.as_deref().unwrap_or(outline.code.as_str());
    push_path(&mut svg, &outline.path, HIGHLIGHT, Some(title));
    svg.push_str("</svg>\n");
    svg
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
