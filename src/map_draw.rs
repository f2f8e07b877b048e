use geo::{LineString, MultiPolygon};
use ratatui::{
    Frame,
    layout::Rect as TuiRect,
    style::Color,
    symbols::Marker,
    widgets::{
        Block, Borders,
        canvas::{Canvas, Context, Line},
    },
};

use country_atlas::{
    iso::Alpha2,
    views::{CountryOutline, WorldMap},
};

/// Rysuje pierścień; współrzędne w pikselach (y w dół), płótno ma y w górę.
fn draw_ring(ctx: &mut Context<'_>, ring: &LineString<f64>, height: f64, color: Color) {
    for window in ring.0.windows(2) {
        let (a, b) = (window[0], window[1]);
        ctx.draw(&Line {
            x1: a.x,
            y1: height - a.y,
            x2: b.x,
            y2: height - b.y,
            color,
        });
    }
}

fn draw_polygons(ctx: &mut Context<'_>, polygons: &MultiPolygon<f64>, height: f64, color: Color) {
    for poly in &polygons.0 {
        draw_ring(ctx, poly.exterior(), height, color);
        for interior in poly.interiors() {
            draw_ring(ctx, interior, height, color);
        }
    }
}

/// Mapa świata: wszystkie granice na biało, fokus na żółto, najechany na czerwono.
/// Zwraca wnętrze ramki, w którym leży płótno.
pub fn draw_world(
    f: &mut Frame<'_>,
    area: TuiRect,
    map: &WorldMap,
    hovered: Option<Alpha2>,
    focused: Option<Alpha2>,
) -> TuiRect {
    let size = map.canvas();
    let height = size.height();
    let block = Block::default().title("Mapa świata").borders(Borders::ALL);
    let inner = block.inner(area);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, size.width()])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for region in map.regions() {
                draw_polygons(ctx, region.shape.polygons(), height, Color::White);
            }
            ctx.layer();
            for region in map.regions() {
                let color = if Some(region.code) == hovered {
                    Color::Red
                } else if Some(region.code) == focused {
                    Color::Yellow
                } else {
                    continue;
                };
                draw_polygons(ctx, region.shape.polygons(), height, color);
            }
        });
    f.render_widget(canvas, area);
    inner
}

/// Kontur kraju dopasowany do panelu.
pub fn draw_outline(f: &mut Frame<'_>, area: TuiRect, outline: &CountryOutline, title: &str) {
    let size = outline.viewport;
    let height = size.height();
    let canvas = Canvas::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([0.0, size.width()])
        .y_bounds([0.0, height])
        .paint(|ctx| draw_polygons(ctx, outline.shape.polygons(), height, Color::Red));
    f.render_widget(canvas, area);
}
