use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use country_atlas::{
    data::{format_area, format_population},
    views::{ShapeState, WorldMapState},
};

use crate::{
    map_draw,
    state::{AppState, CountryPage, Screen},
};

pub fn draw(f: &mut Frame<'_>, state: &mut AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    if matches!(state.screen, Screen::WorldMap) {
        draw_world(f, rows[0], state);
    }
    match &state.screen {
        Screen::WorldMap => {}
        Screen::Country(page) => {
            let panel = draw_country(f, rows[0], page);
            state.report_country_panel(panel);
        }
        Screen::NotFound(raw) => {
            let txt = Paragraph::new(format!("Country not found: {raw}\n\nEsc / Backspace: wstecz"))
                .block(Block::default().borders(Borders::ALL).title("Kraj"))
                .wrap(Wrap { trim: true });
            f.render_widget(txt, rows[0]);
        }
    }

    let status = Paragraph::new(state.status_line()).style(Style::default().fg(Color::Yellow));
    f.render_widget(status, rows[1]);
}

fn draw_world(f: &mut Frame<'_>, area: Rect, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(80), Constraint::Percentage(20)])
        .split(area);

    let help = Paragraph::new(AppState::HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title("Pomoc"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, chunks[1]);

    state.map_area = match state.world.state() {
        WorldMapState::Ready(map) => {
            let layer = map.layer();
            let focused = layer.focused().map(|r| r.code);
            Some(map_draw::draw_world(f, chunks[0], map, layer.hover().code(), focused))
        }
        WorldMapState::Loading => {
            placeholder(f, chunks[0], "Loading map…");
            None
        }
        WorldMapState::Failed(message) => {
            placeholder(f, chunks[0], message);
            None
        }
    };
}

/// Zwraca wnętrze panelu konturu (jego rozmiar trafia do rejestru).
fn draw_country(f: &mut Frame<'_>, area: Rect, page: &CountryPage) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let code = page.view.code();
    let info_text = match &page.info {
        Some(ci) => {
            let mut lines = vec![ci.name.clone(), format!("Kod: {code}")];
            if let Some(region) = &ci.region {
                lines.push(format!("Region: {region}"));
            }
            if let Some(capital) = &ci.capital {
                lines.push(format!("Stolica: {capital}"));
            }
            if let Some(population) = ci.population {
                lines.push(format!("Ludność: {}", format_population(population)));
            }
            if let Some(area) = ci.area {
                lines.push(format!("Powierzchnia: {}", format_area(area)));
            }
            if let Some(currency) = &ci.currency {
                lines.push(format!("Waluta: {currency}"));
            }
            lines.join("\n")
        }
        None => format!("Kod: {code}\nBrak danych o kraju"),
    };
    let info = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Informacje"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, chunks[0]);

    let panel = Block::default().borders(Borders::ALL).inner(chunks[1]);
    match page.view.state() {
        ShapeState::Ready(outline) => {
            let title = outline.name.as_deref().unwrap_or(code.as_str());
            map_draw::draw_outline(f, chunks[1], outline, title);
        }
        ShapeState::Loading => placeholder(f, chunks[1], "Loading map…"),
        ShapeState::Failed(message) => placeholder(f, chunks[1], message),
        ShapeState::NotFound(code) => placeholder(f, chunks[1], &format!("No shape for code {code}")),
        ShapeState::Unavailable => placeholder(f, chunks[1], "Shape unavailable"),
    }
    panel
}

fn placeholder(f: &mut Frame<'_>, area: Rect, text: &str) {
    let txt = Paragraph::new(text.to_string())
        .block(Block::default().borders(Borders::ALL).title("Mapa"))
        .wrap(Wrap { trim: true });
    f.render_widget(txt, area);
}
