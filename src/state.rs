use std::{path::Path, sync::Arc};

use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{info, warn};

use country_atlas::{
    data::{CountryCatalog, CountryInfo},
    interaction::{HoverState, NavigationRequest},
    iso::{Alpha2, IsoTable},
    resource::{FsFetcher, TopologyCache},
    viewport::{ContainerId, ResizeRegistry, Viewport},
    views::{CountryShapeView, WorldMapState, WorldMapView},
};

/// Kontener panelu z konturem kraju.
pub const COUNTRY_PANEL: ContainerId = ContainerId(1);

pub struct CountryPage {
    pub view: CountryShapeView,
    pub info: Option<CountryInfo>,
}

pub enum Screen {
    WorldMap,
    Country(CountryPage),
    /// Kod spoza formatu alpha-2.
    NotFound(String),
}

pub struct AppState {
    pub cache: TopologyCache,
    pub table: IsoTable,
    pub catalog: CountryCatalog,
    pub registry: ResizeRegistry,
    pub topology_url: String,
    pub world: WorldMapView,
    pub screen: Screen,
    /// Obszar płótna mapy świata z ostatniej klatki, do mapowania myszy.
    pub map_area: Option<Rect>,
    requests: Vec<NavigationRequest>,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
Mysz: najechanie / klik otwiera kraj
Tab / Shift+Tab: fokus na kolejnym kraju
Enter: otwórz kraj z fokusem
Esc / Backspace: wstecz
q: wyjście";

    pub fn new(data_dir: &Path, topology_url: &str, table: IsoTable) -> Self {
        let cache = TopologyCache::new(Arc::new(FsFetcher::new(data_dir)));
        let mut world = WorldMapView::new(topology_url);
        world.mount(&cache);

        Self {
            cache,
            table,
            catalog: CountryCatalog::load(data_dir),
            registry: ResizeRegistry::new(),
            topology_url: topology_url.to_string(),
            world,
            screen: Screen::WorldMap,
            map_area: None,
            requests: Vec::new(),
        }
    }

    /// Odbiera wyniki ładowania i zmiany rozmiaru.
    pub fn tick(&mut self) {
        self.world.update(&mut self.cache, &self.table);
        if let Screen::Country(page) = &mut self.screen {
            page.view.update(&mut self.cache, &self.table);
        }
    }

    /// Zwraca true, jeśli trzeba wyjść
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        use KeyCode::*;
        match key {
            Char('q') => return true,
            Esc | Backspace => self.back(),
            Tab | BackTab | Enter => {
                if !matches!(self.screen, Screen::WorldMap) {
                    return false;
                }
                if let Some(map) = self.world.map_mut() {
                    let layer = map.layer_mut();
                    match key {
                        Tab => layer.focus_next(&mut self.requests),
                        BackTab => layer.focus_prev(&mut self.requests),
                        _ => layer.activate_focused(&mut self.requests),
                    }
                }
                self.follow_requests();
            }
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        if !matches!(self.screen, Screen::WorldMap) {
            return;
        }
        let Some(map) = self.world.map_mut() else {
            return;
        };
        let point = self
            .map_area
            .and_then(|area| canvas_point(area, event.column, event.row, map.canvas()));
        let layer = map.layer_mut();

        match (event.kind, point) {
            (MouseEventKind::Moved | MouseEventKind::Drag(_), Some((x, y))) => {
                layer.pointer_move(x, y, &mut self.requests)
            }
            (MouseEventKind::Moved | MouseEventKind::Drag(_), None) => layer.pointer_exit(&mut self.requests),
            (MouseEventKind::Down(MouseButton::Left), Some((x, y))) => layer.click(x, y, &mut self.requests),
            _ => {}
        }
        self.follow_requests();
    }

    fn follow_requests(&mut self) {
        // tylko ostatnie żądanie ma znaczenie
        if let Some(request) = self.requests.drain(..).last() {
            info!(route = %request.route(), "opening country page");
            self.open_country(request.code.as_str());
        }
    }

    /// Strona kraju dla surowego kodu, jak z adresu `/country/{code}`.
    pub fn open_country(&mut self, raw: &str) {
        self.leave_screen();
        self.screen = match raw.parse::<Alpha2>() {
            Ok(code) => {
                let mut view = CountryShapeView::new(code, &self.topology_url);
                if let Err(e) = view.mount(&self.cache, &self.registry, COUNTRY_PANEL) {
                    warn!(%code, error = %e, "country panel already observed");
                }
                Screen::Country(CountryPage {
                    view,
                    info: self.catalog.get(code).cloned(),
                })
            }
            Err(e) => {
                warn!(error = %e, "country page requested with invalid code");
                Screen::NotFound(raw.to_string())
            }
        };
    }

    pub fn back(&mut self) {
        if !matches!(self.screen, Screen::WorldMap) {
            self.leave_screen();
            self.screen = Screen::WorldMap;
            self.world.mount(&self.cache);
        }
    }

    fn leave_screen(&mut self) {
        if let Screen::Country(page) = &mut self.screen {
            page.view.unmount();
        }
    }

    /// Rozmiar panelu konturu w punktach braille'a (2×4 na komórkę).
    pub fn report_country_panel(&self, area: Rect) {
        let size = braille_viewport(area);
        self.registry.notify(COUNTRY_PANEL, size.width(), size.height());
    }

    pub fn status_line(&self) -> String {
        let hover = match (&self.screen, self.world.state()) {
            (Screen::WorldMap, WorldMapState::Ready(map)) => map.layer().hover(),
            _ => HoverState::Idle,
        };
        match hover {
            HoverState::Hovered(code) => format!("Selected: {code}"),
            HoverState::Idle => "Hover a country".to_string(),
        }
    }
}

pub fn braille_viewport(area: Rect) -> Viewport {
    Viewport::new(f64::from(area.width) * 2.0, f64::from(area.height) * 4.0)
}

/// Komórka terminala → współrzędne płótna (y w dół, jak w ścieżkach).
pub fn canvas_point(area: Rect, column: u16, row: u16, canvas: Viewport) -> Option<(f64, f64)> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    if column < area.x || row < area.y || column >= area.x + area.width || row >= area.y + area.height {
        return None;
    }
    let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
    let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
    Some((fx * canvas.width(), fy * canvas.height()))
}
