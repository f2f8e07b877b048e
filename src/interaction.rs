//! Warstwa interakcji mapy świata: najechanie, fokus i aktywacja regionów.

use tracing::{debug, info};

use crate::{iso::Alpha2, projection::ProjectedShape};

/// Stan najechania.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HoverState {
    #[default]
    Idle,
    Hovered(Alpha2),
}

impl HoverState {
    pub fn code(&self) -> Option<Alpha2> {
        match self {
            Self::Idle => None,
            Self::Hovered(code) => Some(*code),
        }
    }
}

/// Żądanie przejścia do strony kraju.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationRequest {
    pub code: Alpha2,
}

impl NavigationRequest {
    pub fn route(&self) -> String {
        self.code.route()
    }
}

/// Zewnętrzny router; warstwa tylko zgłasza żądania.
pub trait Navigator {
    fn navigate(&mut self, request: NavigationRequest);
}

impl Navigator for Vec<NavigationRequest> {
    fn navigate(&mut self, request: NavigationRequest) {
        self.push(request);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionEvent {
    PointerEnter(usize),
    PointerLeave(usize),
    FocusEnter(usize),
    FocusLeave(usize),
    Click(usize),
    KeyDown(usize, Key),
}

/// Interaktywny region: tylko kraje z rozwiązanym kodem.
#[derive(Clone, Debug)]
pub struct Region {
    pub code: Alpha2,
    pub name: String,
    pub path: String,
    pub shape: ProjectedShape,
}

pub struct InteractionLayer {
    regions: Vec<Region>,
    hover: HoverState,
    pointer: Option<usize>,
    focus: Option<usize>,
}

impl InteractionLayer {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            regions,
            hover: HoverState::Idle,
            pointer: None,
            focus: None,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn focused(&self) -> Option<&Region> {
        self.focus.and_then(|i| self.regions.get(i))
    }

    /// Pierwszy region (w kolejności rysowania) zawierający punkt.
    pub fn region_at(&self, x: f64, y: f64) -> Option<usize> {
        self.regions.iter().position(|r| r.shape.contains(x, y))
    }

    pub fn handle(&mut self, event: RegionEvent, navigator: &mut dyn Navigator) {
        let index = event.region();
        let Some(region) = self.regions.get(index) else {
            debug!(?event, "event for unknown region ignored");
            return;
        };
        let code = region.code;

        match event {
            RegionEvent::PointerEnter(_) | RegionEvent::FocusEnter(_) => {
                self.hover = HoverState::Hovered(code);
            }
            RegionEvent::PointerLeave(_) | RegionEvent::FocusLeave(_) => {
                self.hover = HoverState::Idle;
            }
            RegionEvent::Click(_) | RegionEvent::KeyDown(_, Key::Enter) => {
                info!(%code, "navigating to country page");
                navigator.navigate(NavigationRequest { code });
            }
            RegionEvent::KeyDown(_, Key::Other) => {}
        }
    }

    /// Ruch wskaźnika w pikselach płótna: generuje leave/enter.
    pub fn pointer_move(&mut self, x: f64, y: f64, navigator: &mut dyn Navigator) {
        let next = self.region_at(x, y);
        if next == self.pointer {
            return;
        }
        if let Some(previous) = self.pointer.take() {
            self.handle(RegionEvent::PointerLeave(previous), navigator);
        }
        if let Some(index) = next {
            self.pointer = Some(index);
            self.handle(RegionEvent::PointerEnter(index), navigator);
        }
    }

    /// Wskaźnik opuścił mapę.
    pub fn pointer_exit(&mut self, navigator: &mut dyn Navigator) {
        if let Some(previous) = self.pointer.take() {
            self.handle(RegionEvent::PointerLeave(previous), navigator);
        }
    }

    pub fn click(&mut self, x: f64, y: f64, navigator: &mut dyn Navigator) {
        if let Some(index) = self.region_at(x, y) {
            self.handle(RegionEvent::Click(index), navigator);
        }
    }

    pub fn focus_next(&mut self, navigator: &mut dyn Navigator) {
        let count = self.regions.len();
        if count == 0 {
            return;
        }
        let next = self.focus.map_or(0, |i| (i + 1) % count);
        self.move_focus(next, navigator);
    }

    pub fn focus_prev(&mut self, navigator: &mut dyn Navigator) {
        let count = self.regions.len();
        if count == 0 {
            return;
        }
        let prev = self.focus.map_or(count - 1, |i| (i + count - 1) % count);
        self.move_focus(prev, navigator);
    }

    pub fn press_key(&mut self, key: Key, navigator: &mut dyn Navigator) {
        if let Some(index) = self.focus {
            self.handle(RegionEvent::KeyDown(index, key), navigator);
        }
    }

    pub fn activate_focused(&mut self, navigator: &mut dyn Navigator) {
        self.press_key(Key::Enter, navigator);
    }

    fn move_focus(&mut self, index: usize, navigator: &mut dyn Navigator) {
        if let Some(previous) = self.focus.take() {
            self.handle(RegionEvent::FocusLeave(previous), navigator);
        }
        self.focus = Some(index);
        self.handle(RegionEvent::FocusEnter(index), navigator);
    }
}

impl RegionEvent {
    pub fn region(&self) -> usize {
        match *self {
            Self::PointerEnter(i)
            | Self::PointerLeave(i)
            | Self::FocusEnter(i)
            | Self::FocusLeave(i)
            | Self::Click(i)
            | Self::KeyDown(i, _) => i,
        }
    }
}
