//! Dwa widoki korzystające ze wspólnego rdzenia: mapa świata i kształt kraju.
//!
//! Widok nie rzuca błędów dalej: każdy stan (ładowanie, porażka, brak kraju,
//! brak projekcji) jest jawną wartością do narysowania przez warstwę UI.

use geo::Geometry;
use geojson::{Feature, FeatureCollection};
use tracing::{debug, info, warn};

use crate::{
    interaction::{InteractionLayer, Region},
    iso::{Alpha2, IsoTable},
    locate::{feature_alpha2, feature_name, find_country},
    path,
    projection::{self, FitError, ProjectedShape, Projection, WORLD_HEIGHT, WORLD_WIDTH},
    resource::{ResourceError, ResourceState, TopologyCache, TopologyLoad, WORLD_TOPOLOGY_URL},
    topology::{Topology, TopologyError, decode_countries},
    viewport::{ContainerId, ResizeRegistry, Viewport, ViewportError, ViewportTracker},
};

pub const DEFAULT_TOPOLOGY_URL: &str = WORLD_TOPOLOGY_URL;

/// Stałe płótno mapy świata.
pub fn world_canvas() -> Viewport {
    Viewport::new(WORLD_WIDTH, WORLD_HEIGHT)
}

/// Komunikat dla użytkownika; brak obiektu traktujemy jak zły dokument.
pub fn resource_message(error: &ResourceError) -> String {
    match error {
        ResourceError::Unavailable { .. } => "Failed to load map data".to_string(),
        ResourceError::InvalidDocument(e) => topology_message(e),
    }
}

pub fn topology_message(error: &TopologyError) -> String {
    match error {
        TopologyError::InvalidDocument(_) | TopologyError::NoGeometryObject => {
            "Invalid topology file".to_string()
        }
        TopologyError::DecodeMismatch(_) | TopologyError::MalformedObject { .. } => {
            "No shape available".to_string()
        }
    }
}

/// Mapa świata: wspólna projekcja i interaktywne regiony.
pub struct WorldMap {
    canvas: Viewport,
    projection: Projection,
    layer: InteractionLayer,
}

impl WorldMap {
    /// Regiony tylko dla cech z rozwiązanym kodem i geometrią; reszta jest
    /// pomijana bez błędu, ale bierze udział w dopasowaniu projekcji.
    pub fn build(collection: &FeatureCollection, table: &IsoTable, canvas: Viewport) -> Result<Self, FitError> {
        let projection = projection::fit_world(canvas, &collection.features)?;

        let mut skipped = 0usize;
        let regions: Vec<Region> = collection
            .features
            .iter()
            .filter_map(|feature| {
                let region = region_for(feature, table, &projection);
                if region.is_none() {
                    skipped += 1;
                }
                region
            })
            .collect();

        info!(regions = regions.len(), skipped, "world map built");
        Ok(Self {
            canvas,
            projection,
            layer: InteractionLayer::new(regions),
        })
    }

    pub fn canvas(&self) -> Viewport {
        self.canvas
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn regions(&self) -> &[Region] {
        self.layer.regions()
    }

    pub fn layer(&self) -> &InteractionLayer {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut InteractionLayer {
        &mut self.layer
    }
}

fn region_for(feature: &Feature, table: &IsoTable, projection: &Projection) -> Option<Region> {
    let code = feature_alpha2(feature, table)?;
    let geometry = projection::feature_geometry(feature)?;
    let shape = ProjectedShape::new(&geometry, projection);
    Some(Region {
        code,
        name: feature_name(feature).unwrap_or(code.as_str()).to_string(),
        path: shape.path(),
        shape,
    })
}

pub enum WorldMapState<'a> {
    Loading,
    Failed(&'a str),
    Ready(&'a WorldMap),
}

enum WorldOutcome {
    Loading,
    Failed(String),
    Ready(WorldMap),
}

/// Widok mapy świata związany z jednym ładowaniem topologii.
pub struct WorldMapView {
    url: String,
    canvas: Viewport,
    load: Option<TopologyLoad>,
    outcome: WorldOutcome,
}

impl WorldMapView {
    pub fn new(url: &str) -> Self {
        Self::with_canvas(url, world_canvas())
    }

    pub fn with_canvas(url: &str, canvas: Viewport) -> Self {
        Self {
            url: url.to_string(),
            canvas,
            load: None,
            outcome: WorldOutcome::Loading,
        }
    }

    /// Zaczyna ładowanie; ponowny montaż po porażce ponawia próbę.
    pub fn mount(&mut self, cache: &TopologyCache) {
        if self.load.is_some() || matches!(self.outcome, WorldOutcome::Ready(_)) {
            return;
        }
        self.outcome = WorldOutcome::Loading;
        self.load = Some(cache.request(&self.url));
    }

    /// Odbiera wynik ładowania; zwraca `true`, gdy stan się zmienił.
    pub fn update(&mut self, cache: &mut TopologyCache, table: &IsoTable) -> bool {
        let Some(load) = self.load.as_mut() else {
            return false;
        };
        self.outcome = match load.poll(cache) {
            ResourceState::Pending => return false,
            ResourceState::Failed(error) => WorldOutcome::Failed(resource_message(&error)),
            ResourceState::Ready(topology) => build_world(&topology, table, self.canvas),
        };
        self.load = None;
        true
    }

    pub fn state(&self) -> WorldMapState<'_> {
        match &self.outcome {
            WorldOutcome::Loading => WorldMapState::Loading,
            WorldOutcome::Failed(message) => WorldMapState::Failed(message),
            WorldOutcome::Ready(map) => WorldMapState::Ready(map),
        }
    }

    pub fn map_mut(&mut self) -> Option<&mut WorldMap> {
        match &mut self.outcome {
            WorldOutcome::Ready(map) => Some(map),
            _ => None,
        }
    }

    /// Porzuca trwające ładowanie.
    pub fn unmount(&mut self) {
        if self.load.take().is_some() {
            debug!(url = %self.url, "world map unmounted while loading");
        }
    }
}

fn build_world(topology: &Topology, table: &IsoTable, canvas: Viewport) -> WorldOutcome {
    let collection = match decode_countries(topology) {
        Ok(collection) => collection,
        Err(e) => {
            warn!(error = %e, "world topology cannot be decoded");
            return WorldOutcome::Failed(topology_message(&e));
        }
    };
    match WorldMap::build(&collection, table, canvas) {
        Ok(map) => WorldOutcome::Ready(map),
        Err(e) => {
            warn!(error = %e, "world projection cannot be fitted");
            WorldOutcome::Failed("No projection available".to_string())
        }
    }
}

/// Kontur jednego kraju dopasowany do rozmiaru.
#[derive(Clone, Debug)]
pub struct CountryOutline {
    pub code: Alpha2,
    pub name: Option<String>,
    pub viewport: Viewport,
    pub projection: Projection,
    pub path: String,
    pub shape: ProjectedShape,
}

impl CountryOutline {
    pub fn fit(code: Alpha2, feature: &Feature, target: Viewport) -> Result<Self, FitError> {
        let geometry = projection::feature_geometry(feature).ok_or(FitError::EmptyGeometry)?;
        Self::fit_geometry(code, feature_name(feature).map(str::to_string), &geometry, target)
    }

    fn fit_geometry(
        code: Alpha2,
        name: Option<String>,
        geometry: &Geometry<f64>,
        target: Viewport,
    ) -> Result<Self, FitError> {
        let projection = Projection::fit_size(target, std::slice::from_ref(geometry))?;
        let shape = ProjectedShape::new(geometry, &projection);
        Ok(Self {
            code,
            name,
            viewport: target,
            projection,
            path: path::geometry_path(shape.geometry()),
            shape,
        })
    }
}

#[derive(Debug)]
pub enum ShapeState<'a> {
    Loading,
    Failed(&'a str),
    NotFound(Alpha2),
    /// Brak projekcji (np. zerowy rozmiar); mija samo po zmianie rozmiaru.
    Unavailable,
    Ready(&'a CountryOutline),
}

enum Located {
    Pending,
    Failed(String),
    NotFound,
    Found {
        name: Option<String>,
        geometry: Option<Geometry<f64>>,
    },
}

/// Kształt kraju dopasowany do kontenera, przeliczany przy każdej zmianie rozmiaru.
pub struct CountryShapeView {
    code: Alpha2,
    url: String,
    load: Option<TopologyLoad>,
    tracker: ViewportTracker,
    located: Located,
    outline: Option<CountryOutline>,
}

impl CountryShapeView {
    pub fn new(code: Alpha2, url: &str) -> Self {
        Self {
            code,
            url: url.to_string(),
            load: None,
            tracker: ViewportTracker::new(),
            located: Located::Pending,
            outline: None,
        }
    }

    pub fn code(&self) -> Alpha2 {
        self.code
    }

    pub fn viewport(&self) -> Viewport {
        self.tracker.viewport()
    }

    pub fn mount(
        &mut self,
        cache: &TopologyCache,
        registry: &ResizeRegistry,
        container: ContainerId,
    ) -> Result<(), ViewportError> {
        self.tracker.mount(registry, container)?;
        if self.load.is_none() && matches!(self.located, Located::Pending | Located::Failed(_)) {
            self.located = Located::Pending;
            self.load = Some(cache.request(&self.url));
        }
        Ok(())
    }

    /// Odbiera ładowanie i zmiany rozmiaru; `true`, gdy stan się zmienił.
    pub fn update(&mut self, cache: &mut TopologyCache, table: &IsoTable) -> bool {
        let mut changed = false;

        if let Some(load) = self.load.as_mut() {
            match load.poll(cache) {
                ResourceState::Pending => {}
                ResourceState::Failed(error) => {
                    self.located = Located::Failed(resource_message(&error));
                    self.load = None;
                    changed = true;
                }
                ResourceState::Ready(topology) => {
                    self.located = locate(&topology, self.code, table);
                    self.load = None;
                    changed = true;
                }
            }
        }

        let resized = self.tracker.poll().is_some();
        if changed || resized {
            self.refit();
            changed = true;
        }
        changed
    }

    fn refit(&mut self) {
        let target = self.tracker.viewport();
        self.outline = match &self.located {
            Located::Found {
                name,
                geometry: Some(geometry),
            } => match CountryOutline::fit_geometry(self.code, name.clone(), geometry, target) {
                Ok(outline) => Some(outline),
                Err(e) => {
                    debug!(code = %self.code, error = %e, "no projection for current size");
                    None
                }
            },
            _ => None,
        };
    }

    pub fn state(&self) -> ShapeState<'_> {
        match (&self.located, &self.outline) {
            (Located::Pending, _) => ShapeState::Loading,
            (Located::Failed(message), _) => ShapeState::Failed(message),
            (Located::NotFound, _) => ShapeState::NotFound(self.code),
            (Located::Found { .. }, Some(outline)) => ShapeState::Ready(outline),
            (Located::Found { .. }, None) => ShapeState::Unavailable,
        }
    }

    /// Porzuca ładowanie i zwalnia obserwację rozmiaru.
    pub fn unmount(&mut self) {
        if self.load.take().is_some() {
            debug!(code = %self.code, "country view unmounted while loading");
        }
        self.tracker.unmount();
    }
}

fn locate(topology: &Topology, code: Alpha2, table: &IsoTable) -> Located {
    let collection = match decode_countries(topology) {
        Ok(collection) => collection,
        Err(e) => {
            warn!(%code, error = %e, "country topology cannot be decoded");
            return Located::Failed(topology_message(&e));
        }
    };
    match find_country(&collection, code, table) {
        Some(feature) => Located::Found {
            name: feature_name(feature).map(str::to_string),
            geometry: projection::feature_geometry(feature),
        },
        None => {
            info!(%code, "no shape for requested code");
            Located::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Fetch;
    use std::{
        sync::{Arc, Mutex, mpsc},
        thread,
        time::{Duration, Instant},
    };

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": "250", "properties": { "name": "France" }, "arcs": [[0]] },
                    { "type": "Polygon", "id": "276", "properties": { "name": "Germany" }, "arcs": [[1]] },
                    { "type": "Polygon", "id": "-99", "properties": { "name": "Nowhere" }, "arcs": [[2]] }
                ]
            }
        },
        "arcs": [
            [[0, 43], [8, 43], [8, 50], [0, 50], [0, 43]],
            [[6, 47], [15, 47], [15, 55], [6, 55], [6, 47]],
            [[20, 20], [21, 20], [21, 21], [20, 20]]
        ]
    }"#;

    struct Fixed(&'static str);

    impl Fetch for Fixed {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, ResourceError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    /// Oddaje dokument dopiero po otwarciu bramki.
    struct Gated(Mutex<mpsc::Receiver<()>>);

    impl Fetch for Gated {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, ResourceError> {
            let _ = self.0.lock().unwrap().recv();
            Ok(TOPOLOGY.as_bytes().to_vec())
        }
    }

    fn cache(body: &'static str) -> TopologyCache {
        TopologyCache::new(Arc::new(Fixed(body)))
    }

    fn settle(mut step: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !step() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn world_map_skips_unresolved_regions() {
        let mut cache = cache(TOPOLOGY);
        let mut view = WorldMapView::new(DEFAULT_TOPOLOGY_URL);
        assert!(matches!(view.state(), WorldMapState::Loading));

        view.mount(&cache);
        settle(|| view.update(&mut cache, IsoTable::builtin()));

        let WorldMapState::Ready(map) = view.state() else {
            panic!("world map not ready");
        };
        let codes: Vec<_> = map.regions().iter().map(|r| r.code.as_str().to_string()).collect();
        assert_eq!(codes, ["FR", "DE"]);
        assert!(map.regions().iter().all(|r| r.path.starts_with('M')));
    }

    #[test]
    fn invalid_document_is_reported_as_failure() {
        let mut cache = cache(r#"{"type":"Topology","objects":{}}"#);
        let mut view = WorldMapView::new(DEFAULT_TOPOLOGY_URL);
        view.mount(&cache);
        settle(|| view.update(&mut cache, IsoTable::builtin()));
        assert!(matches!(view.state(), WorldMapState::Failed("Invalid topology file")));
    }

    #[test]
    fn country_view_waits_for_size_and_refits_on_resize() {
        let mut cache = cache(TOPOLOGY);
        let registry = ResizeRegistry::new();
        let panel = ContainerId(7);
        let mut view = CountryShapeView::new("DE".parse().unwrap(), DEFAULT_TOPOLOGY_URL);

        view.mount(&cache, &registry, panel).unwrap();
        settle(|| {
            view.update(&mut cache, IsoTable::builtin());
            !matches!(view.state(), ShapeState::Loading)
        });
        // rozmiar jeszcze nie zmierzony
        assert!(matches!(view.state(), ShapeState::Unavailable));

        registry.notify(panel, 300.0, 200.0);
        assert!(view.update(&mut cache, IsoTable::builtin()));
        let small = match view.state() {
            ShapeState::Ready(outline) => outline.path.clone(),
            other => panic!("unexpected state {other:?}"),
        };

        registry.notify(panel, 600.0, 400.0);
        assert!(view.update(&mut cache, IsoTable::builtin()));
        let ShapeState::Ready(large) = view.state() else {
            panic!("outline missing after resize");
        };
        assert_ne!(small, large.path);
        assert_eq!(large.name.as_deref(), Some("Germany"));

        registry.notify(panel, 600.0, 400.0);
        assert!(!view.update(&mut cache, IsoTable::builtin()));

        view.unmount();
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn unknown_code_is_not_found() {
        let mut cache = cache(TOPOLOGY);
        let registry = ResizeRegistry::new();
        let code: Alpha2 = "ZZ".parse().unwrap();
        let mut view = CountryShapeView::new(code, DEFAULT_TOPOLOGY_URL);
        view.mount(&cache, &registry, ContainerId(1)).unwrap();
        registry.notify(ContainerId(1), 640.0, 360.0);
        settle(|| {
            view.update(&mut cache, IsoTable::builtin());
            !matches!(view.state(), ShapeState::Loading)
        });
        assert!(matches!(view.state(), ShapeState::NotFound(c) if c == code));
    }

    #[test]
    fn unmounting_while_loading_discards_the_result() {
        let (open, gate) = mpsc::channel();
        let mut cache = TopologyCache::new(Arc::new(Gated(Mutex::new(gate))));
        let registry = ResizeRegistry::new();
        let panel = ContainerId(3);
        let mut view = CountryShapeView::new("FR".parse().unwrap(), DEFAULT_TOPOLOGY_URL);

        view.mount(&cache, &registry, panel).unwrap();
        registry.notify(panel, 320.0, 240.0);
        assert!(view.update(&mut cache, IsoTable::builtin()));
        assert!(matches!(view.state(), ShapeState::Loading));

        view.unmount();
        open.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(!view.update(&mut cache, IsoTable::builtin()));
        assert!(cache.is_empty());
        assert!(matches!(view.state(), ShapeState::Loading));
        assert_eq!(registry.active(), 0);
        // kolejny montaż zaczyna od zerowego rozmiaru
        assert_eq!(view.viewport(), Viewport::default());
    }
}
