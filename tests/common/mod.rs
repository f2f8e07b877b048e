//! Wspólne dane testowe: topologia z trzema krajami.

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use country_atlas::resource::{Fetch, ResourceError, TopologyCache};

/// FR "250", DE "276", US 840 (liczbowo, dwa wielokąty), poprzedzone warstwą `land`.
pub const THREE_COUNTRIES: &str = r#"{
    "type": "Topology",
    "objects": {
        "land": {
            "type": "GeometryCollection",
            "geometries": [{ "type": "Polygon", "arcs": [[4]] }]
        },
        "countries": {
            "type": "GeometryCollection",
            "geometries": [
                { "type": "Polygon", "id": "250", "properties": { "name": "France" }, "arcs": [[0]] },
                { "type": "Polygon", "id": "276", "properties": { "name": "Germany" }, "arcs": [[1]] },
                { "type": "MultiPolygon", "id": 840, "properties": { "name": "United States of America" }, "arcs": [[[2]], [[3]]] }
            ]
        }
    },
    "arcs": [
        [[0, 43], [8, 43], [8, 50], [0, 50], [0, 43]],
        [[6, 47], [15, 47], [15, 55], [6, 55], [6, 47]],
        [[-125, 25], [-67, 25], [-67, 49], [-125, 49], [-125, 25]],
        [[-170, 55], [-140, 55], [-140, 70], [-170, 70], [-170, 55]],
        [[-180, -60], [180, -60], [180, 80], [-180, 80], [-180, -60]]
    ]
}"#;

/// Zwraca zawsze te same bajty.
pub struct StaticFetcher(pub &'static str);

impl Fetch for StaticFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, ResourceError> {
        Ok(self.0.as_bytes().to_vec())
    }
}

/// Symuluje błąd sieci.
/// Jak [`StaticFetcher`], ale wolny i liczy pobrania.
pub struct CountingFetcher {
    body: &'static str,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for CountingFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, ResourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Ok(self.body.as_bytes().to_vec())
    }
}

pub struct FailingFetcher;

impl Fetch for FailingFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        Err(ResourceError::Unavailable {
            url: url.to_string(),
            reason: "HTTP 503".to_string(),
        })
    }
}

pub fn cache_with(body: &'static str) -> TopologyCache {
    TopologyCache::new(Arc::new(StaticFetcher(body)))
}

/// Powtarza `step`, aż zwróci true (najwyżej 5 s).
pub fn settle(mut step: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !step() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

/// Zakres współrzędnych odczytany z komend ścieżki `M x,y L x,y ... Z`.
pub fn path_extent(d: &str) -> Option<(f64, f64, f64, f64)> {
    let mut extent: Option<(f64, f64, f64, f64)> = None;
    for token in d.split(['M', 'L', 'Z']).filter(|t| !t.is_empty()) {
        let (x, y) = token.split_once(',')?;
        let (x, y): (f64, f64) = (x.parse().ok()?, y.parse().ok()?);
        extent = Some(match extent {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    extent
}
