//! Pobieranie zasobu topologii: jedyna granica asynchroniczna.
//!
//! Ładowanie idzie w osobnym wątku; wynik odbiera `poll` w pętli zdarzeń.
//! Porzucony [`TopologyLoad`] (np. widok odmontowany) odrzuca wynik i nic
//! nie trafia do pamięci podręcznej. Żądania tego samego URL złożone przed
//! końcem ładowania dołączają do niego, więc zasób pobierany jest raz.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{self, Receiver, Sender, TryRecvError},
    },
    thread,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::topology::{Topology, TopologyError};

/// Stała, dobrze znana ścieżka zasobu.
pub const WORLD_TOPOLOGY_URL: &str = "/world-110m.json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("failed loading {url}: {reason}")]
    Unavailable { url: String, reason: String },
    #[error("Invalid topology file: {0}")]
    InvalidDocument(#[from] TopologyError),
}

/// Źródło bajtów zasobu.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Mapuje ścieżki URL na pliki w katalogu danych.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

impl Fetch for FsFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.resolve(url);
        fs::read(&path).map_err(|e| ResourceError::Unavailable {
            url: url.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

fn fetch_topology(fetcher: &dyn Fetch, url: &str) -> Result<Topology, ResourceError> {
    let bytes = fetcher.fetch(url)?;
    Ok(Topology::from_slice(&bytes)?)
}

/// Stan zasobu widziany przez widok.
#[derive(Clone, Debug)]
pub enum ResourceState {
    Pending,
    Ready(Arc<Topology>),
    Failed(ResourceError),
}

type LoadResult = Result<Arc<Topology>, ResourceError>;

/// Oczekujący na trwające ładowanie, wg URL.
type InFlight = Arc<Mutex<HashMap<String, Vec<Sender<LoadResult>>>>>;

/// Pamięć podręczna topologii wg URL; wpisy nigdy nie są unieważniane.
pub struct TopologyCache {
    fetcher: Arc<dyn Fetch>,
    entries: HashMap<String, Arc<Topology>>,
    in_flight: InFlight,
}

impl TopologyCache {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            entries: HashMap::new(),
            in_flight: Arc::default(),
        }
    }

    pub fn get(&self, url: &str) -> Option<Arc<Topology>> {
        self.entries.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Natychmiast gotowe przy trafieniu; trwające ładowanie tego URL jest
    /// współdzielone, inaczej startuje nowe w tle.
    pub fn request(&self, url: &str) -> TopologyLoad {
        if let Some(topology) = self.get(url) {
            debug!(url, "topology served from cache");
            return TopologyLoad {
                url: url.to_string(),
                state: LoadState::Done(ResourceState::Ready(topology)),
            };
        }

        let (tx, rx) = mpsc::channel();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(waiting) = in_flight.get_mut(url) {
            waiting.push(tx);
            debug!(url, waiting = waiting.len(), "joined topology load in flight");
            return TopologyLoad {
                url: url.to_string(),
                state: LoadState::Waiting(rx),
            };
        }
        in_flight.insert(url.to_string(), vec![tx]);

        let fetcher = Arc::clone(&self.fetcher);
        let shared = Arc::clone(&self.in_flight);
        let owned_url = url.to_string();
        let spawned = thread::Builder::new()
            .name("topology-load".to_string())
            .spawn(move || {
                let result = fetch_topology(fetcher.as_ref(), &owned_url).map(Arc::new);
                let waiting = shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&owned_url)
                    .unwrap_or_default();
                let delivered = waiting.into_iter().filter(|tx| tx.send(result.clone()).is_ok()).count();
                if delivered == 0 {
                    debug!(url = %owned_url, "topology load abandoned, result discarded");
                }
            });

        let state = match spawned {
            Ok(_) => {
                info!(url, "topology load started");
                LoadState::Waiting(rx)
            }
            Err(e) => {
                in_flight.remove(url);
                LoadState::Done(ResourceState::Failed(ResourceError::Unavailable {
                    url: url.to_string(),
                    reason: e.to_string(),
                }))
            }
        };
        TopologyLoad {
            url: url.to_string(),
            state,
        }
    }

    /// Ładowanie synchroniczne (eksport z linii poleceń).
    pub fn load_blocking(&mut self, url: &str) -> Result<Arc<Topology>, ResourceError> {
        if let Some(topology) = self.get(url) {
            return Ok(topology);
        }
        let topology = Arc::new(fetch_topology(self.fetcher.as_ref(), url)?);
        self.entries.insert(url.to_string(), Arc::clone(&topology));
        Ok(topology)
    }

    fn insert(&mut self, url: &str, topology: Arc<Topology>) {
        self.entries.entry(url.to_string()).or_insert(topology);
    }
}

enum LoadState {
    Waiting(Receiver<LoadResult>),
    Done(ResourceState),
}

/// Jedno ładowanie zasobu, związane z zamontowanym widokiem.
pub struct TopologyLoad {
    url: String,
    state: LoadState,
}

impl TopologyLoad {
    /// Nieblokujący odczyt stanu; po sukcesie wpisuje dokument do `cache`.
    /// Porażka jest ostateczna dla tego ładowania.
    pub fn poll(&mut self, cache: &mut TopologyCache) -> ResourceState {
        if let LoadState::Waiting(rx) = &self.state {
            let finished = match rx.try_recv() {
                Ok(Ok(topology)) => {
                    cache.insert(&self.url, Arc::clone(&topology));
                    info!(url = %self.url, arcs = topology.arc_count(), "topology loaded");
                    ResourceState::Ready(topology)
                }
                Ok(Err(error)) => {
                    warn!(url = %self.url, %error, "topology load failed");
                    ResourceState::Failed(error)
                }
                Err(TryRecvError::Empty) => return ResourceState::Pending,
                Err(TryRecvError::Disconnected) => ResourceState::Failed(ResourceError::Unavailable {
                    url: self.url.clone(),
                    reason: "loader stopped without a result".to_string(),
                }),
            };
            self.state = LoadState::Done(finished);
        }

        match &self.state {
            LoadState::Done(state) => state.clone(),
            LoadState::Waiting(_) => ResourceState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const VALID: &[u8] = br#"{"type":"Topology","objects":{"countries":{"type":"GeometryCollection","geometries":[]}},"arcs":[]}"#;

    /// Zwraca przygotowane odpowiedzi i liczy wywołania.
    struct StubFetcher {
        body: Result<Vec<u8>, ResourceError>,
        calls: Mutex<usize>,
    }

    impl StubFetcher {
        fn new(body: Result<Vec<u8>, ResourceError>) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl Fetch for StubFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, ResourceError> {
            *self.calls.lock().unwrap() += 1;
            self.body.clone()
        }
    }

    /// Blokuje do czasu zwolnienia bramki.
    struct GatedFetcher {
        gate: Mutex<mpsc::Receiver<()>>,
        calls: Mutex<usize>,
    }

    fn gated() -> (Sender<()>, Arc<GatedFetcher>) {
        let (open, gate) = mpsc::channel();
        let fetcher = Arc::new(GatedFetcher {
            gate: Mutex::new(gate),
            calls: Mutex::new(0),
        });
        (open, fetcher)
    }

    impl Fetch for GatedFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, ResourceError> {
            *self.calls.lock().unwrap() += 1;
            let _ = self.gate.lock().unwrap().recv();
            Ok(VALID.to_vec())
        }
    }

    fn wait(load: &mut TopologyLoad, cache: &mut TopologyCache) -> ResourceState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match load.poll(cache) {
                ResourceState::Pending if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(5));
                }
                state => return state,
            }
        }
    }

    #[test]
    fn successful_load_is_cached_and_reused() {
        let fetcher = StubFetcher::new(Ok(VALID.to_vec()));
        let mut cache = TopologyCache::new(fetcher.clone());

        let mut load = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(wait(&mut load, &mut cache), ResourceState::Ready(_)));
        assert_eq!(cache.len(), 1);

        let mut again = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(again.poll(&mut cache), ResourceState::Ready(_)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn invalid_document_fails_and_is_not_cached() {
        let fetcher = StubFetcher::new(Ok(br#"{"type":"FeatureCollection"}"#.to_vec()));
        let mut cache = TopologyCache::new(fetcher);
        let mut load = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(
            wait(&mut load, &mut cache),
            ResourceState::Failed(ResourceError::InvalidDocument(_))
        ));
        assert!(cache.is_empty());
        // porażka jest ostateczna
        assert!(matches!(load.poll(&mut cache), ResourceState::Failed(_)));
    }

    #[test]
    fn fetch_failure_is_unavailable() {
        let fetcher = StubFetcher::new(Err(ResourceError::Unavailable {
            url: WORLD_TOPOLOGY_URL.to_string(),
            reason: "HTTP 404".to_string(),
        }));
        let mut cache = TopologyCache::new(fetcher);
        let mut load = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(
            wait(&mut load, &mut cache),
            ResourceState::Failed(ResourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn pending_until_loader_finishes_and_abandoned_loads_are_discarded() {
        let (open, fetcher) = gated();
        let mut cache = TopologyCache::new(fetcher);

        let mut load = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(load.poll(&mut cache), ResourceState::Pending));

        drop(load);
        open.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_requests_for_one_url_share_a_single_fetch() {
        let (open, fetcher) = gated();
        let mut cache = TopologyCache::new(fetcher.clone());

        let mut first = cache.request(WORLD_TOPOLOGY_URL);
        let mut second = cache.request(WORLD_TOPOLOGY_URL);
        let abandoned = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(second.poll(&mut cache), ResourceState::Pending));
        drop(abandoned);

        open.send(()).unwrap();
        let (ResourceState::Ready(a), ResourceState::Ready(b)) = (wait(&mut first, &mut cache), wait(&mut second, &mut cache))
        else {
            panic!("both loads should finish");
        };
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*fetcher.calls.lock().unwrap(), 1);
        assert_eq!(cache.len(), 1);

        // po zakończeniu kolejne żądanie trafia w cache
        assert!(matches!(cache.request(WORLD_TOPOLOGY_URL).poll(&mut cache), ResourceState::Ready(_)));
        assert_eq!(*fetcher.calls.lock().unwrap(), 1);
    }

    #[test]
    fn failed_shared_load_is_retried_by_later_request() {
        let fetcher = StubFetcher::new(Ok(b"not json".to_vec()));
        let mut cache = TopologyCache::new(fetcher.clone());

        let mut first = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(wait(&mut first, &mut cache), ResourceState::Failed(_)));
        let mut retry = cache.request(WORLD_TOPOLOGY_URL);
        assert!(matches!(wait(&mut retry, &mut cache), ResourceState::Failed(_)));
        assert_eq!(fetcher.calls(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn fs_fetcher_maps_url_into_data_dir() {
        let fetcher = FsFetcher::new("data");
        assert_eq!(fetcher.resolve("/world-110m.json"), PathBuf::from("data/world-110m.json"));
        assert!(matches!(
            fetcher.fetch("/definitely-missing.json"),
            Err(ResourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn blocking_load_fills_cache() {
        let fetcher = StubFetcher::new(Ok(VALID.to_vec()));
        let mut cache = TopologyCache::new(fetcher.clone());
        assert!(cache.load_blocking(WORLD_TOPOLOGY_URL).is_ok());
        assert!(cache.load_blocking(WORLD_TOPOLOGY_URL).is_ok());
        assert_eq!(fetcher.calls(), 1);
        assert!(cache.get(WORLD_TOPOLOGY_URL).is_some());
    }
}
