//! Śledzenie rozmiaru kontenera (widok szczegółów kraju).
//!
//! Host zgłasza rozmiary przez [`ResizeRegistry::notify`]; każdy zamontowany
//! kontener ma co najwyżej jedną aktywną [`Subscription`], zwalnianą dokładnie
//! raz przez `dispose()` albo przy `Drop`.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};
use thiserror::Error;
use tracing::debug;

/// Rozmiar w jednostkach niezależnych od urządzenia; nigdy ujemny.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Zerowa szerokość lub wysokość.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

fn clamp_dimension(value: f64) -> f64 {
    // NaN też ląduje na zerze
    if value > 0.0 { value } else { 0.0 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u32);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ViewportError {
    #[error("container {0:?} is already observed")]
    AlreadyObserved(ContainerId),
}

#[derive(Default)]
struct Observed {
    // ostatni zgłoszony, jeszcze nieodebrany rozmiar
    pending: Option<Viewport>,
}

/// Rejestr obserwacji rozmiaru; jednowątkowy, współdzielony przez klonowanie.
#[derive(Clone, Default)]
pub struct ResizeRegistry {
    inner: Rc<RefCell<HashMap<ContainerId, Observed>>>,
}

impl ResizeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, container: ContainerId) -> Result<Subscription, ViewportError> {
        let mut observed = self.inner.borrow_mut();
        if observed.contains_key(&container) {
            return Err(ViewportError::AlreadyObserved(container));
        }
        observed.insert(container, Observed::default());
        debug!(?container, "resize observation registered");
        Ok(Subscription {
            container,
            registry: Rc::downgrade(&self.inner),
            disposed: false,
        })
    }

    /// Zgłoszenie rozmiaru treści kontenera. Nieobserwowane kontenery są pomijane.
    pub fn notify(&self, container: ContainerId, width: f64, height: f64) {
        if let Some(entry) = self.inner.borrow_mut().get_mut(&container) {
            entry.pending = Some(Viewport::new(width, height));
        }
    }

    pub fn is_observed(&self, container: ContainerId) -> bool {
        self.inner.borrow().contains_key(&container)
    }

    /// Liczba aktywnych subskrypcji.
    pub fn active(&self) -> usize {
        self.inner.borrow().len()
    }
}

/// Aktywna obserwacja jednego kontenera.
pub struct Subscription {
    container: ContainerId,
    registry: Weak<RefCell<HashMap<ContainerId, Observed>>>,
    disposed: bool,
}

impl Subscription {
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Rozmiar zgłoszony od ostatniego odczytu.
    pub fn take(&self) -> Option<Viewport> {
        let registry = self.registry.upgrade()?;
        let mut observed = registry.borrow_mut();
        observed.get_mut(&self.container)?.pending.take()
    }

    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(&self.container);
            debug!(container = ?self.container, "resize observation disposed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Aktualny rozmiar kontenera, zaczyna od (0, 0).
#[derive(Default)]
pub struct ViewportTracker {
    viewport: Viewport,
    subscription: Option<Subscription>,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Montuje obserwację; ponowny montaż jest no-opem.
    pub fn mount(&mut self, registry: &ResizeRegistry, container: ContainerId) -> Result<(), ViewportError> {
        if self.subscription.is_none() {
            self.subscription = Some(registry.observe(container)?);
        }
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// `Some` tylko gdy rozmiar się zmienił.
    pub fn poll(&mut self) -> Option<Viewport> {
        let next = self.subscription.as_ref()?.take()?;
        if next == self.viewport {
            return None;
        }
        self.viewport = next;
        Some(next)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Zwalnia obserwację; następny montaż startuje znów od (0, 0).
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.dispose();
        }
        self.viewport = Viewport::default();
    }
}
