use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, PoisonError, RwLock, RwLockReadGuard,
};

use shared::{
    domain::PageSlug,
    protocol::{CartSnapshot, FormPayload},
};
use tracing::info;

use crate::{
    forms::{BoundForm, FormRegistry},
    pages::PageSequencer,
};

#[derive(Default)]
pub struct CheckoutSession {
    forms: RwLock<FormRegistry>,
    pages: RwLock<PageSequencer>,
    cart: RwLock<Option<CartSnapshot>>,
    in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl CheckoutSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register_page(&self, slug: impl Into<PageSlug>) {
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_slug(slug.into());
    }

    pub fn observe(&self, slug: impl Into<PageSlug>, form: Arc<dyn BoundForm>) {
        self.forms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(&slug.into(), form);
    }

    pub fn forms(&self) -> RwLockReadGuard<'_, FormRegistry> {
        self.forms.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pages(&self) -> RwLockReadGuard<'_, PageSequencer> {
        self.pages.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn payload(&self) -> FormPayload {
        self.forms().payload()
    }

    pub fn cart(&self) -> Option<CartSnapshot> {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_cart(&self, cart: CartSnapshot) {
        *self.cart.write().unwrap_or_else(PoisonError::into_inner) = Some(cart);
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn begin_loading(&self) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        LoadingGuard { session: self }
    }

    /// Acquires the loading flag only if nothing else is in flight.
    pub fn try_begin_exclusive(&self) -> Option<LoadingGuard<'_>> {
        self.in_flight
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadingGuard { session: self })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("checkout session closed");
        }
    }
}

pub struct LoadingGuard<'a> {
    session: &'a CheckoutSession,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
