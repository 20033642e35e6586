use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
};

use shared::{domain::PageSlug, protocol::CartSnapshot};
use tracing::{debug, info};

use crate::{
    completion::CompletionHandle,
    error::Result,
    forms::BoundForm,
    session::CheckoutSession,
    transport::CheckoutTransport,
    update::{UpdateReport, UpdateSession},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Enabled,
    Disabled,
}

#[derive(Clone)]
pub struct BookletController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    updates: UpdateSession,
    location: RwLock<Option<PageSlug>>,
    buttons: Mutex<HashSet<u64>>,
    next_button_id: AtomicU64,
}

impl BookletController {
    pub fn new(session: Arc<CheckoutSession>, transport: Arc<dyn CheckoutTransport>) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                updates: UpdateSession::new(session, transport),
                location: RwLock::new(None),
                buttons: Mutex::new(HashSet::new()),
                next_button_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn session(&self) -> &Arc<CheckoutSession> {
        self.inner.updates.session()
    }

    pub fn updates(&self) -> &UpdateSession {
        &self.inner.updates
    }

    pub fn register_page(&self, slug: impl Into<PageSlug>) {
        self.session().register_page(slug);
    }

    pub fn observe(&self, slug: impl Into<PageSlug>, form: Arc<dyn BoundForm>) {
        self.session().observe(slug, form);
    }

    pub fn can_activate(&self, slug: &PageSlug) -> bool {
        let session = self.session();
        let forms = session.forms();
        let pages = session.pages();
        pages.is_reachable(slug, &forms)
    }

    pub fn default_slug(&self) -> Option<PageSlug> {
        let session = self.session();
        let forms = session.forms();
        let pages = session.pages();
        pages.default_slug(&forms).cloned()
    }

    pub fn is_default(&self, slug: &PageSlug) -> bool {
        let session = self.session();
        let forms = session.forms();
        let pages = session.pages();
        pages.is_default(slug, &forms)
    }

    pub fn can_advance(&self, slug: &PageSlug) -> bool {
        self.session().forms().is_page_valid(slug)
    }

    pub fn button_state(&self, slug: &PageSlug) -> ButtonState {
        if self.can_activate(slug) {
            ButtonState::Enabled
        } else {
            ButtonState::Disabled
        }
    }

    pub fn location(&self) -> Option<PageSlug> {
        self.inner
            .location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A page is shown when it is the navigation target, or when there is no target and it
    /// is the default page.
    pub fn is_displayed(&self, slug: &PageSlug) -> bool {
        match self.location() {
            Some(target) => &target == slug,
            None => self.is_default(slug),
        }
    }

    pub fn go_to(&self, slug: &PageSlug) -> bool {
        if !self.can_activate(slug) {
            debug!(%slug, "booklet page not reachable yet");
            return false;
        }
        self.set_location(slug.clone());
        true
    }

    pub async fn next_page(&self, slug: &PageSlug) -> Result<UpdateReport> {
        self.set_location(slug.clone());
        self.update(None).await
    }

    pub async fn update(&self, handle: Option<&CompletionHandle>) -> Result<UpdateReport> {
        let payload = self.session().payload();
        self.inner.updates.push(payload, handle).await
    }

    pub fn bind_button(&self) -> ButtonBinding {
        let id = self.inner.next_button_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .buttons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        ButtonBinding {
            id,
            controller: self.clone(),
        }
    }

    pub fn bound_buttons(&self) -> usize {
        self.inner
            .buttons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn cart(&self) -> Option<CartSnapshot> {
        self.session().cart()
    }

    pub fn is_loading(&self) -> bool {
        self.session().is_loading()
    }

    fn set_location(&self, slug: PageSlug) {
        info!(%slug, "booklet navigation");
        *self
            .inner
            .location
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(slug);
    }
}

pub struct ButtonBinding {
    id: u64,
    controller: BookletController,
}

impl ButtonBinding {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Transport failures are logged by the update session and surface as a rejected handle.
    pub async fn press(&self) -> CompletionHandle {
        let handle = CompletionHandle::new();
        let _ = self.controller.update(Some(&handle)).await;
        handle
    }
}

impl Drop for ButtonBinding {
    fn drop(&mut self) {
        self.controller
            .inner
            .buttons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
#[path = "tests/booklet_tests.rs"]
mod tests;
