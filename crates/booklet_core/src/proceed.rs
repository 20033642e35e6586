use std::{convert::Infallible, fmt, str::FromStr, sync::Arc};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    booklet::{BookletController, ButtonBinding},
    completion::Settlement,
    host::{HostAction, HostEnvironment},
    session::CheckoutSession,
};

pub const RELOAD_PAGE: &str = "RELOAD_PAGE";
pub const PURCHASE_NOW: &str = "PURCHASE_NOW";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProceedAction {
    ReloadPage,
    PurchaseNow,
    Navigate(String),
}

impl From<&str> for ProceedAction {
    fn from(token: &str) -> Self {
        match token {
            RELOAD_PAGE => Self::ReloadPage,
            PURCHASE_NOW => Self::PurchaseNow,
            url => Self::Navigate(url.to_string()),
        }
    }
}

impl FromStr for ProceedAction {
    type Err = Infallible;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(token))
    }
}

impl fmt::Display for ProceedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReloadPage => f.write_str(RELOAD_PAGE),
            Self::PurchaseNow => f.write_str(PURCHASE_NOW),
            Self::Navigate(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceedState {
    Idle,
    Requested,
    Valid,
    Invalid,
    Purchasing,
    Reloading,
    Navigating,
    HandedOff,
}

impl ProceedState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Reloading | Self::Navigating | Self::HandedOff)
    }
}

/// Drives one proceed button: push the forms, and once they validate run the configured
/// action. Validation and transport failures fall back to `Idle`.
pub struct ProceedCoordinator {
    controller: BookletController,
    button: ButtonBinding,
    action: ProceedAction,
    host: Arc<dyn HostEnvironment>,
    state: watch::Sender<ProceedState>,
}

impl ProceedCoordinator {
    pub fn new(
        controller: BookletController,
        action: ProceedAction,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        let button = controller.bind_button();
        let (state, _rx) = watch::channel(ProceedState::Idle);
        Self {
            controller,
            button,
            action,
            host,
            state,
        }
    }

    pub fn action(&self) -> &ProceedAction {
        &self.action
    }

    pub fn state(&self) -> ProceedState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProceedState> {
        self.state.subscribe()
    }

    pub async fn proceed(&self) -> ProceedState {
        let session = Arc::clone(self.controller.session());
        let Some(_exclusive) = session.try_begin_exclusive() else {
            warn!(action = %self.action, "checkout request already in flight; ignoring proceed");
            return self.transition(ProceedState::Idle);
        };

        self.transition(ProceedState::Requested);
        let handle = self.button.press().await;
        match handle.settlement() {
            Settlement::Resolved(_) => {
                self.transition(ProceedState::Valid);
                self.complete(&session).await
            }
            Settlement::PartiallyFailed(response) => {
                self.transition(ProceedState::Invalid);
                let forms: Vec<_> = response.errors.keys().collect();
                error!(?forms, "the checkout form contains errors");
                self.transition(ProceedState::Idle)
            }
            Settlement::Rejected(message) => {
                error!(%message, "checkout update failed; not proceeding");
                self.transition(ProceedState::Idle)
            }
            Settlement::Pending => self.transition(ProceedState::Idle),
        }
    }

    async fn complete(&self, session: &CheckoutSession) -> ProceedState {
        info!(action = %self.action, "proceeding");
        match &self.action {
            ProceedAction::ReloadPage => {
                self.hand_over(session, HostAction::Reload, ProceedState::Reloading)
            }
            ProceedAction::Navigate(url) => self.hand_over(
                session,
                HostAction::Navigate(url.clone()),
                ProceedState::Navigating,
            ),
            ProceedAction::PurchaseNow => self.purchase(session).await,
        }
    }

    async fn purchase(&self, session: &CheckoutSession) -> ProceedState {
        self.transition(ProceedState::Purchasing);
        let payload = session.payload();
        match self.controller.updates().transport().purchase(&payload).await {
            Ok(response) => {
                info!(directive = ?response.expression, "purchase accepted; handing off");
                self.hand_over(
                    session,
                    HostAction::ApplyDirective(response.expression),
                    ProceedState::HandedOff,
                )
            }
            Err(err) => {
                error!(%err, "unable to convert cart into order");
                self.transition(ProceedState::Idle)
            }
        }
    }

    fn hand_over(
        &self,
        session: &CheckoutSession,
        action: HostAction,
        next: ProceedState,
    ) -> ProceedState {
        match self.host.perform(action) {
            Ok(()) => {
                session.close();
                self.transition(next)
            }
            Err(err) => {
                error!(error = %err, "host environment rejected checkout action");
                self.transition(ProceedState::Idle)
            }
        }
    }

    fn transition(&self, next: ProceedState) -> ProceedState {
        let previous = self.state.send_replace(next);
        debug!(?previous, ?next, "proceed transition");
        next
    }
}

#[cfg(test)]
#[path = "tests/proceed_tests.rs"]
mod tests;
