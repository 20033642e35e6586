use std::sync::Arc;

use shared::protocol::{FormPayload, UpdateResponse};
use tracing::{debug, error, info};

use crate::{
    completion::CompletionHandle,
    error::{CheckoutError, Result},
    session::CheckoutSession,
    transport::CheckoutTransport,
};

#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub response: Arc<UpdateResponse>,
    pub errors_applied: bool,
}

#[derive(Clone)]
pub struct UpdateSession {
    session: Arc<CheckoutSession>,
    transport: Arc<dyn CheckoutTransport>,
}

impl UpdateSession {
    pub fn new(session: Arc<CheckoutSession>, transport: Arc<dyn CheckoutTransport>) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Arc<CheckoutSession> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<dyn CheckoutTransport> {
        &self.transport
    }

    /// Sends `payload` to the update endpoint. Validation errors are only injected into the
    /// forms when a completion handle is supplied; background saves leave forms untouched.
    pub async fn push(
        &self,
        payload: FormPayload,
        handle: Option<&CompletionHandle>,
    ) -> Result<UpdateReport> {
        if self.session.is_closed() {
            if let Some(handle) = handle {
                handle.reject(CheckoutError::SessionClosed.to_string());
            }
            return Err(CheckoutError::SessionClosed);
        }

        let _loading = self.session.begin_loading();
        debug!(forms = payload.len(), "pushing checkout update");
        match self.transport.update(&payload).await {
            Ok(response) => Ok(self.apply(response, handle)),
            Err(err) => {
                error!(%err, "unable to update checkout forms");
                if let Some(handle) = handle {
                    handle.reject(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn apply(&self, response: UpdateResponse, handle: Option<&CompletionHandle>) -> UpdateReport {
        let (cart, errors) = response.split();
        self.session.replace_cart(cart);
        let response = Arc::new(response);

        let Some(handle) = handle else {
            return UpdateReport {
                response,
                errors_applied: false,
            };
        };

        let errors_applied = self.session.forms().inject_errors(&errors);
        if errors_applied {
            info!(forms = errors.len(), "checkout update reported validation errors");
            handle.notify(Arc::clone(&response));
        } else {
            handle.resolve(Arc::clone(&response));
        }
        UpdateReport {
            response,
            errors_applied,
        }
    }
}

#[cfg(test)]
#[path = "tests/update_tests.rs"]
mod tests;
