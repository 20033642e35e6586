use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::protocol::{ErrorList, FieldErrors, FormPayload, PurchaseResponse, UpdateResponse};
use tokio::sync::oneshot;

use crate::{
    error::{CheckoutError, Result},
    forms::{BoundForm, FormState},
    transport::CheckoutTransport,
};

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    updates: Mutex<VecDeque<std::result::Result<UpdateResponse, String>>>,
    purchases: Mutex<VecDeque<std::result::Result<PurchaseResponse, String>>>,
    update_calls: Mutex<Vec<FormPayload>>,
    purchase_calls: Mutex<Vec<FormPayload>>,
    update_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply_update(&self, body: Value) {
        let response = serde_json::from_value(body).expect("update response");
        self.updates.lock().expect("lock").push_back(Ok(response));
    }

    pub(crate) fn fail_update(&self, message: &str) {
        self.updates
            .lock()
            .expect("lock")
            .push_back(Err(message.to_string()));
    }

    pub(crate) fn reply_purchase(&self, body: Value) {
        let response = serde_json::from_value(body).expect("purchase response");
        self.purchases.lock().expect("lock").push_back(Ok(response));
    }

    pub(crate) fn fail_purchase(&self, message: &str) {
        self.purchases
            .lock()
            .expect("lock")
            .push_back(Err(message.to_string()));
    }

    /// Holds the next update request until the returned sender fires.
    pub(crate) fn hold_next_update(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.update_gate.lock().expect("lock") = Some(rx);
        tx
    }

    pub(crate) fn update_calls(&self) -> Vec<FormPayload> {
        self.update_calls.lock().expect("lock").clone()
    }

    pub(crate) fn purchase_calls(&self) -> Vec<FormPayload> {
        self.purchase_calls.lock().expect("lock").clone()
    }
}

fn unavailable(message: String) -> CheckoutError {
    CheckoutError::Status {
        status: 503,
        message,
    }
}

#[async_trait]
impl CheckoutTransport for ScriptedTransport {
    async fn update(&self, payload: &FormPayload) -> Result<UpdateResponse> {
        self.update_calls.lock().expect("lock").push(payload.clone());
        let gate = self.update_gate.lock().expect("lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let next = self.updates.lock().expect("lock").pop_front();
        match next {
            Some(reply) => reply.map_err(unavailable),
            None => Ok(UpdateResponse::default()),
        }
    }

    async fn purchase(&self, payload: &FormPayload) -> Result<PurchaseResponse> {
        self.purchase_calls
            .lock()
            .expect("lock")
            .push(payload.clone());
        let next = self.purchases.lock().expect("lock").pop_front();
        match next {
            Some(reply) => reply.map_err(unavailable),
            None => Err(unavailable("no purchase reply scripted".to_string())),
        }
    }
}

pub(crate) fn valid_form(name: &str) -> Arc<FormState> {
    Arc::new(FormState::with_values(name, [("filled", json!(true))]))
}

pub(crate) fn invalid_form(name: &str) -> Arc<FormState> {
    let form = valid_form(name);
    let errors = FieldErrors::from([("filled".to_string(), ErrorList::from("required"))]);
    assert!(form.apply_errors(&errors));
    form
}
