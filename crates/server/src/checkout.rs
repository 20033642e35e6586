use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{
    domain::FormName,
    error::{ApiException, ErrorCode},
    protocol::{
        ErrorList, FieldErrors, FormErrors, FormPayload, PurchaseResponse, ServerDirective,
        UpdateResponse,
    },
};
use url::Url;
use uuid::Uuid;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

#[derive(Debug, Clone, Default)]
pub struct Validator {
    required: BTreeMap<FormName, Vec<String>>,
}

impl Validator {
    pub fn new(required: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            required: required
                .iter()
                .map(|(form, fields)| (FormName::from(form.as_str()), fields.clone()))
                .collect(),
        }
    }

    pub fn check_form(&self, name: &FormName, data: Option<&Value>) -> FieldErrors {
        let Some(fields) = self.required.get(name) else {
            return FieldErrors::new();
        };
        fields
            .iter()
            .filter(|field| is_blank(data.and_then(|form| form.get(field.as_str()))))
            .map(|field| (field.clone(), ErrorList::from(REQUIRED_MESSAGE)))
            .collect()
    }

    pub fn check_submitted(&self, forms: &FormPayload) -> FormErrors {
        forms
            .iter()
            .map(|(name, data)| {
                let name = FormName::from(name.as_str());
                let errors = self.check_form(&name, Some(data));
                (name, errors)
            })
            .filter(|(_, errors)| !errors.is_empty())
            .collect()
    }

    /// Checks every form that has rules, whether submitted or not.
    pub fn check_all(&self, forms: &FormPayload) -> FormErrors {
        self.required
            .keys()
            .map(|name| (name.clone(), self.check_form(name, forms.get(name.as_str()))))
            .filter(|(_, errors)| !errors.is_empty())
            .collect()
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub forms: FormPayload,
}

#[derive(Debug, Default)]
pub struct CheckoutStore {
    forms: FormPayload,
    revision: u64,
    orders: Vec<OrderRecord>,
}

impl CheckoutStore {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    /// Replaces the submitted forms. Posting the same data again leaves the revision alone.
    fn merge(&mut self, payload: FormPayload) {
        let mut changed = false;
        for (name, data) in payload {
            if self.forms.get(&name) != Some(&data) {
                self.forms.insert(name, data);
                changed = true;
            }
        }
        if changed {
            self.revision += 1;
        }
    }

    fn cart_body(&self) -> serde_json::Map<String, Value> {
        let mut cart = serde_json::Map::new();
        cart.insert("revision".into(), json!(self.revision));
        cart.insert("forms".into(), Value::Object(self.forms.clone()));
        cart
    }

    pub fn update(&mut self, validator: &Validator, payload: FormPayload) -> UpdateResponse {
        let errors = validator.check_submitted(&payload);
        self.merge(payload);
        UpdateResponse {
            errors,
            cart: self.cart_body(),
        }
    }

    pub fn purchase(
        &mut self,
        validator: &Validator,
        psp_redirect: Option<&Url>,
        payload: FormPayload,
    ) -> Result<PurchaseResponse, ApiException> {
        self.merge(payload);
        if self.forms.is_empty() {
            return Err(ApiException::new(ErrorCode::Validation, "cart is empty"));
        }
        let errors = validator.check_all(&self.forms);
        if !errors.is_empty() {
            let names: Vec<&str> = errors.keys().map(FormName::as_str).collect();
            return Err(ApiException::new(
                ErrorCode::Validation,
                format!("checkout forms contain errors: {}", names.join(", ")),
            ));
        }

        let order = OrderRecord {
            order_id: Uuid::new_v4(),
            created_at: Utc::now(),
            forms: std::mem::take(&mut self.forms),
        };
        self.revision += 1;

        let expression = match psp_redirect {
            Some(base) => {
                let mut url = base.clone();
                url.query_pairs_mut()
                    .append_pair("order", &order.order_id.to_string());
                ServerDirective::Redirect { url: url.into() }
            }
            None => ServerDirective::Reload,
        };
        self.orders.push(order);
        Ok(PurchaseResponse { expression })
    }
}
