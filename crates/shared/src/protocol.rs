use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::FormName;

pub type FormPayload = Map<String, Value>;

pub const ERRORS_KEY: &str = "errors";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorList(pub Vec<String>);

impl ErrorList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ErrorList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(message) => Self(vec![message]),
            OneOrMany::Many(messages) => Self(messages),
        })
    }
}

impl From<&str> for ErrorList {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

pub type FieldErrors = BTreeMap<String, ErrorList>;

pub type FormErrors = BTreeMap<FormName, FieldErrors>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot(pub Map<String, Value>);

impl CartSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub errors: FormErrors,
    #[serde(flatten)]
    pub cart: Map<String, Value>,
}

impl UpdateResponse {
    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|fields| fields.values().any(|list| !list.is_empty()))
    }

    pub fn split(&self) -> (CartSnapshot, FormErrors) {
        let mut cart = self.cart.clone();
        cart.remove(ERRORS_KEY);
        (CartSnapshot(cart), self.errors.clone())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerDirective {
    Reload,
    Redirect {
        url: String,
    },
    SubmitForm {
        action: String,
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub expression: ServerDirective,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn update_response_splits_errors_from_cart() {
        let response: UpdateResponse = serde_json::from_value(json!({
            "cart": {"total": "12.00"},
            "errors": {"shippingForm": {"address": "required"}}
        }))
        .expect("decode");

        let (cart, errors) = response.split();
        assert!(!cart.contains_key(ERRORS_KEY));
        assert_eq!(cart.get("cart"), Some(&json!({"total": "12.00"})));
        assert_eq!(
            errors[&FormName::from("shippingForm")]["address"].messages(),
            ["required".to_string()]
        );
        assert!(response.has_errors());
    }

    #[test]
    fn null_and_missing_errors_decode_as_empty() {
        let missing: UpdateResponse =
            serde_json::from_value(json!({"revision": 3})).expect("decode");
        let null: UpdateResponse =
            serde_json::from_value(json!({"revision": 3, "errors": null})).expect("decode");
        assert!(missing.errors.is_empty());
        assert!(null.errors.is_empty());
        assert!(!null.has_errors());
    }

    #[test]
    fn directive_accepts_bare_and_structured_forms() {
        let reload: PurchaseResponse =
            serde_json::from_value(json!({"expression": "reload"})).expect("decode");
        assert_eq!(reload.expression, ServerDirective::Reload);

        let redirect: PurchaseResponse = serde_json::from_value(json!({
            "expression": {"redirect": {"url": "https://psp.example/pay?order=7"}}
        }))
        .expect("decode");
        assert_eq!(
            redirect.expression,
            ServerDirective::Redirect {
                url: "https://psp.example/pay?order=7".to_string()
            }
        );
    }

    #[test]
    fn arbitrary_expression_strings_are_rejected() {
        let result = serde_json::from_value::<PurchaseResponse>(json!({
            "expression": "$window.location.href='https://evil.example/'"
        }));
        assert!(result.is_err());
    }
}
