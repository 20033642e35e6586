use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use serde_json::Value;
use shared::{
    domain::{FormName, PageSlug},
    protocol::{FieldErrors, FormErrors, FormPayload},
};
use tracing::{debug, warn};

pub trait BoundForm: Send + Sync {
    fn name(&self) -> &FormName;
    fn is_valid(&self) -> bool;
    fn data(&self) -> Value;
    /// Marks the given fields as failing; returns true if any error was applied.
    fn apply_errors(&self, errors: &FieldErrors) -> bool;
}

#[derive(Debug, Default)]
struct FormFields {
    values: BTreeMap<String, Value>,
    errors: FieldErrors,
}

/// In-memory form model: valid as long as no field carries a server error.
#[derive(Debug)]
pub struct FormState {
    name: FormName,
    fields: RwLock<FormFields>,
}

impl FormState {
    pub fn new(name: impl Into<FormName>) -> Self {
        Self {
            name: name.into(),
            fields: RwLock::new(FormFields::default()),
        }
    }

    pub fn with_values<K, I>(name: impl Into<FormName>, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let form = Self::new(name);
        for (field, value) in values {
            form.set_field(field, value);
        }
        form
    }

    /// Editing a field drops whatever error the server reported for it.
    pub fn set_field(&self, field: impl Into<String>, value: Value) {
        let field = field.into();
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        fields.errors.remove(&field);
        fields.values.insert(field, value);
    }

    pub fn field(&self, field: &str) -> Option<Value> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.values.get(field).cloned()
    }

    pub fn errors(&self) -> FieldErrors {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.errors.clone()
    }
}

impl BoundForm for FormState {
    fn name(&self) -> &FormName {
        &self.name
    }

    fn is_valid(&self) -> bool {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.errors.values().all(|list| list.is_empty())
    }

    fn data(&self) -> Value {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        Value::Object(
            fields
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    fn apply_errors(&self, errors: &FieldErrors) -> bool {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        let mut applied = false;
        for (field, list) in errors {
            if list.is_empty() {
                continue;
            }
            fields.errors.insert(field.clone(), list.clone());
            applied = true;
        }
        applied
    }
}

/// Forms observed per booklet page. Pages and the forms on each page keep first-render order.
#[derive(Default)]
pub struct FormRegistry {
    pages: Vec<(PageSlug, Vec<Arc<dyn BoundForm>>)>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `form` under `slug`. A name already observed on that page is ignored.
    pub fn observe(&mut self, slug: &PageSlug, form: Arc<dyn BoundForm>) {
        let index = match self.pages.iter().position(|(known, _)| known == slug) {
            Some(index) => index,
            None => {
                self.pages.push((slug.clone(), Vec::new()));
                self.pages.len() - 1
            }
        };
        let forms = &mut self.pages[index].1;
        if forms.iter().any(|known| known.name() == form.name()) {
            debug!(%slug, form = %form.name(), "form already observed on page");
            return;
        }
        forms.push(form);
    }

    pub fn form_names(&self, slug: &PageSlug) -> Vec<FormName> {
        self.page(slug)
            .map(|forms| forms.iter().map(|form| form.name().clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_page_valid(&self, slug: &PageSlug) -> bool {
        self.page(slug)
            .map_or(true, |forms| forms.iter().all(|form| form.is_valid()))
    }

    /// Applies server-reported errors to the named forms. Returns true iff at least one
    /// error landed on a form.
    pub fn inject_errors(&self, errors: &FormErrors) -> bool {
        let mut applied = false;
        for (name, field_errors) in errors {
            let mut matched = false;
            for form in self.forms_named(name) {
                matched = true;
                applied = form.apply_errors(field_errors) || applied;
            }
            if !matched {
                warn!(form = %name, "server reported errors for a form that is not observed");
            }
        }
        applied
    }

    /// Collects every observed form's data, keyed by form name. When two pages carry a form
    /// with the same name, the page observed first wins.
    pub fn payload(&self) -> FormPayload {
        let mut payload = FormPayload::new();
        for form in self.all_forms() {
            payload
                .entry(form.name().to_string())
                .or_insert_with(|| form.data());
        }
        payload
    }

    fn page(&self, slug: &PageSlug) -> Option<&[Arc<dyn BoundForm>]> {
        self.pages
            .iter()
            .find(|(known, _)| known == slug)
            .map(|(_, forms)| forms.as_slice())
    }

    fn all_forms(&self) -> impl Iterator<Item = &Arc<dyn BoundForm>> {
        self.pages.iter().flat_map(|(_, forms)| forms)
    }

    fn forms_named<'a>(
        &'a self,
        name: &'a FormName,
    ) -> impl Iterator<Item = &'a Arc<dyn BoundForm>> {
        self.all_forms().filter(move |form| form.name() == name)
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
