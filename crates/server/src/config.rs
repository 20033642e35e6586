use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const CONFIG_FILE: &str = "checkout.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub psp_redirect_url: Option<String>,
    pub max_body_bytes: usize,
    /// Form name to the fields that must be filled before purchase.
    pub required_fields: BTreeMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            psp_redirect_url: None,
            max_body_bytes: 64 * 1024,
            required_fields: BTreeMap::from([
                ("customer".to_string(), vec!["email".to_string()]),
                (
                    "shipping_address".to_string(),
                    vec!["name".to_string(), "address".to_string(), "city".to_string()],
                ),
                ("payment_method".to_string(), vec!["method".to_string()]),
            ]),
        }
    }
}

impl Settings {
    pub fn psp_redirect(&self) -> anyhow::Result<Option<Url>> {
        self.psp_redirect_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).with_context(|| format!("invalid psp_redirect_url '{raw}'"))
            })
            .transpose()
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    psp_redirect_url: Option<String>,
    max_body_bytes: Option<usize>,
    required_fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Defaults, then `checkout.toml` from the working directory, then `CHECKOUT__*` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.psp_redirect_url {
        settings.psp_redirect_url = Some(v);
    }
    if let Some(v) = file_cfg.max_body_bytes {
        settings.max_body_bytes = v;
    }
    if let Some(v) = file_cfg.required_fields {
        settings.required_fields = v;
    }
    Ok(())
}

pub(crate) fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CHECKOUT__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = var("CHECKOUT__PSP_REDIRECT_URL") {
        settings.psp_redirect_url = (!v.trim().is_empty()).then_some(v);
    }
    if let Some(v) = var("CHECKOUT__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
