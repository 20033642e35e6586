use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use booklet_core::{
    BookletController, ButtonState, CheckoutEndpoints, CheckoutSession, FormState,
    HostAction, HttpCheckoutTransport, ProceedAction, ProceedCoordinator, RecordingHost,
};
use clap::Parser;
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::protocol::ServerDirective;
use tracing::{info, warn};

/// Walks a checkout booklet against a checkout server and reports where it would go next.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: String,
    /// JSON file describing the booklet pages and their forms.
    #[arg(long)]
    booklet: PathBuf,
    /// RELOAD_PAGE, PURCHASE_NOW or a URL to navigate to.
    #[arg(long, default_value = "PURCHASE_NOW")]
    action: String,
}

#[derive(Debug, Deserialize)]
struct BookletFile {
    pages: Vec<PageFile>,
}

#[derive(Debug, Deserialize)]
struct PageFile {
    slug: String,
    #[serde(default)]
    forms: Vec<FormFile>,
}

#[derive(Debug, Deserialize)]
struct FormFile {
    name: String,
    #[serde(default)]
    values: Map<String, Value>,
}

fn load_booklet(path: &PathBuf) -> Result<BookletFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read booklet '{}'", path.display()))?;
    let booklet: BookletFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse booklet '{}'", path.display()))?;
    if booklet.pages.is_empty() {
        bail!("booklet '{}' declares no pages", path.display());
    }
    Ok(booklet)
}

fn describe(action: &HostAction) -> String {
    match action {
        HostAction::Reload => "reload the checkout page".to_string(),
        HostAction::Navigate(url) => format!("navigate to {url}"),
        HostAction::ApplyDirective(ServerDirective::Reload) => {
            "reload as instructed by the server".to_string()
        }
        HostAction::ApplyDirective(ServerDirective::Redirect { url }) => {
            format!("redirect to payment provider at {url}")
        }
        HostAction::ApplyDirective(ServerDirective::SubmitForm { action, fields }) => {
            format!("submit {} field(s) to payment provider at {action}", fields.len())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let booklet = load_booklet(&args.booklet)?;

    let endpoints = CheckoutEndpoints::from_base(&args.server_url)?;
    let controller = BookletController::new(
        CheckoutSession::new(),
        Arc::new(HttpCheckoutTransport::new(endpoints)),
    );
    for page in &booklet.pages {
        controller.register_page(page.slug.as_str());
        for entry in &page.forms {
            let form = FormState::with_values(entry.name.as_str(), entry.values.clone());
            controller.observe(page.slug.as_str(), Arc::new(form));
        }
    }

    if let Err(err) = controller.update(None).await {
        warn!(%err, "initial checkout update failed");
    }

    let host = Arc::new(RecordingHost::new());
    let coordinator = ProceedCoordinator::new(
        controller.clone(),
        ProceedAction::from(args.action.as_str()),
        host.clone(),
    );
    let state = coordinator.proceed().await;
    info!(?state, action = %coordinator.action(), "proceed finished");

    let slugs = controller.session().pages().slugs().to_vec();
    for slug in slugs {
        let marker = match controller.button_state(&slug) {
            ButtonState::Enabled => "open",
            ButtonState::Disabled => "locked",
        };
        let default = if controller.is_default(&slug) { " (default)" } else { "" };
        println!("{slug}: {marker}{default}");
    }

    if !state.is_terminal() {
        bail!("checkout did not proceed; see log for form errors");
    }
    for action in host.actions() {
        println!("next: {}", describe(&action));
    }
    Ok(())
}
