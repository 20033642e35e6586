use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use shared::protocol::ServerDirective;
use tracing::info;

/// Side effects the booklet core may ask of its host. Nothing else leaves the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    Reload,
    Navigate(String),
    ApplyDirective(ServerDirective),
}

pub trait HostEnvironment: Send + Sync {
    fn perform(&self, action: HostAction) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    actions: Mutex<Vec<HostAction>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<HostAction> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HostEnvironment for RecordingHost {
    fn perform(&self, action: HostAction) -> Result<()> {
        info!(?action, "host action");
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
        Ok(())
    }
}
