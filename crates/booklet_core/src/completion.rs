use std::sync::Arc;

use shared::protocol::UpdateResponse;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Settlement {
    #[default]
    Pending,
    Resolved(Arc<UpdateResponse>),
    PartiallyFailed(Arc<UpdateResponse>),
    Rejected(String),
}

impl Settlement {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Resolved and rejected settlements cannot be replaced.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Rejected(_))
    }
}

#[derive(Debug, Clone)]
pub struct CompletionHandle {
    tx: Arc<watch::Sender<Settlement>>,
}

impl Default for CompletionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Settlement::Pending);
        Self { tx: Arc::new(tx) }
    }

    pub fn settlement(&self) -> Settlement {
        self.tx.borrow().clone()
    }

    pub fn resolve(&self, response: Arc<UpdateResponse>) -> bool {
        self.settle(Settlement::Resolved(response))
    }

    pub fn notify(&self, response: Arc<UpdateResponse>) -> bool {
        self.settle(Settlement::PartiallyFailed(response))
    }

    pub fn reject(&self, message: impl Into<String>) -> bool {
        self.settle(Settlement::Rejected(message.into()))
    }

    pub async fn wait(&self) -> Settlement {
        let mut rx = self.tx.subscribe();
        let settlement = match rx.wait_for(|settlement| !settlement.is_pending()).await {
            Ok(settlement) => settlement.clone(),
            // The sender lives in `self`, so the channel cannot close while we wait.
            Err(_) => self.settlement(),
        };
        settlement
    }

    fn settle(&self, next: Settlement) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_final() {
                return false;
            }
            *current = next;
            true
        })
    }
}
