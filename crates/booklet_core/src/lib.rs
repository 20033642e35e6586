//! Coordination core for a multi-page ("booklet") checkout.

pub mod booklet;
pub mod completion;
pub mod error;
pub mod forms;
pub mod host;
pub mod pages;
pub mod proceed;
pub mod session;
pub mod transport;
pub mod update;

#[cfg(test)]
mod test_support;

pub use booklet::{BookletController, ButtonBinding, ButtonState};
pub use completion::{CompletionHandle, Settlement};
pub use error::CheckoutError;
pub use forms::{BoundForm, FormRegistry, FormState};
pub use host::{HostAction, HostEnvironment, RecordingHost};
pub use pages::PageSequencer;
pub use proceed::{ProceedAction, ProceedCoordinator, ProceedState};
pub use session::{CheckoutSession, LoadingGuard};
pub use transport::{CheckoutEndpoints, CheckoutTransport, HttpCheckoutTransport};
pub use update::{UpdateReport, UpdateSession};
