use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("checkout endpoint returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid checkout endpoint url: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("checkout session is closed")]
    SessionClosed,
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;
