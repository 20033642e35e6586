use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiError,
    protocol::{FormPayload, PurchaseResponse, UpdateResponse},
};
use tracing::debug;
use url::Url;

use crate::error::{CheckoutError, Result};

pub const UPDATE_PATH: &str = "checkout/update/";
pub const PURCHASE_PATH: &str = "checkout/purchase/";

#[async_trait]
pub trait CheckoutTransport: Send + Sync {
    async fn update(&self, payload: &FormPayload) -> Result<UpdateResponse>;
    async fn purchase(&self, payload: &FormPayload) -> Result<PurchaseResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutEndpoints {
    pub update: Url,
    pub purchase: Url,
}

impl CheckoutEndpoints {
    /// Resolves both endpoints relative to `base`, treating it as a directory.
    pub fn from_base(base: &str) -> Result<Self> {
        let base = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        Ok(Self {
            update: base.join(UPDATE_PATH)?,
            purchase: base.join(PURCHASE_PATH)?,
        })
    }
}

pub struct HttpCheckoutTransport {
    http: Client,
    endpoints: CheckoutEndpoints,
}

impl HttpCheckoutTransport {
    pub fn new(endpoints: CheckoutEndpoints) -> Self {
        Self::with_client(Client::new(), endpoints)
    }

    pub fn with_client(http: Client, endpoints: CheckoutEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &CheckoutEndpoints {
        &self.endpoints
    }

    async fn post<T: DeserializeOwned>(&self, url: &Url, payload: &FormPayload) -> Result<T> {
        let res = self.http.post(url.clone()).json(payload).send().await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }
}

async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => {
            debug!(%err, %status, "unable to read checkout error body");
            String::new()
        }
    };
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|error| error.message)
        .unwrap_or(body);
    Err(CheckoutError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CheckoutTransport for HttpCheckoutTransport {
    async fn update(&self, payload: &FormPayload) -> Result<UpdateResponse> {
        self.post(&self.endpoints.update, payload).await
    }

    async fn purchase(&self, payload: &FormPayload) -> Result<PurchaseResponse> {
        self.post(&self.endpoints.purchase, payload).await
    }
}
