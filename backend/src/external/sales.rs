//! Push client for the external sales system.
//!
//! Events are delivered as JSON over HTTP, authenticated by an
//! HMAC-SHA256 signature of the body under the shared key. Delivery is
//! at-least-once; the consumer must be idempotent.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;

use crate::config::SalesConfig;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "X-Ledger-Signature";

/// Sales system push client
#[derive(Clone)]
pub struct SalesClient {
    client: Client,
    endpoint: String,
    shared_key: String,
}

impl SalesClient {
    pub fn new(config: &SalesConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            shared_key: config.shared_key.clone(),
        }
    }

    fn sign(&self, body: &[u8]) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.shared_key.as_bytes())
            .map_err(|_| AppError::Configuration("Invalid sales shared key".to_string()))?;
        mac.update(body);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Push one event to the sales system.
    pub async fn push_event(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()> {
        let body = serde_json::json!({
            "type": event_type,
            "payload": payload,
        });
        let bytes = serde_json::to_vec(&body).map_err(anyhow::Error::from)?;
        let signature = self.sign(&bytes)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "sales push returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
