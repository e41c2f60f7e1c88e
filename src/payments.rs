use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Client for the Razorpay orders API. Order creation and signature
/// verification both happen server-side; the browser widget only ever sees
/// the key id.
#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// The provider-side order the hosted widget is opened against.
#[derive(Debug, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

impl RazorpayClient {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a provider order for `amount` (minor units).
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> anyhow::Result<ProviderOrder> {
        let body = CreateOrderBody {
            amount,
            currency,
            receipt,
        };

        let response = self
            .http
            .post(format!("{RAZORPAY_API_BASE}/orders"))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let order: ProviderOrder = response.json().await?;
        tracing::debug!(provider_order_id = %order.id, amount, "provider order created");
        Ok(order)
    }

    /// Verify the three fields the widget hands back after capture. The
    /// client must never do this check itself.
    pub fn verify_checkout_signature(
        &self,
        provider_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        verify_signature(&self.key_secret, provider_order_id, payment_id, signature)
    }
}

/// Razorpay signs `"{order_id}|{payment_id}"` with HMAC-SHA256 under the key
/// secret and hex-encodes the result.
pub fn verify_signature(
    key_secret: &str,
    provider_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.as_bytes()) else {
        return false;
    };
    mac.update(provider_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    hex::encode(mac.finalize().into_bytes()) == signature
}
