use std::time::Duration;

use serde::Serialize;

use super::*;

/// Hosted EmailJS REST endpoint
const DEFAULT_API_BASE: &str = "https://api.emailjs.com";

/// EmailJS delivery backend
#[derive(Debug)]
pub struct EmailJsProvider {
    client: reqwest::Client,
    config: DeliveryConfig,
    base_url: String,
}

impl EmailJsProvider {
    /// Create a provider against the hosted EmailJS API
    pub fn new(config: DeliveryConfig) -> DeliveryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeliveryError::Api(e.to_string()))?;

        Ok(Self {
            client,
            config,
            base_url: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the provider at a different endpoint (local stub in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SendPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    to_name: &'a str,
    target_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<&'a str>,
}

#[async_trait]
impl DeliveryProvider for EmailJsProvider {
    async fn send(&self, request: DeliveryRequest) -> DeliveryResult<()> {
        let payload = SendPayload {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: TemplateParams {
                to_email: &request.recipient_email,
                to_name: &request.recipient_name,
                target_name: &request.target_name,
                locale: request.locale.as_deref(),
            },
        };

        let url = format!("{}/api/v1.0/email/send", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Api(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(recipient = %request.recipient_email, "delivery accepted");
            Ok(())
        } else {
            // EmailJS puts the reason in the plain-text body
            let reason = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected(format!("{}: {}", status, reason)))
        }
    }

    fn name(&self) -> &str {
        "emailjs"
    }
}
