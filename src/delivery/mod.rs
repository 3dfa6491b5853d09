mod emailjs;

use async_trait::async_trait;
use serde::Deserialize;

pub use emailjs::EmailJsProvider;

/// Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Errors that can occur while talking to the delivery service
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Api(String),

    #[error("delivery service rejected the message: {0}")]
    Rejected(String),

    #[error("invalid delivery configuration: {0}")]
    Config(String),
}

/// One message to one recipient: who hunts whom
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub recipient_email: String,
    pub recipient_name: String,
    pub target_name: String,
    /// Template locale, passed through untouched
    pub locale: Option<String>,
}

/// Public configuration bundle for the delivery service, served by the game
/// server so the ids never live in client code. Required before any dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

impl DeliveryConfig {
    /// All three ids must be present for the bundle to be usable
    pub fn is_complete(&self) -> bool {
        !self.service_id.is_empty()
            && !self.template_id.is_empty()
            && !self.public_key.is_empty()
    }

    /// Build the production provider from this bundle
    pub fn build_provider(self) -> DeliveryResult<EmailJsProvider> {
        if !self.is_complete() {
            return Err(DeliveryError::Config(
                "service id, template id and public key must all be set".to_string(),
            ));
        }
        EmailJsProvider::new(self)
    }
}

/// Trait every delivery backend implements; tests substitute recorders
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Deliver one target-assignment message, awaited to completion
    async fn send(&self, request: DeliveryRequest) -> DeliveryResult<()>;

    /// Name of this provider
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(service: &str, template: &str, key: &str) -> DeliveryConfig {
        DeliveryConfig {
            service_id: service.to_string(),
            template_id: template.to_string(),
            public_key: key.to_string(),
        }
    }

    #[test]
    fn test_config_completeness() {
        assert!(config("svc", "tpl", "key").is_complete());
        assert!(!config("", "tpl", "key").is_complete());
        assert!(!config("svc", "", "key").is_complete());
        assert!(!config("svc", "tpl", "").is_complete());
    }

    #[test]
    fn test_incomplete_config_cannot_build_provider() {
        let err = config("svc", "", "key").build_provider().unwrap_err();
        assert!(matches!(err, DeliveryError::Config(_)));
    }
}
