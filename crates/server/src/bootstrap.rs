use std::sync::Arc;

use harvestbot_core::config::{AppConfig, ConfigError, LoadOptions, WebexConfig};
use harvestbot_core::knowledge::FileKnowledgeStore;
use harvestbot_hec::{HecError, HecNotifier};
use harvestbot_webex::{MessagingClient, RegistrationOutcome, WebexClient, WebexError};
use thiserror::Error;
use tracing::{info, warn};

use crate::webhook::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("webex client construction failed: {0}")]
    Webex(#[source] WebexError),
    #[error("hec notifier construction failed: {0}")]
    Hec(#[source] HecError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let messaging = Arc::new(WebexClient::new(&config.webex).map_err(BootstrapError::Webex)?);
    let notifier = Arc::new(HecNotifier::new(&config.hec).map_err(BootstrapError::Hec)?);
    let store = Arc::new(FileKnowledgeStore::new(&config.knowledge.path));

    let state = AppState {
        store,
        messaging,
        notifier,
        bot_email: config.webex.bot_email.clone(),
    };

    info!(
        event_name = "system.bootstrap.ready",
        knowledge_path = %config.knowledge.path.display(),
        "application bootstrap complete"
    );

    Ok(Application { config, state })
}

/// Startup webhook registration. Runs exactly once per process; a failure is
/// logged and serving proceeds without the registration.
pub async fn register_webhook(webex: &WebexConfig, messaging: &dyn MessagingClient) {
    match messaging.ensure_webhook_registered(&webex.webhook_name, &webex.callback_url).await {
        Ok(RegistrationOutcome::AlreadyRegistered) => {
            info!(name = %webex.webhook_name, "webhook already registered");
        }
        Ok(RegistrationOutcome::Created) => {
            info!(name = %webex.webhook_name, target_url = %webex.callback_url, "webhook registered");
        }
        Err(error) => {
            warn!(
                name = %webex.webhook_name,
                error = %error,
                "webhook registration failed; continuing without it"
            );
        }
    }
}
