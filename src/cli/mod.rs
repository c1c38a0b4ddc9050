pub mod bid;
pub mod chat;
pub mod finalize;
pub mod input;
pub mod reset;
pub mod stage;
pub mod status;

use crate::error::GatewayError;
use crate::gateway::{Gateway, GeminiClient, ModelClient, ModelRequest};
use crate::models::FactoryConfig;
use crate::state::{Store, WorkflowSession};
use crate::workflow::Factory;
use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Stand-in used when no API key is configured; every call fails
struct Unconfigured {
    api_key_env: String,
}

#[async_trait]
impl ModelClient for Unconfigured {
    async fn generate(&self, _request: &ModelRequest) -> Result<String, GatewayError> {
        Err(GatewayError::MissingApiKey(self.api_key_env.clone()))
    }
}

pub fn load_config(project_root: &Path) -> Result<FactoryConfig> {
    FactoryConfig::load(project_root).with_context(|| {
        format!(
            "Failed to read {}",
            FactoryConfig::config_path(project_root).display()
        )
    })
}

pub fn open_store(project_root: &Path) -> Result<Store> {
    let config = load_config(project_root)?;
    Ok(Store::new(config.state_path(project_root)))
}

pub fn open_session(project_root: &Path) -> Result<WorkflowSession> {
    Ok(WorkflowSession::load(open_store(project_root)?))
}

/// Build a factory over the persisted session.
///
/// With `require_model` set, a missing API key is reported before anything runs.
pub fn open_factory(project_root: &Path, require_model: bool) -> Result<Factory> {
    let config = load_config(project_root)?;
    let store = Store::new(config.state_path(project_root));

    let client: Arc<dyn ModelClient> = match GeminiClient::from_config(config.gemini.clone()) {
        Ok(client) => Arc::new(client),
        Err(e @ GatewayError::MissingApiKey(_)) if require_model => return Err(e.into()),
        Err(GatewayError::MissingApiKey(env)) => Arc::new(Unconfigured { api_key_env: env }),
        Err(e) => return Err(e.into()),
    };

    Ok(Factory::new(WorkflowSession::load(store), Gateway::new(client)))
}

/// Spinner shown while an agent is working
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_factory_without_key() {
        let temp = TempDir::new().unwrap();
        let mut config = FactoryConfig::default();
        config.gemini.api_key_env = "GRANT_FACTORY_TEST_UNSET_KEY".into();
        config.save(temp.path()).unwrap();

        let err = open_factory(temp.path(), true).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GatewayError>(),
            Some(GatewayError::MissingApiKey(_))
        ));

        // Non-model commands still work
        let factory = open_factory(temp.path(), false).unwrap();
        assert!(!factory.is_processing());
    }
}
