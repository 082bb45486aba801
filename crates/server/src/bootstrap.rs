use std::sync::Arc;

use naturetalk_agent::{AnthropicClient, Assistant, LlmGateway};
use naturetalk_core::config::{AppConfig, CredentialsConfig, LoadOptions};
use naturetalk_core::{ApplicationError, CredentialResolver, DeviceStore};
use naturetalk_skill::default_router;
use tracing::{error, info};

use crate::aws::AwsCredentials;
use crate::entry::SkillService;
use crate::secrets::{ParameterStoreSource, SecretsVaultSource};

pub struct Application {
    pub config: AppConfig,
    pub service: Arc<SkillService>,
    pub credentials: Arc<CredentialResolver>,
    pub devices: Arc<DeviceStore>,
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, ApplicationError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, ApplicationError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        model = %config.llm.model,
        "starting application bootstrap"
    );

    let credentials = Arc::new(credential_resolver(&config.credentials));
    let api_key = credentials.resolve().await.map_err(|credential_error| {
        let failure = ApplicationError::from(credential_error);
        error!(
            event_name = "system.bootstrap.credential_missing",
            correlation_id = "bootstrap",
            failure = failure.failure_kind().as_key(),
            error = %failure,
            "no credential source yielded an API key"
        );
        failure
    })?;

    let client = AnthropicClient::new(api_key, &config.llm)
        .map_err(|llm_error| ApplicationError::Integration(llm_error.to_string()))?;
    let assistant: Arc<dyn Assistant> = Arc::new(
        LlmGateway::new(client)
            .with_model(config.llm.model.clone())
            .with_max_tokens(config.llm.max_tokens),
    );

    let devices = Arc::new(DeviceStore::new());
    let router =
        default_router(assistant, Arc::clone(&devices), config.conversation.history_turns);
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        routes = router.handler_count(),
        "skill router initialized"
    );

    Ok(Application {
        config,
        service: Arc::new(SkillService::new(router)),
        credentials,
        devices,
    })
}

/// Environment first, then the parameter store and secrets vault when named.
pub fn credential_resolver(config: &CredentialsConfig) -> CredentialResolver {
    let aws = AwsCredentials::from_env();
    let mut resolver = CredentialResolver::new(config.api_key_env.clone());

    if let Some(parameter_name) = &config.parameter_name {
        resolver = resolver.with_source(
            parameter_name.clone(),
            Arc::new(ParameterStoreSource::for_region(&config.region, aws.clone())),
        );
    }
    if let Some(secret_id) = &config.secret_id {
        resolver = resolver.with_source(
            secret_id.clone(),
            Arc::new(SecretsVaultSource::for_region(&config.region, aws)),
        );
    }

    resolver
}
