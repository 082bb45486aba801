use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use naturetalk_core::{SecretSource, SecretSourceError};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;

use crate::aws::{AwsCredentials, AwsJsonClient, PARAMETER_STORE, SECRETS_MANAGER};

/// Reads a decrypted parameter from the AWS parameter store.
pub struct ParameterStoreSource {
    client: AwsJsonClient,
}

impl ParameterStoreSource {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }

    pub fn for_region(region: &str, credentials: Option<AwsCredentials>) -> Self {
        Self::new(AwsJsonClient::new(PARAMETER_STORE, region, credentials))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterResponse {
    parameter: Parameter,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Parameter {
    value: Option<String>,
}

#[async_trait]
impl SecretSource for ParameterStoreSource {
    fn label(&self) -> &'static str {
        "parameter_store"
    }

    async fn fetch(&self, name: &str) -> Result<SecretString, SecretSourceError> {
        let response: GetParameterResponse = self
            .client
            .call("GetParameter", &json!({"Name": name, "WithDecryption": true}))
            .await?;

        response
            .parameter
            .value
            .map(SecretString::from)
            .ok_or_else(|| SecretSourceError::Decode(format!("parameter `{name}` has no value")))
    }
}

/// Reads a secret from AWS Secrets Manager. Non-blank text secrets are used
/// as-is; otherwise the binary payload must decode to UTF-8.
pub struct SecretsVaultSource {
    client: AwsJsonClient,
}

impl SecretsVaultSource {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }

    pub fn for_region(region: &str, credentials: Option<AwsCredentials>) -> Self {
        Self::new(AwsJsonClient::new(SECRETS_MANAGER, region, credentials))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueResponse {
    secret_string: Option<String>,
    secret_binary: Option<String>,
}

#[async_trait]
impl SecretSource for SecretsVaultSource {
    fn label(&self) -> &'static str {
        "secrets_vault"
    }

    async fn fetch(&self, name: &str) -> Result<SecretString, SecretSourceError> {
        let response: GetSecretValueResponse =
            self.client.call("GetSecretValue", &json!({"SecretId": name})).await?;

        if let Some(text) = response.secret_string.filter(|text| !text.trim().is_empty()) {
            return Ok(SecretString::from(text));
        }

        let encoded = response.secret_binary.ok_or_else(|| {
            SecretSourceError::Decode(format!("secret `{name}` has neither text nor binary value"))
        })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|error| SecretSourceError::Decode(format!("secret binary: {error}")))?;
        String::from_utf8(bytes)
            .map(SecretString::from)
            .map_err(|error| SecretSourceError::Decode(format!("secret binary: {error}")))
    }
}
