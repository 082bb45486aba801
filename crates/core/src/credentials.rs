//! API key resolution.
//!
//! The key is looked up in a fixed order: the process environment first,
//! then each configured remote [`SecretSource`] in registration order. A
//! failing remote source is logged and skipped. The first value found is
//! cached for the rest of the process lifetime.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential source yielded a value for `{env_var}`")]
    Missing { env_var: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretSourceError {
    #[error("secret source is not usable: {0}")]
    NotConfigured(String),
    #[error("secret request failed: {0}")]
    Transport(String),
    #[error("secret request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("secret payload could not be decoded: {0}")]
    Decode(String),
}

/// A remote store that can return a secret by name.
#[async_trait]
pub trait SecretSource: Send + Sync {
    fn label(&self) -> &'static str;
    async fn fetch(&self, name: &str) -> Result<SecretString, SecretSourceError>;
}

struct ChainedSource {
    name: String,
    source: Arc<dyn SecretSource>,
}

pub struct CredentialResolver {
    env_var: String,
    chain: Vec<ChainedSource>,
    cache: OnceCell<SecretString>,
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("env_var", &self.env_var)
            .field(
                "chain",
                &self.chain.iter().map(|entry| entry.source.label()).collect::<Vec<_>>(),
            )
            .field("resolved", &self.cache.initialized())
            .finish()
    }
}

impl CredentialResolver {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self { env_var: env_var.into(), chain: Vec::new(), cache: OnceCell::new() }
    }

    /// Appends a remote source queried for `name` when everything before it
    /// came up empty.
    pub fn with_source(mut self, name: impl Into<String>, source: Arc<dyn SecretSource>) -> Self {
        self.chain.push(ChainedSource { name: name.into(), source });
        self
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    pub fn is_resolved(&self) -> bool {
        self.cache.initialized()
    }

    pub async fn resolve(&self) -> Result<SecretString, CredentialError> {
        let secret = self.cache.get_or_try_init(|| self.lookup()).await?;
        Ok(secret.clone())
    }

    async fn lookup(&self) -> Result<SecretString, CredentialError> {
        if let Some(value) = read_env(&self.env_var) {
            return Ok(value);
        }

        for entry in &self.chain {
            match entry.source.fetch(&entry.name).await {
                Ok(secret) if !secret.expose_secret().trim().is_empty() => {
                    info!(
                        event_name = "credentials.source.resolved",
                        source = entry.source.label(),
                        name = %entry.name,
                        "credential fetched from remote source"
                    );
                    return Ok(secret);
                }
                Ok(_) => {
                    error!(
                        event_name = "credentials.source.failed",
                        source = entry.source.label(),
                        name = %entry.name,
                        error = "empty value",
                        "remote source returned an empty credential"
                    );
                }
                Err(source_error) => {
                    error!(
                        event_name = "credentials.source.failed",
                        source = entry.source.label(),
                        name = %entry.name,
                        error = %source_error,
                        "remote credential lookup failed; trying next source"
                    );
                }
            }
        }

        Err(CredentialError::Missing { env_var: self.env_var.clone() })
    }
}

fn read_env(key: &str) -> Option<SecretString> {
    env::var(key).ok().filter(|value| !value.trim().is_empty()).map(SecretString::from)
}
