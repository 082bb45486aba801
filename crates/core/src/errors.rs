use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::CredentialError;

/// Spoken when the LLM call itself fails (network, auth, rate limit).
pub const LLM_UNAVAILABLE_MESSAGE: &str = "申し訳ございません。エラーが発生しました。";
/// Spoken when the LLM answered but the reply could not be parsed.
pub const NOT_UNDERSTOOD_MESSAGE: &str =
    "すみません、うまく理解できませんでした。もう一度お願いします。";
/// Spoken for requests no handler claims.
pub const NOT_SUPPORTED_MESSAGE: &str = "すみません、そのリクエストにはまだ対応していません。";
/// Spoken when request handling faults outright.
pub const UNHANDLED_FAULT_MESSAGE: &str = "エラーが発生しました。もう一度お願いします。";

/// Every way a request can go wrong, and what the end user hears for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    CredentialMissing,
    CredentialSourceUnavailable,
    LlmTransport,
    LlmReplyMalformed,
    SlotExtraction,
    UnroutableRequest,
    UnhandledFault,
}

impl FailureKind {
    /// `None` for failures the user never hears about: they either stop the
    /// process before serving or are absorbed by a fallback path.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::CredentialMissing | Self::CredentialSourceUnavailable | Self::SlotExtraction => {
                None
            }
            Self::LlmTransport => Some(LLM_UNAVAILABLE_MESSAGE),
            Self::LlmReplyMalformed => Some(NOT_UNDERSTOOD_MESSAGE),
            Self::UnroutableRequest => Some(NOT_SUPPORTED_MESSAGE),
            Self::UnhandledFault => Some(UNHANDLED_FAULT_MESSAGE),
        }
    }

    pub fn keeps_session_open(&self) -> bool {
        !matches!(self, Self::UnroutableRequest | Self::UnhandledFault)
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "credential_missing",
            Self::CredentialSourceUnavailable => "credential_source_unavailable",
            Self::LlmTransport => "llm_transport_failure",
            Self::LlmReplyMalformed => "llm_reply_malformed",
            Self::SlotExtraction => "slot_extraction_failure",
            Self::UnroutableRequest => "unroutable_request",
            Self::UnhandledFault => "unhandled_fault",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("integration failure: {0}")]
    Integration(String),
}

impl ApplicationError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Credential(CredentialError::Missing { .. }) => FailureKind::CredentialMissing,
            Self::Configuration(_) | Self::Integration(_) => FailureKind::UnhandledFault,
        }
    }
}
