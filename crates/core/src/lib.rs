pub mod config;
pub mod credentials;
pub mod devices;
pub mod domain;
pub mod errors;

pub use credentials::{CredentialError, CredentialResolver, SecretSource, SecretSourceError};
pub use devices::DeviceStore;
pub use domain::conversation::{AssistantReply, ConversationTurn, DeviceAction, Role};
pub use domain::device::{DeviceKind, DeviceState, PowerStatus};
pub use errors::{ApplicationError, FailureKind};
