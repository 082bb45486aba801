//! Nature Talk server - hosts the voice skill over HTTP
//!
//! - **Bootstrap** (`bootstrap`) - Config, API key resolution, router wiring
//! - **Entry** (`entry`) - Blanket fault recovery around request dispatch
//! - **HTTP** (`http`) - Skill endpoint and health route
//! - **Secrets** (`secrets`, `aws`) - Parameter store and secrets vault sources

pub mod aws;
pub mod bootstrap;
pub mod entry;
pub mod health;
pub mod http;
pub mod secrets;
