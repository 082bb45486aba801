//! Voice Skill - request routing for the Nature Talk assistant
//!
//! This crate turns voice-platform requests into spoken responses:
//! - **Envelope** (`envelope`) - Inbound request shape, intent and slot access
//! - **Router** (`router`) - Ordered dispatch table with a catch-all route
//! - **Handlers** (`handlers`) - Launch, conversation, help, cancel/stop, session end
//! - **Response** (`response`) - SSML response builder and session attributes
//!
//! # Architecture
//!
//! ```text
//! RequestEnvelope → SkillRouter → RequestHandler → Assistant (LLM Gateway)
//!                                      ↓                ↓
//!                    ResponseEnvelope ←┘          DeviceStore
//! ```
//!
//! # Key Types
//!
//! - `SkillRouter` - First matching route wins; unmatched requests get a
//!   "not supported" answer instead of an error
//! - `ConversationHandler` - Shared by every intent that talks to the LLM
//! - `ResponseBuilder` - Asking a reprompt keeps the session open

pub mod envelope;
pub mod handlers;
pub mod messages;
pub mod response;
pub mod router;
pub mod session;

pub use envelope::{RequestEnvelope, RequestKind, SlotError};
pub use response::{ResponseBuilder, ResponseEnvelope};
pub use router::{
    default_router, DispatchError, EventContext, HandlerError, RequestHandler, RequestMatcher,
    SkillRouter,
};
