//! Web-based AI image captioner.
//!
//! Upload an image, then ask a hosted multimodal model for a caption and a
//! social media post. The [`orchestrator`] owns the request lifecycle; the
//! [`server`] exposes it to the single-page UI.

pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod orchestrator;
pub mod server;
pub mod state;

pub use client::{GeminiClient, GenerationClient};
pub use config::Config;
pub use orchestrator::{Orchestrator, Snapshot};
pub use state::{Phase, RequestKind, RequestState};
