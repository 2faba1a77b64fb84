//! Completion providers backed by rig.

mod client;
mod credentials;
mod model;

pub use client::CompletionProvider;
pub use credentials::{ApiKeyCredentials, Credentials};
pub use model::{AnthropicModel, CompletionModel, OpenAiCompletionModel};
