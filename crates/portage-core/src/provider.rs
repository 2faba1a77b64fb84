//! Provider creation trait.

use crate::Result;

/// Trait for creating a provider from parameters and credentials.
///
/// This trait bridges non-sensitive parameters (like a model name)
/// with sensitive credentials (like API keys) to construct
/// a fully configured provider instance.
#[async_trait::async_trait]
pub trait IntoProvider: Send {
    /// Non-sensitive parameters (model, endpoint, etc.).
    type Params: Send;
    /// Sensitive credentials (API keys, secrets, etc.).
    type Credentials: Send;

    /// Creates a new provider from parameters and credentials.
    async fn create(params: Self::Params, credentials: Self::Credentials) -> Result<Self>
    where
        Self: Sized;
}
