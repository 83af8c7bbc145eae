//! Suggestion Gateway
//!
//! LLM-backed menu suggestions behind a strict polymorphic boundary:
//!
//! - [`TextModel`] is the single opaque model call ([`GeminiModel`] in
//!   production, scripted fakes in tests, or absent entirely).
//! - [`parse`] owns every markdown-stripping / JSON-extraction heuristic;
//!   nothing outside this module ever touches free-form model text.
//! - [`SuggestionService`] turns catalog/order context into typed
//!   [`Suggestion`]s with deterministic fallbacks.
//!
//! Contract with the rest of the system: nothing in here ever propagates
//! an error to its caller. A failed or missing model degrades to the
//! deterministic fallback (first N available items), and upstream
//! rate-limiting is logged at reduced severity.

pub mod gemini;
pub mod parse;
pub mod service;

pub use gemini::GeminiModel;
pub use service::SuggestionService;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Model request failed: {0}")]
    Http(String),

    #[error("Malformed model response: {0}")]
    Malformed(String),
}

pub type AiResult<T> = Result<T, AiError>;

/// The one opaque LLM call
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> AiResult<String>;
}

/// A ranked menu suggestion surfaced to the customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub food_id: String,
    pub name: String,
    pub reason: String,
    pub image: String,
    pub price: Decimal,
}
