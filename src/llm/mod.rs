//! Text-reasoning client abstraction
//!
//! The logic auditor talks to a hosted chat model through [`LLMClient`], so the
//! pipeline can run against the genai-backed client in production and a
//! scripted [`MockLLMClient`] in tests.

mod client;
mod error;
mod genai;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
