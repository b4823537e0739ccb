//! LLM provider abstraction: chat completion and text embedding over an
//! OpenAI-compatible HTTP API.

pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use provider::LlmProvider;
