//! Configuration, prompt assembly and the interactive chat session.

pub mod chat;
pub mod config;
pub mod prompt;

pub use chat::ChatSession;
pub use config::Config;
pub use prompt::PromptBuilder;
