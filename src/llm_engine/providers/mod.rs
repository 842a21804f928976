//! Completion provider implementations
//!
//! Each provider implements the CompletionProvider trait for a specific backend

pub mod openrouter_provider;

pub use openrouter_provider::{OpenRouterConfig, OpenRouterProvider};
