//! LLM engine: completion backends and streamed-response parsing
//!
//! - provider.rs: CompletionProvider trait, request/response types, LlmError
//! - stream.rs: StreamIngestor turning an SSE body into text fragments
//! - providers/: OpenRouter implementation

pub mod provider;
pub mod stream;
pub mod providers;

pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, FragmentStream, LlmError,
    Message, MessageRole,
};
pub use providers::{OpenRouterConfig, OpenRouterProvider};
pub use stream::{extract_completion, extract_delta, ingest_stream, DeltaRule, StreamIngestor};
