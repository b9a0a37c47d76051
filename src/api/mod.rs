//! API Module
//!
//! Wire types for the provider HTTP APIs the router talks to.

pub mod completion;
pub mod gemini;

pub use completion::{ChatCompletionRequest, ChatCompletionResponse, Choice, Message, Usage};
pub use gemini::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
