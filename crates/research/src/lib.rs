//! External research providers.
//!
//! Web search and LLM completion feed the enrichment pipeline; the
//! registry client answers company (CIN) and director (DIN) lookups.

pub mod config;
mod http;
pub mod llm;
pub mod registry;
pub mod search;
pub mod token_cache;

pub use config::{LlmConfig, RegistryConfig, SearchConfig};
pub use llm::{ChatCompletionsClient, ChatMessage, LlmClient};
pub use registry::RegistryClient;
pub use search::{SearchClient, SearchDepth, SearchHit, SearchResponse, TavilyClient};
pub use token_cache::TokenCache;
