// ABOUTME: Confidence-gated answer selection for Aviary specialist agents
// ABOUTME: Samples candidates across temperatures and only surfaces grounded text

pub mod embed;
pub mod engine;
pub mod llm;

pub use embed::{cosine_similarity, max_similarity, EmbedError, Embedder, OpenAiEmbedder};
pub use engine::{
    unique_sources, AnchorConfig, AnchorEngine, AnchoredAnswer, Candidate, RetrievedDocument,
    DEFAULT_REFUSAL, DEFAULT_TEMPERATURES, DEFAULT_THRESHOLD,
};
pub use llm::{ChatMessage, ChatModel, LlmError, OpenAiChatModel};
