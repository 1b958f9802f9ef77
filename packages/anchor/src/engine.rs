// ABOUTME: Anchoring engine: multi-temperature candidate generation and grounded selection
// ABOUTME: An answer is only surfaced when its similarity to the retrieved passages clears the threshold

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embed::{max_similarity, Embedder};
use crate::llm::{ChatMessage, ChatModel};

/// Similarity threshold below which a candidate is considered ungrounded.
pub const DEFAULT_THRESHOLD: f32 = 0.35;

/// Sampling temperatures, low to high diversity, tried in order.
pub const DEFAULT_TEMPERATURES: &[f32] = &[0.3, 0.6, 0.9];

/// Returned verbatim when no candidate clears the threshold. An ungrounded
/// answer is never surfaced, however fluent it looks.
pub const DEFAULT_REFUSAL: &str = "I could not find material on this topic in my reference library. Please consult a trusted source.";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an assistant that answers based on the provided context.
Follow these guidelines:
1) Read the user's question and the <RAG>context</RAG> carefully.
2) Answer using ONLY information from the context, no outside knowledge.
3) When the answer is not fully explicit, make cautious, well-grounded inferences from what the context contains, citing what the passages indicate and flagging uncertainty clearly.
4) Avoid claiming there is no information when the context holds partial mentions or related terms; synthesize the evidence into the best likely answer.
5) Only fall back to a missing-material statement when the context is empty or unrelated.
Your single source of truth is the text inside the <RAG></RAG> tags.
Answer succinctly and directly.";

/// A passage handed to the engine by the retrieval seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub text: String,
    /// Human-readable origin label used for the source attribution line.
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct AnchorConfig {
    pub temperatures: Vec<f32>,
    pub threshold: f32,
    pub refusal: String,
    pub system_prompt: String,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            temperatures: DEFAULT_TEMPERATURES.to_vec(),
            threshold: DEFAULT_THRESHOLD,
            refusal: DEFAULT_REFUSAL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// One generated answer and its grounding measurement.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub temperature: f32,
    pub score: f32,
    pub anchored: bool,
}

/// The engine's final verdict for one query.
#[derive(Debug, Clone, Serialize)]
pub struct AnchoredAnswer {
    pub text: String,
    pub anchored: bool,
    pub score: f32,
    pub temperature: Option<f32>,
}

/// Selects a trustworthy answer from multiple sampled candidates.
pub struct AnchorEngine {
    model: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    config: AnchorConfig,
}

impl AnchorEngine {
    pub fn new(model: Arc<dyn ChatModel>, embedder: Arc<dyn Embedder>, config: AnchorConfig) -> Self {
        Self {
            model,
            embedder,
            config,
        }
    }

    /// Generate one candidate per configured temperature, score each against
    /// the raw retrieved passages, and return the best anchored one, or the
    /// fixed refusal when none clears the threshold.
    ///
    /// `base_seed` varies per request; candidate i uses `base_seed + i` so
    /// same-temperature retries still differ. Selection is by score alone,
    /// never by generation order.
    pub async fn answer(
        &self,
        query: &str,
        documents: &[RetrievedDocument],
        base_seed: u64,
    ) -> AnchoredAnswer {
        let messages = vec![
            ChatMessage::system(&self.config.system_prompt),
            ChatMessage::system(format_context(documents)),
            ChatMessage::user(query),
        ];

        let mut generated: Vec<(String, f32)> = Vec::with_capacity(self.config.temperatures.len());
        for (index, &temperature) in self.config.temperatures.iter().enumerate() {
            let seed = base_seed.wrapping_add(index as u64);
            match self.model.complete(&messages, temperature, Some(seed)).await {
                Ok(text) => generated.push((text, temperature)),
                Err(e) => {
                    warn!("Candidate generation at temperature {temperature} failed, skipping: {e}");
                }
            }
        }

        let scores = self.score_candidates(&generated, documents).await;
        let candidates: Vec<Candidate> = generated
            .into_iter()
            .zip(scores)
            .map(|((text, temperature), score)| Candidate {
                text,
                temperature,
                score,
                anchored: score >= self.config.threshold,
            })
            .collect();

        for candidate in &candidates {
            info!(
                "Scored candidate: temperature={} similarity={:.4} anchored={}",
                candidate.temperature, candidate.score, candidate.anchored
            );
        }

        // Iterating in configured temperature order and replacing only on a
        // strictly higher score resolves ties toward the earliest temperature.
        let mut best: Option<&Candidate> = None;
        for candidate in &candidates {
            if !candidate.anchored {
                continue;
            }
            match best {
                Some(current) if candidate.score <= current.score => {}
                _ => best = Some(candidate),
            }
        }

        match best {
            Some(candidate) => {
                info!(
                    "Selected anchored candidate: temperature={} similarity={:.4}",
                    candidate.temperature, candidate.score
                );
                AnchoredAnswer {
                    text: attach_sources(&candidate.text, documents),
                    anchored: true,
                    score: candidate.score,
                    temperature: Some(candidate.temperature),
                }
            }
            None => {
                info!("No candidate cleared the anchoring threshold; returning refusal");
                AnchoredAnswer {
                    text: attach_sources(&self.config.refusal, documents),
                    anchored: false,
                    score: 0.0,
                    temperature: None,
                }
            }
        }
    }

    /// Max cosine similarity of each candidate against the raw documents.
    /// Any embedding failure degrades that scoring pass to 0.0 rather than
    /// failing the request; an unscorable candidate is an unanchored one.
    async fn score_candidates(
        &self,
        generated: &[(String, f32)],
        documents: &[RetrievedDocument],
    ) -> Vec<f32> {
        if generated.is_empty() || documents.is_empty() {
            return vec![0.0; generated.len()];
        }

        let document_texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let document_embeddings = match self.embedder.embed(&document_texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Failed to embed retrieved documents: {e}");
                return vec![0.0; generated.len()];
            }
        };

        let candidate_texts: Vec<String> = generated.iter().map(|(text, _)| text.clone()).collect();
        let candidate_embeddings = match self.embedder.embed(&candidate_texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Failed to embed candidates: {e}");
                return vec![0.0; generated.len()];
            }
        };

        candidate_embeddings
            .iter()
            .map(|embedding| max_similarity(embedding, &document_embeddings))
            .collect()
    }
}

/// Format retrieved passages into the context block the model is conditioned on.
pub fn format_context(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return "<RAG>No context found.</RAG>".to_string();
    }

    let mut context = String::from("<RAG> Retrieved context:\n");
    for document in documents {
        context.push_str("\n---\n");
        context.push_str(&document.text);
        context.push_str("\n---\n");
    }
    context.push_str("</RAG>");
    context
}

/// Deduplicated origin labels in first-seen order.
pub fn unique_sources(documents: &[RetrievedDocument]) -> Vec<String> {
    let mut labels = Vec::new();
    for document in documents {
        if document.source.is_empty() {
            continue;
        }
        if !labels.contains(&document.source) {
            labels.push(document.source.clone());
        }
    }
    labels
}

/// Append the human-readable source attribution line to the chosen text.
fn attach_sources(text: &str, documents: &[RetrievedDocument]) -> String {
    let labels = unique_sources(documents);
    if labels.is_empty() {
        format!("{text}\n\nSources: -")
    } else {
        format!("{text}\n\nSources: {}", labels.join(", "))
    }
}
