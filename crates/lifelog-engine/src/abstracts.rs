//! Abstract generation and embedding for leaf blocks, with deterministic
//! fallbacks so indexing never fails because a provider misbehaved.

use lifelog_providers::{ChatModel, ChatRequest, Embedder};

use crate::text::clean_text;

/// Model label recorded for the hashing fallback embedding
pub const HASH_EMBED_MODEL: &str = "hash-256";
pub const HASH_EMBED_DIM: usize = 256;

const ABSTRACT_TARGET_WORDS: usize = 60;
const ABSTRACT_MAX_WORDS: usize = 100;

/// Produce a 30-100 word abstract of `text`. The LLM path is tried first;
/// any failure falls back to whitespace-normalized truncation.
pub async fn generate_abstract(chat: &dyn ChatModel, text: &str) -> String {
    let text = clean_text(text);
    if text.is_empty() {
        return String::new();
    }

    let request = ChatRequest::new(format!(
        "Summarize the following content into 30-100 words, focusing on the key activity context.\n\n{}",
        text
    ))
    .with_temperature(0.3)
    .with_max_tokens(120);

    match chat.complete(request).await {
        Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
        Ok(_) => fallback_abstract(&text),
        Err(e) => {
            tracing::debug!("abstract generation fell back: {}", e);
            fallback_abstract(&text)
        }
    }
}

/// Deterministic abstract: the first ~60 words of the normalized text.
/// Shorter source text passes through whole (up to 100 words).
pub fn fallback_abstract(text: &str) -> String {
    let text = clean_text(text);
    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
    if words.len() <= ABSTRACT_MAX_WORDS {
        return words.join(" ");
    }
    words[..ABSTRACT_TARGET_WORDS].join(" ")
}

/// Embed `text`, falling back to the deterministic hashing embedding when
/// the provider fails. Returns (vector, model label).
pub async fn embed_or_fallback(embedder: &dyn Embedder, text: &str) -> (Vec<f32>, String) {
    let text = clean_text(text);
    match embedder.embed(&text).await {
        Ok(vector) if !vector.is_empty() => (vector, embedder.model().to_string()),
        Ok(_) => (hashing_embedding(&text), HASH_EMBED_MODEL.to_string()),
        Err(e) => {
            tracing::debug!("embedding fell back to hashing: {}", e);
            (hashing_embedding(&text), HASH_EMBED_MODEL.to_string())
        }
    }
}

/// 256-dimension character-hashing embedding, normalized to unit L2.
/// Deterministic and dependency-free; good enough to keep retrieval
/// working offline.
pub fn hashing_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; HASH_EMBED_DIM];
    for (i, ch) in text.chars().take(2048).enumerate() {
        let idx = (ch as usize + i) % HASH_EMBED_DIM;
        vector[idx] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
