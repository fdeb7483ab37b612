// Engine layer - indexing, retrieval, taxonomy, tagging, cleanup.
// Sits between the store/providers and the runtime orchestrator.

mod error;

pub mod abstracts;
pub mod cleaner;
pub mod indexer;
pub mod matcher;
pub mod prompts;
pub mod retriever;
pub mod tagger;
pub mod taxonomy;
pub mod text;

pub use abstracts::{
    embed_or_fallback, fallback_abstract, generate_abstract, hashing_embedding, HASH_EMBED_DIM,
    HASH_EMBED_MODEL,
};
pub use cleaner::{
    fallback_analysis, CleanupAction, CleanupOptions, CleanupSummary, MergePlan, RemovalPlan,
    TagAnalysis, TagCleaner,
};
pub use error::{Error, Result};
pub use indexer::{IndexOutcome, IndexScope, Indexer};
pub use matcher::{ActivityMatcher, MatchedActivity, MatchingStats};
pub use retriever::{RetrievedContext, Retriever};
pub use tagger::{CascadeStage, Tagger, TaggerOutcome, REVIEW_THRESHOLD};
pub use taxonomy::{
    default_synonyms, default_taxonomy, frequency_fallback, strip_code_fences, TaxonomyBuilder,
    TaxonomyResources,
};
pub use text::{clean_text, content_words, cosine, similarity_ratio};
