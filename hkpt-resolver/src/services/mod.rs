//! Resolution services
//!
//! Leaves first: suffix rules and similarity scoring, then the oracle
//! client and AI layer, then the waterfall that sequences them.

pub mod ai_fallback;
pub mod embedding;
pub mod fuzzy_matcher;
pub mod grok_client;
pub mod oracle;
pub mod prompts;
pub mod property_translator;
pub mod response_parser;
pub mod suffix_translator;

pub use ai_fallback::{synthetic_fallback, AiFailure, AiFallback, RetryPolicy, SearchSettings};
pub use embedding::{Embedder, EmbeddingCache, EmbeddingError, HttpEmbedder};
pub use fuzzy_matcher::{FuzzyMatch, FuzzyMatcher, PreparedQuery, SimilarityBackend};
pub use grok_client::GrokClient;
pub use oracle::{OracleError, OracleReply, OracleRequest, SearchConfig, TranslationOracle};
pub use property_translator::{is_already_translated, PropertyTranslator};
pub use response_parser::{parse_response, NormalizedReply, OracleResponse};
pub use suffix_translator::translate_suffix;
