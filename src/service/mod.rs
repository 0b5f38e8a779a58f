pub mod candidates;
pub mod extraction;
pub mod matcher;
pub mod pricing;
pub mod tokenizer;

pub use candidates::{score_candidates, select_candidates};
pub use matcher::{resolve_verdict, MatchSettings, MatchStats, MatcherService};
pub use pricing::{enrich, enrich_all};
pub use tokenizer::tokenize;
