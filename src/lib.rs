pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod oracle;
pub mod service;
pub mod store;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use error::AppError;
pub use oracle::{ChatCompletionOracle, ReasoningOracle};
pub use service::{MatchSettings, MatcherService};
pub use store::{CatalogStore, RfpStore};
