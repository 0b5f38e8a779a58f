pub mod catalog;
pub mod line_item;
pub mod rfp;
pub mod verdict;

pub use catalog::{CandidateView, CatalogEntry};
pub use line_item::{LineItemRequest, ResolvedLineItem};
pub use rfp::{Proposal, RfpDetails, RfpRecord};
pub use verdict::MatchVerdict;
