pub mod catalog;
pub mod csv_io;
pub mod rfp;

pub use catalog::CatalogStore;
pub use csv_io::{export_proposal_csv, parse_catalog_csv, CatalogCsvError};
pub use rfp::RfpStore;
