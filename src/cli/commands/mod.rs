//! CLI command implementations.

mod ask;
mod config;
mod corpus;
mod index;
mod scrape;
mod search;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use corpus::run_corpus;
pub use index::run_index;
pub use scrape::run_scrape;
pub use search::run_search;
pub use serve::{router, run_serve};
