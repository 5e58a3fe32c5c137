pub mod catalog;
mod client;
mod collector;
mod query;
mod scheduler;
mod traits;

pub use catalog::{lookup, search_catalog, CatalogEntry, CATALOG};
pub use client::SteamClient;
pub use collector::{CollectionSummary, Collector};
pub use query::{GameSearchResult, PlayerCountPoint, QueryService, MAX_SEARCH_RESULTS};
pub use scheduler::Scheduler;
pub use traits::PlayerCountSource;
