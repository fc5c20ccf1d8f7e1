pub mod feed;
pub mod preferences;
pub mod profile;
pub mod providers;
pub mod rate_gate;
pub mod recommendations;
pub mod title_search;

pub use feed::{FeedRegistry, FeedTicket};
pub use preferences::resolve_genres;
pub use profile::ProfileRepository;
pub use providers::{CatalogProvider, OmdbProvider};
pub use rate_gate::{interval_gates, GateFactory, IntervalGate, RateGate};
pub use recommendations::{PassOutcome, RecommendationAggregator, RecommendationResult};
