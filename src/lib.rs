// Residential Console - Core Library
// House grouping and live feed aggregation for the CLI, API server, and tests

pub mod error;
pub mod config;
pub mod normalize;      // Text sanitizing for hand-typed identifiers
pub mod residents;      // Resident records + loaders
pub mod union_find;
pub mod grouping;       // House Grouping Engine
pub mod entities;       // Residential entities + registry
pub mod source;         // Backend seams: directory, live feeds, subscriptions
pub mod aggregator;     // Multi-source feed aggregation
pub mod memory;         // In-process backend
pub mod census;

// Re-export commonly used types
pub use error::{ConsoleError, ConsoleResult};
pub use config::{AggregatorConfig, ConsoleConfig, GroupingConfig};
pub use normalize::{address_key, normalize, sanitize};
pub use residents::{load_csv, load_json, load_residents, ResidentRecord};
pub use union_find::DisjointSet;
pub use grouping::{
    display_name, GroupingStrategy, HouseGroup, HouseGrouping, HouseGroupingEngine,
};
pub use entities::{Residential, ResidentialRegistry};
pub use source::{
    FeedItem, FeedSink, FeedSource, FeedUpdate, ResidentialDirectory, Subscription,
};
pub use aggregator::{AggregatedItem, Scope, SubscriptionAggregator, SubscriptionEntry};
pub use memory::{InMemoryDirectory, InMemoryFeedHub};
pub use census::{census_all, house_census, HouseCensus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the fmt subscriber used by the binaries (`RUST_LOG` overrides `info`)
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
