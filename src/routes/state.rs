use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    services::{
        rate_gate::{interval_gates, DETAIL_FETCH_INTERVAL},
        CatalogProvider, FeedRegistry, ProfileRepository, RecommendationAggregator,
    },
};

const CATALOG_UNAVAILABLE: &str =
    "OMDb API key not configured. Set OMDB_API_KEY to enable movie search and recommendations.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    catalog: Option<Arc<dyn CatalogProvider>>,
    aggregator: Option<Arc<RecommendationAggregator>>,
    pub profiles: ProfileRepository,
    pub feeds: Arc<FeedRegistry>,
}

impl AppState {
    /// Builds state around an optional catalog
    ///
    /// Without a usable catalog the service still serves profile endpoints;
    /// catalog-backed endpoints answer with a configuration error.
    pub fn new(
        catalog: Option<Arc<dyn CatalogProvider>>,
        profiles: ProfileRepository,
        recommendation_target: usize,
    ) -> Self {
        let aggregator = catalog.clone().and_then(|catalog| {
            match RecommendationAggregator::new(catalog, interval_gates(DETAIL_FETCH_INTERVAL)) {
                Ok(aggregator) => Some(Arc::new(aggregator.with_target_count(recommendation_target))),
                Err(e) => {
                    tracing::warn!(error = %e, "Recommendations disabled");
                    None
                }
            }
        });

        Self {
            catalog,
            aggregator,
            profiles,
            feeds: Arc::new(FeedRegistry::new()),
        }
    }

    /// Replaces the aggregator, e.g. with a seeded one
    pub fn with_aggregator(mut self, aggregator: RecommendationAggregator) -> Self {
        self.aggregator = Some(Arc::new(aggregator));
        self
    }

    pub fn catalog(&self) -> AppResult<&dyn CatalogProvider> {
        self.catalog
            .as_deref()
            .ok_or_else(|| AppError::Configuration(CATALOG_UNAVAILABLE.to_string()))
    }

    pub fn aggregator(&self) -> AppResult<&RecommendationAggregator> {
        self.aggregator
            .as_deref()
            .ok_or_else(|| AppError::Configuration(CATALOG_UNAVAILABLE.to_string()))
    }

    pub fn catalog_configured(&self) -> bool {
        self.aggregator.is_some()
    }
}
