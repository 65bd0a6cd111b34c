use super::traits::{DiscoveryStrategy, DiscoveryUnit, UnitContext};
use crate::models::{Competitor, Listing};
use crate::normalize::text::has_route_separator;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tracing::{info, warn};

pub const UNKNOWN_ROUTE: &str = "Unknown Route";

/// A strategy plus the result count at which later stages are skipped
pub struct Stage {
    pub strategy: Box<dyn DiscoveryStrategy>,
    pub min_results: usize,
}

impl Stage {
    pub fn new(strategy: impl DiscoveryStrategy + 'static, min_results: usize) -> Self {
        Self {
            strategy: Box::new(strategy),
            min_results,
        }
    }
}

/// Drives one marketplace's discovery strategies in order of preference.
///
/// Stages run until one returns at least its `min_results` listings. Every
/// stage that ran contributes to the batch, earlier stages first.
pub struct SourceAdapter {
    competitor: Competitor,
    stages: Vec<Stage>,
    retry: RetryPolicy,
    unit_delay: Duration,
}

impl SourceAdapter {
    pub fn new(competitor: Competitor, retry: RetryPolicy, unit_delay: Duration) -> Self {
        Self {
            competitor,
            stages: Vec::new(),
            retry,
            unit_delay,
        }
    }

    pub fn stage(mut self, strategy: impl DiscoveryStrategy + 'static, min_results: usize) -> Self {
        self.stages.push(Stage::new(strategy, min_results));
        self
    }

    pub fn competitor(&self) -> Competitor {
        self.competitor
    }

    pub async fn scrape(&self) -> Vec<Listing> {
        info!("✈️ Scraping {} ({} strategies)", self.competitor, self.stages.len());
        let mut batch = Vec::new();

        for (idx, stage) in self.stages.iter().enumerate() {
            let name = stage.strategy.name();
            let found = self.run_strategy(stage.strategy.as_ref()).await;
            let count = found.len();
            batch.extend(found);

            if count >= stage.min_results {
                info!("   ✅ {} returned {} listings", name, count);
                break;
            }
            if idx + 1 < self.stages.len() {
                info!(
                    "   → {} returned {} listings (wanted {}), falling back",
                    name, count, stage.min_results
                );
            }
        }

        info!("Found {} TOTAL {} listings.", batch.len(), self.competitor);
        batch
    }

    async fn run_strategy(&self, strategy: &dyn DiscoveryStrategy) -> Vec<Listing> {
        let name = strategy.name();
        let units = match self.retry.run(name, || strategy.discover()).await {
            Ok(units) => units,
            Err(e) => {
                warn!("⚠️ {} discovery failed: {:#}", name, e);
                return Vec::new();
            }
        };

        info!("   {}: {} units to scrape", name, units.len());
        let mut listings = Vec::new();

        for (idx, unit) in units.iter().enumerate() {
            if idx > 0 && !self.unit_delay.is_zero() {
                tokio::time::sleep(self.unit_delay).await;
            }

            let found = self.run_unit(strategy, unit).await;
            if found.is_empty() {
                info!("      [{}/{}] {}: no data", idx + 1, units.len(), unit.context.label);
            } else {
                info!(
                    "      [{}/{}] {}: {} flights",
                    idx + 1,
                    units.len(),
                    unit.context.label,
                    found.len()
                );
            }
            listings.extend(found);
        }

        listings
    }

    async fn run_unit(
        &self,
        strategy: &dyn DiscoveryStrategy,
        unit: &DiscoveryUnit,
    ) -> Vec<Listing> {
        let label = &unit.context.label;

        let html = match self.retry.run(label, || strategy.load(unit)).await {
            Ok(html) => html,
            Err(e) => {
                warn!("⚠️ Giving up on {}: {:#}", label, e);
                return Vec::new();
            }
        };

        let mut listings = match strategy.extract(&html) {
            Ok(listings) => listings,
            Err(e) => {
                warn!("⚠️ Could not extract {}: {:#}", label, e);
                return Vec::new();
            }
        };

        for listing in &mut listings {
            listing.raw_route = repair_route(&listing.raw_route, &unit.context);

            if listing.detail_url.is_some() {
                if let Err(e) = strategy.refine(listing).await {
                    // List-view values stay in place.
                    warn!("⚠️ Detail refinement failed for {}: {:#}", listing.raw_route, e);
                }
            }
        }

        listings
    }
}

/// Fill in what a card's route text leaves out, using what the unit searched for
pub fn repair_route(route: &str, context: &UnitContext) -> String {
    let route = route.trim();
    if route.is_empty() {
        return match (&context.origin, &context.destination) {
            (Some(origin), Some(destination)) => format!("{} -> {}", origin, destination),
            _ => UNKNOWN_ROUTE.to_string(),
        };
    }

    match &context.origin {
        Some(origin) if !has_route_separator(route) => format!("{} -> {}", origin, route),
        _ => route.to_string(),
    }
}
