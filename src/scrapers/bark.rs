use super::adapter::SourceAdapter;
use super::traits::{BrowserStep, DiscoveryStrategy, DiscoveryUnit, HtmlSource, UnitContext};
use crate::browser::BrowserPage;
use crate::config::{timeouts, Config};
use crate::extract::bark;
use crate::fetch::HttpFetcher;
use crate::models::{Competitor, Listing};
use crate::retry::RetryPolicy;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::sleep;

const BOOKINGS_URL: &str = "https://air.bark.co/collections/bookings";
const CARD: &str = ".flight_box";

/// Cities Bark flies between; every ordered pair is a filter value
pub const CITIES: [&str; 10] = [
    "London",
    "New York",
    "Los Angeles",
    "Paris",
    "San Francisco",
    "Madrid",
    "Seattle",
    "Honolulu",
    "Lisbon",
    "Kailua-Kona",
];

/// Bark Air: route URLs over plain HTTP first, the same URLs in a browser as fallback
pub fn adapter(config: &Config, page: Option<Arc<dyn BrowserPage>>) -> Result<SourceAdapter> {
    let retry = RetryPolicy::new(config.max_attempts, 1000, 10_000);
    let mut adapter = SourceAdapter::new(Competitor::BarkAir, retry, config.request_delay)
        .stage(BarkRouteStrategy::new(PageLoader::Http(HttpFetcher::new()?)), 1);

    if let Some(page) = page {
        adapter = adapter.stage(BarkRouteStrategy::new(PageLoader::Browser(page)), 0);
    }

    Ok(adapter)
}

/// Filtered bookings URL for one origin/destination pair
pub fn route_url(origin: &str, destination: &str) -> String {
    let slug = format!("{}+To+{}", origin.replace(' ', "+"), destination.replace(' ', "+"));
    format!("{}?filter.v.option.location={}&sort_by=created-ascending", BOOKINGS_URL, slug)
}

pub enum PageLoader {
    Http(HttpFetcher),
    Browser(Arc<dyn BrowserPage>),
}

/// One unit per ordered city pair
pub struct BarkRouteStrategy {
    loader: PageLoader,
}

impl BarkRouteStrategy {
    pub fn new(loader: PageLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl DiscoveryStrategy for BarkRouteStrategy {
    fn name(&self) -> &'static str {
        match self.loader {
            PageLoader::Http(_) => "bark-http",
            PageLoader::Browser(_) => "bark-browser",
        }
    }

    async fn discover(&self) -> Result<Vec<DiscoveryUnit>> {
        let mut units = Vec::new();
        for origin in CITIES {
            for destination in CITIES.iter().filter(|d| **d != origin) {
                let url = route_url(origin, destination);
                let source = match self.loader {
                    PageLoader::Http(_) => HtmlSource::Get(url),
                    PageLoader::Browser(_) => HtmlSource::Browser(BrowserStep::Navigate(url)),
                };
                units.push(DiscoveryUnit {
                    context: UnitContext {
                        label: format!("{} -> {}", origin, destination),
                        origin: Some(origin.to_string()),
                        destination: Some(destination.to_string()),
                    },
                    source,
                });
            }
        }
        Ok(units)
    }

    async fn load(&self, unit: &DiscoveryUnit) -> Result<String> {
        match (&self.loader, &unit.source) {
            (PageLoader::Http(http), source) => source.fetch(http).await,
            (PageLoader::Browser(page), HtmlSource::Browser(BrowserStep::Navigate(url))) => {
                page.navigate(url, timeouts::NAVIGATION).await?;
                // Empty routes never render a card, so a miss here is not an error.
                page.wait_for(CARD, timeouts::ELEMENT_WAIT).await?;
                sleep(timeouts::SCROLL_SETTLE).await;
                page.content().await
            }
            (PageLoader::Browser(_), other) => bail!("bark-browser cannot load {:?}", other),
        }
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        bark::extract_listings(html)
    }
}
