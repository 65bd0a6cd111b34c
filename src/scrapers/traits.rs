use crate::extract::k9::FilterOption;
use crate::fetch::HttpFetcher;
use crate::models::Listing;
use anyhow::{bail, Result};
use async_trait::async_trait;

/// What a discovery unit was looking for; used to repair incomplete routes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitContext {
    pub label: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl UnitContext {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Where the markup for one unit comes from
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlSource {
    /// Markup already in hand
    Document(String),
    Get(String),
    PostForm {
        url: String,
        form: Vec<(String, String)>,
    },
    /// Needs the live browser session
    Browser(BrowserStep),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserStep {
    Navigate(String),
    /// Apply an origin/destination filter pair on the routes page
    FilterPair {
        origin: FilterOption,
        destination: FilterOption,
    },
    /// Keep scrolling the routes page until no more cards load
    ScrollAll,
}

/// One independently retryable piece of a discovery run
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryUnit {
    pub context: UnitContext,
    pub source: HtmlSource,
}

impl HtmlSource {
    /// Resolve the sources that need nothing but HTTP
    pub async fn fetch(&self, http: &HttpFetcher) -> Result<String> {
        match self {
            HtmlSource::Document(html) => Ok(html.clone()),
            HtmlSource::Get(url) => http.get(url).await,
            HtmlSource::PostForm { url, form } => http.post_form(url, form).await,
            HtmlSource::Browser(step) => bail!("{:?} needs a browser session", step),
        }
    }
}

/// One way of enumerating and loading a marketplace's listing pages.
/// Several strategies for the same marketplace are ordered by a `SourceAdapter`.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Enumerate the units to scrape
    async fn discover(&self) -> Result<Vec<DiscoveryUnit>>;

    /// Produce the markup for one unit
    async fn load(&self, unit: &DiscoveryUnit) -> Result<String>;

    /// Listing cards in a unit's markup
    fn extract(&self, html: &str) -> Result<Vec<Listing>>;

    /// Replace list-view values with those from the listing's detail page
    async fn refine(&self, _listing: &mut Listing) -> Result<()> {
        Ok(())
    }
}
