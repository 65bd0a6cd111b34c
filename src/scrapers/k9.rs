use super::adapter::SourceAdapter;
use super::traits::{BrowserStep, DiscoveryStrategy, DiscoveryUnit, HtmlSource, UnitContext};
use crate::browser::BrowserPage;
use crate::config::{timeouts, Config};
use crate::extract::k9::{self, DetailRefinement, FilterOption, DESTINATION_SELECT, ORIGIN_SELECT};
use crate::fetch::HttpFetcher;
use crate::models::{Competitor, Listing};
use crate::retry::RetryPolicy;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const BASE_URL: &str = "https://www.k9jets.com";
const CARD: &str = "article.elementor-post";
const COOKIE_BANNER: &str = ".cmplz-accept, .cmplz-btn.cmplz-accept, #ucc-c-btn";
const SEARCH_BUTTON: &str = ".apply-filters__button";
const MAX_SCROLLS: usize = 50;
const STABLE_SCROLLS: usize = 3;

fn routes_url(base_url: &str) -> String {
    format!("{}/routes/", base_url)
}

/// K9 Jets, in order of preference: direct HTTP, browser filters, browser scroll.
/// Without a browser page only the HTTP stage is registered.
pub fn adapter(config: &Config, page: Option<Arc<dyn BrowserPage>>) -> Result<SourceAdapter> {
    let retry = RetryPolicy::new(config.max_attempts, 1000, 10_000);
    let mut adapter = SourceAdapter::new(Competitor::K9Jets, retry, config.request_delay)
        .stage(K9HttpStrategy::new(BASE_URL)?, 1);

    if let Some(page) = page {
        adapter = adapter
            .stage(
                K9AjaxStrategy::new(Arc::clone(&page), BASE_URL)?,
                config.k9_ajax_min_results,
            )
            .stage(K9ScrollStrategy::new(page, BASE_URL)?, 0);
    }

    Ok(adapter)
}

/// Posts the site's own filter form once per origin, then refines each
/// flight from its product page. No browser needed.
pub struct K9HttpStrategy {
    http: HttpFetcher,
    base_url: String,
}

impl K9HttpStrategy {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::with_referer(&routes_url(base_url))?,
            base_url: base_url.to_string(),
        })
    }
}

/// Form fields the JetSmartFilters plugin posts for an origin filter
pub fn origin_form(origin_id: &str) -> Vec<(String, String)> {
    vec![
        ("jsf".to_string(), "epro-posts/default".to_string()),
        ("_tax_query_pa_departure-location".to_string(), origin_id.to_string()),
        ("jet-smart-filters-redirect".to_string(), "1".to_string()),
    ]
}

/// Price and stock from a flight's product page
pub async fn fetch_detail(http: &HttpFetcher, url: &str) -> Result<DetailRefinement> {
    let html = http.get(url).await?;
    let detail = k9::extract_detail(&html)?;
    debug!("Detail {}: price={:?} stock={:?}", url, detail.price, detail.stock);
    Ok(detail)
}

/// Refine a card from its product page; cards without one are left alone.
/// Every K9 strategy yields the same cards, so they all refine this way.
async fn refine_listing(http: &HttpFetcher, listing: &mut Listing) -> Result<()> {
    let Some(url) = listing.detail_url.clone() else {
        return Ok(());
    };
    let detail = fetch_detail(http, &url).await?;
    apply_refinement(listing, detail);
    Ok(())
}

/// Overwrite list-view values with whatever the detail page provides
pub fn apply_refinement(listing: &mut Listing, detail: DetailRefinement) {
    if let Some(price) = detail.price {
        listing.raw_price = Some(price);
    }
    if let Some(stock) = detail.stock {
        listing.raw_seats = Some(stock);
        listing.sold_out = false;
    }
}

#[async_trait]
impl DiscoveryStrategy for K9HttpStrategy {
    fn name(&self) -> &'static str {
        "k9-http"
    }

    async fn discover(&self) -> Result<Vec<DiscoveryUnit>> {
        let url = routes_url(&self.base_url);
        let html = self.http.get(&url).await.context("Failed to load K9 routes page")?;
        let origins = k9::extract_filter_options(&html, ORIGIN_SELECT)?;

        if origins.is_empty() {
            warn!("⚠️ No origin options found in K9 routes HTML");
        }

        Ok(origins
            .into_iter()
            .map(|origin| DiscoveryUnit {
                context: UnitContext {
                    label: format!("{} (id={})", origin.label, origin.value),
                    origin: Some(origin.label),
                    destination: None,
                },
                source: HtmlSource::PostForm {
                    url: url.clone(),
                    form: origin_form(&origin.value),
                },
            })
            .collect())
    }

    async fn load(&self, unit: &DiscoveryUnit) -> Result<String> {
        unit.source.fetch(&self.http).await
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        k9::extract_listings(html)
    }

    async fn refine(&self, listing: &mut Listing) -> Result<()> {
        refine_listing(&self.http, listing).await
    }
}

/// Open the routes page and get the cookie banner out of the way
async fn open_routes(page: &dyn BrowserPage, base_url: &str) -> Result<()> {
    page.navigate(&routes_url(base_url), timeouts::NAVIGATION).await?;
    dismiss_cookie_banner(page).await;
    Ok(())
}

async fn dismiss_cookie_banner(page: &dyn BrowserPage) {
    match page.click(COOKIE_BANNER).await {
        Ok(true) => {
            info!("   🍪 Cookie banner dismissed");
            sleep(timeouts::BANNER_SETTLE).await;
        }
        Ok(false) => {}
        Err(e) => debug!("Cookie banner check failed: {:#}", e),
    }
}

/// Drives the origin/destination dropdowns in a real browser
pub struct K9AjaxStrategy {
    page: Arc<dyn BrowserPage>,
    http: HttpFetcher,
    base_url: String,
}

impl K9AjaxStrategy {
    pub fn new(page: Arc<dyn BrowserPage>, base_url: &str) -> Result<Self> {
        Ok(Self {
            page,
            http: HttpFetcher::with_referer(&routes_url(base_url))?,
            base_url: base_url.to_string(),
        })
    }

    async fn destinations_for(&self, origin: &FilterOption) -> Result<Vec<FilterOption>> {
        open_routes(self.page.as_ref(), &self.base_url).await?;
        sleep(timeouts::DROPDOWN_SETTLE).await;
        if !self.page.select_option(ORIGIN_SELECT, &origin.value).await? {
            bail!("Origin dropdown not found");
        }
        sleep(timeouts::AJAX_SETTLE).await;
        let html = self.page.content().await?;
        k9::extract_filter_options(&html, DESTINATION_SELECT)
    }
}

#[async_trait]
impl DiscoveryStrategy for K9AjaxStrategy {
    fn name(&self) -> &'static str {
        "k9-ajax"
    }

    async fn discover(&self) -> Result<Vec<DiscoveryUnit>> {
        open_routes(self.page.as_ref(), &self.base_url).await?;
        let option_sel = format!(r#"select[name="{}"] option"#, ORIGIN_SELECT);
        self.page.wait_for(&option_sel, timeouts::ELEMENT_WAIT).await?;
        sleep(timeouts::AJAX_SETTLE).await;

        let html = self.page.content().await?;
        let origins = k9::extract_filter_options(&html, ORIGIN_SELECT)?;
        let Some(first) = origins.first() else {
            warn!("⚠️ No origin options found");
            return Ok(Vec::new());
        };
        info!("   → Found {} origins to test", origins.len());

        // If the first origin never populates destinations, the filters are dead here.
        let first_destinations = self.destinations_for(first).await?;
        if first_destinations.is_empty() {
            warn!("⚠️ AJAX not populating destinations");
            return Ok(Vec::new());
        }

        let mut units = Vec::new();
        for (idx, origin) in origins.iter().enumerate() {
            let destinations = if idx == 0 {
                first_destinations.clone()
            } else {
                match self.destinations_for(origin).await {
                    Ok(destinations) => destinations,
                    Err(e) => {
                        warn!("⚠️ Could not read destinations for {}: {:#}", origin.label, e);
                        continue;
                    }
                }
            };

            units.extend(destinations.into_iter().map(|destination| DiscoveryUnit {
                context: UnitContext {
                    label: format!("{} → {}", origin.label, destination.label),
                    origin: Some(origin.label.clone()),
                    destination: Some(destination.label.clone()),
                },
                source: HtmlSource::Browser(BrowserStep::FilterPair {
                    origin: origin.clone(),
                    destination,
                }),
            }));
        }

        Ok(units)
    }

    async fn load(&self, unit: &DiscoveryUnit) -> Result<String> {
        let HtmlSource::Browser(BrowserStep::FilterPair {
            origin,
            destination,
        }) = &unit.source
        else {
            bail!("k9-ajax cannot load {:?}", unit.source);
        };

        let available = self.destinations_for(origin).await?;
        if !available.iter().any(|d| d.value == destination.value) {
            bail!("Destination {} not offered after selecting {}", destination.label, origin.label);
        }
        self.page.select_option(DESTINATION_SELECT, &destination.value).await?;
        sleep(timeouts::DROPDOWN_SETTLE).await;

        if !self.page.click(SEARCH_BUTTON).await? {
            bail!("Search button not found");
        }
        sleep(timeouts::AJAX_SETTLE).await;
        self.page.content().await
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        k9::extract_listings(html)
    }

    async fn refine(&self, listing: &mut Listing) -> Result<()> {
        refine_listing(&self.http, listing).await
    }
}

/// Loads every card the unfiltered routes page will show by scrolling
pub struct K9ScrollStrategy {
    page: Arc<dyn BrowserPage>,
    http: HttpFetcher,
    base_url: String,
}

impl K9ScrollStrategy {
    pub fn new(page: Arc<dyn BrowserPage>, base_url: &str) -> Result<Self> {
        Ok(Self {
            page,
            http: HttpFetcher::with_referer(&routes_url(base_url))?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl DiscoveryStrategy for K9ScrollStrategy {
    fn name(&self) -> &'static str {
        "k9-scroll"
    }

    async fn discover(&self) -> Result<Vec<DiscoveryUnit>> {
        Ok(vec![DiscoveryUnit {
            context: UnitContext::labeled("all routes (scroll)"),
            source: HtmlSource::Browser(BrowserStep::ScrollAll),
        }])
    }

    async fn load(&self, _unit: &DiscoveryUnit) -> Result<String> {
        open_routes(self.page.as_ref(), &self.base_url).await?;
        sleep(timeouts::DROPDOWN_SETTLE).await;

        let mut previous = 0;
        let mut unchanged = 0;
        for _ in 0..MAX_SCROLLS {
            let current = self.page.count(CARD).await?;

            self.page.scroll_to_bottom().await?;
            sleep(timeouts::SCROLL_SETTLE).await;
            self.page.scroll_by(-500).await?;
            sleep(timeouts::DROPDOWN_SETTLE).await;

            if current == previous {
                unchanged += 1;
                if unchanged >= STABLE_SCROLLS {
                    info!("      → Loaded {} flights total", current);
                    break;
                }
            } else {
                unchanged = 0;
            }
            previous = current;
        }

        self.page.content().await
    }

    fn extract(&self, html: &str) -> Result<Vec<Listing>> {
        k9::extract_listings(html)
    }

    async fn refine(&self, listing: &mut Listing) -> Result<()> {
        refine_listing(&self.http, listing).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const ROUTES: &str = include_str!("../../tests/fixtures/k9_routes.html");
    const DETAIL: &str = include_str!("../../tests/fixtures/k9_detail.html");

    #[test]
    fn test_origin_form() {
        let form = origin_form("112");
        assert_eq!(form[0], ("jsf".to_string(), "epro-posts/default".to_string()));
        assert_eq!(form[1], ("_tax_query_pa_departure-location".to_string(), "112".to_string()));
        assert_eq!(form[2], ("jet-smart-filters-redirect".to_string(), "1".to_string()));
    }

    #[test]
    fn test_refinement_overrides_list_values() {
        let mut listing = Listing::new(Competitor::K9Jets, "2025-12-15", "A -> B");
        listing.raw_price = Some("$4,950.00".to_string());
        listing.raw_seats = Some("Sold Out".to_string());

        apply_refinement(
            &mut listing,
            DetailRefinement {
                price: Some("$14,250.00".to_string()),
                stock: Some("2 Seats Available".to_string()),
            },
        );
        assert_eq!(listing.raw_price.as_deref(), Some("$14,250.00"));
        assert_eq!(listing.raw_seats.as_deref(), Some("2 Seats Available"));

        apply_refinement(&mut listing, DetailRefinement::default());
        assert_eq!(listing.raw_price.as_deref(), Some("$14,250.00"));
    }

    /// Page whose card count grows for a few scrolls and then stops
    struct GrowingPage {
        counts: Mutex<Vec<u64>>,
        scripts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BrowserPage for GrowingPage {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Option<Value>> {
            self.scripts.lock().unwrap().push(script.to_string());
            if script.contains("querySelectorAll") {
                let mut counts = self.counts.lock().unwrap();
                let next = if counts.len() > 1 { counts.remove(0) } else { counts[0] };
                return Ok(Some(Value::from(next)));
            }
            Ok(Some(Value::Bool(false)))
        }

        async fn wait_for(&self, _selector: &str, _timeout: Duration) -> Result<bool> {
            Ok(true)
        }

        async fn content(&self) -> Result<String> {
            Ok(ROUTES.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_stops_once_count_is_stable() {
        let page = Arc::new(GrowingPage {
            counts: Mutex::new(vec![10, 20, 30, 30]),
            scripts: Mutex::new(Vec::new()),
        });
        let strategy = K9ScrollStrategy::new(page.clone(), BASE_URL).unwrap();

        let units = strategy.discover().await.unwrap();
        let html = strategy.load(&units[0]).await.unwrap();
        assert_eq!(strategy.extract(&html).unwrap().len(), 2);

        let count_calls = page
            .scripts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.contains("querySelectorAll"))
            .count();
        // 10, 20, 30 then three unchanged readings of 30
        assert_eq!(count_calls, 6);
    }

    /// Routes page whose destination dropdown follows the selected origin
    struct FilterPage {
        destinations: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
        selected: Mutex<Vec<String>>,
    }

    impl FilterPage {
        fn new(destinations: Vec<(&'static str, Vec<(&'static str, &'static str)>)>) -> Self {
            Self {
                destinations: destinations.into_iter().collect(),
                selected: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BrowserPage for FilterPage {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Option<Value>> {
            if script.contains(ORIGIN_SELECT) && script.contains("dispatchEvent") {
                let value = script
                    .split("s.value = ")
                    .nth(1)
                    .and_then(|rest| rest.split(';').next())
                    .and_then(|quoted| serde_json::from_str::<String>(quoted).ok())
                    .unwrap_or_default();
                self.selected.lock().unwrap().push(value);
                return Ok(Some(Value::Bool(true)));
            }
            Ok(Some(Value::Bool(false)))
        }

        async fn wait_for(&self, _selector: &str, _timeout: Duration) -> Result<bool> {
            Ok(true)
        }

        async fn content(&self) -> Result<String> {
            let selected = self.selected.lock().unwrap().last().cloned().unwrap_or_default();
            let options: String = self
                .destinations
                .get(selected.as_str())
                .into_iter()
                .flatten()
                .map(|(value, label)| format!(r#"<option value="{}">{}</option>"#, value, label))
                .collect();
            Ok(format!(
                r#"<select name="{}">
                     <option value="">Flying from...</option>
                     <option value="112">Teterboro, New Jersey</option>
                     <option value="118">London, UK</option>
                     <option value="131">Van Nuys, California</option>
                   </select>
                   <select name="{}"><option value="">Flying to...</option>{}</select>"#,
                ORIGIN_SELECT, DESTINATION_SELECT, options
            ))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ajax_units_cover_every_origin_destination_pair() {
        let page = Arc::new(FilterPage::new(vec![
            ("112", vec![("201", "Dubai, UAE"), ("202", "London, UK")]),
            ("118", vec![("203", "New York, USA")]),
        ]));
        let strategy = K9AjaxStrategy::new(page.clone(), BASE_URL).unwrap();

        let units = strategy.discover().await.unwrap();

        let labels: Vec<&str> = units.iter().map(|u| u.context.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Teterboro, New Jersey → Dubai, UAE",
                "Teterboro, New Jersey → London, UK",
                "London, UK → New York, USA",
            ]
        );
        // The first origin is selected once: its destinations are reused.
        assert_eq!(*page.selected.lock().unwrap(), vec!["112", "118", "131"]);
        assert_eq!(units[2].context.origin.as_deref(), Some("London, UK"));
        assert_eq!(units[2].context.destination.as_deref(), Some("New York, USA"));
        assert!(matches!(
            &units[2].source,
            HtmlSource::Browser(BrowserStep::FilterPair { origin, destination })
                if origin.value == "118" && destination.value == "203"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ajax_yields_nothing_when_first_origin_has_no_destinations() {
        let page = Arc::new(FilterPage::new(vec![("118", vec![("203", "New York, USA")])]));
        let strategy = K9AjaxStrategy::new(page.clone(), BASE_URL).unwrap();

        let units = strategy.discover().await.unwrap();

        assert!(units.is_empty());
        assert_eq!(*page.selected.lock().unwrap(), vec!["112"]);
    }

    /// Answers every request with the saved product page
    async fn serve_detail_page() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    DETAIL.len(),
                    DETAIL
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}/flight/teterboro-dubai-2025-12-15/", addr)
    }

    #[tokio::test]
    async fn test_every_strategy_refines_from_the_detail_page() {
        let url = serve_detail_page().await;
        let page: Arc<dyn BrowserPage> = Arc::new(FilterPage::new(Vec::new()));
        let strategies: Vec<Box<dyn DiscoveryStrategy>> = vec![
            Box::new(K9HttpStrategy::new(BASE_URL).unwrap()),
            Box::new(K9AjaxStrategy::new(Arc::clone(&page), BASE_URL).unwrap()),
            Box::new(K9ScrollStrategy::new(page, BASE_URL).unwrap()),
        ];

        for strategy in strategies {
            let mut listing = k9::extract_listings(ROUTES).unwrap().remove(0);
            assert_eq!(listing.raw_price.as_deref(), Some("$12,500.00"));
            listing.detail_url = Some(url.clone());

            strategy.refine(&mut listing).await.unwrap();

            assert_eq!(listing.raw_price.as_deref(), Some("$14,250.00"), "{}", strategy.name());
            assert_eq!(
                listing.raw_seats.as_deref(),
                Some("2 Seats Available"),
                "{}",
                strategy.name()
            );
        }
    }
}
