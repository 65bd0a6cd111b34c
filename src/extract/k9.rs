use super::{first_text, max_price, selector, strip_label, text_of};
use crate::models::{Competitor, Listing, UNKNOWN_OPERATOR};
use anyhow::Result;
use scraper::Html;
use tracing::debug;

const CARD: &str = r#"article[class*="elementor-post"]"#;
const TITLE: &str = r#"[class*="elementor-icon-box-title"]"#;
const DESCRIPTION: &str = r#"[class*="elementor-icon-box-description"]"#;
const PRICE: &str = r#"[class*="woocommerce-Price-amount"]"#;
const CARD_STOCK: &str = r#"[class*="stock"]"#;
const DETAIL_STOCK: &str = r#"p[class*="stock"]"#;
const HEADING: &str = r#"p[class*="elementor-heading-title"]"#;
const DETAIL_LINK: &str = r#"a[class*="elementor-button"][href*="/flight/"]"#;

pub const OPERATOR_LABEL: &str = "Operator:";
pub const DEPARTURE_TIME_LABEL: &str = "Departure Time:";

pub const ORIGIN_SELECT: &str = "pa_departure-location";
pub const DESTINATION_SELECT: &str = "pa_arrival-location";

/// One `<option>` of a route filter dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// Authoritative values read from a flight's product page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailRefinement {
    pub price: Option<String>,
    pub stock: Option<String>,
}

/// Every flight card on a routes page.
///
/// Cards without a date are skipped. The route is left empty when the card
/// has no description; the caller repairs it from what it searched for.
pub fn extract_listings(html: &str) -> Result<Vec<Listing>> {
    let document = Html::parse_document(html);
    let card_sel = selector(CARD)?;
    let title_sel = selector(TITLE)?;
    let description_sel = selector(DESCRIPTION)?;
    let price_sel = selector(PRICE)?;
    let stock_sel = selector(CARD_STOCK)?;
    let heading_sel = selector(HEADING)?;
    let link_sel = selector(DETAIL_LINK)?;

    let mut listings = Vec::new();

    for (idx, card) in document.select(&card_sel).enumerate() {
        let raw_date = match first_text(card, &title_sel) {
            Some(date) if !date.is_empty() => date,
            _ => {
                debug!("Skipping card {} without a date", idx);
                continue;
            }
        };

        let raw_route = first_text(card, &description_sel).unwrap_or_default();
        let mut listing = Listing::new(Competitor::K9Jets, raw_date, raw_route);

        listing.raw_price = max_price(card.select(&price_sel).map(text_of));
        listing.raw_seats = first_text(card, &stock_sel);

        for heading in card.select(&heading_sel).map(text_of) {
            if let Some(operator) = strip_label(&heading, OPERATOR_LABEL) {
                if listing.operator == UNKNOWN_OPERATOR && !operator.is_empty() {
                    listing.operator = operator.to_string();
                }
            } else if let Some(time) = strip_label(&heading, DEPARTURE_TIME_LABEL) {
                if listing.raw_departure_time.is_none() && !time.is_empty() {
                    listing.raw_departure_time = Some(time.to_string());
                }
            }
        }

        listing.detail_url = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string());

        debug!("Card {}: {} | {}", idx, listing.raw_date, listing.raw_route);
        listings.push(listing);
    }

    Ok(listings)
}

/// Price and stock text from a `/flight/` product page
pub fn extract_detail(html: &str) -> Result<DetailRefinement> {
    let document = Html::parse_document(html);
    let price_sel = selector(PRICE)?;
    let stock_sel = selector(DETAIL_STOCK)?;

    Ok(DetailRefinement {
        price: max_price(document.select(&price_sel).map(text_of)),
        stock: document.select(&stock_sel).next().map(text_of),
    })
}

/// Options of `<select name="...">`, minus empty values and "Flying from/to" placeholders
pub fn extract_filter_options(html: &str, select_name: &str) -> Result<Vec<FilterOption>> {
    let document = Html::parse_document(html);
    let option_sel = selector(&format!(r#"select[name="{}"] option"#, select_name))?;

    let options = document
        .select(&option_sel)
        .filter_map(|option| {
            let value = option.value().attr("value")?.trim().to_string();
            let label = text_of(option);
            Some(FilterOption { value, label })
        })
        .filter(|o| !o.value.is_empty() && !is_placeholder(&o.label))
        .collect();

    Ok(options)
}

fn is_placeholder(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("flying from") || lower.contains("flying to")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = include_str!("../../tests/fixtures/k9_routes.html");
    const DETAIL: &str = include_str!("../../tests/fixtures/k9_detail.html");

    #[test]
    fn test_cards_without_dates_are_skipped() {
        let listings = extract_listings(ROUTES).unwrap();
        assert_eq!(listings.len(), 2);
    }

    #[test]
    fn test_full_card() {
        let listings = extract_listings(ROUTES).unwrap();
        let card = &listings[0];

        assert_eq!(card.competitor, Competitor::K9Jets);
        assert_eq!(card.raw_date, "15th December 2025");
        assert_eq!(card.raw_route, "Teterboro, New Jersey to Dubai, UAE");
        assert_eq!(card.raw_price.as_deref(), Some("$12,500.00"));
        assert_eq!(card.raw_seats.as_deref(), Some("6 Seats Available"));
        assert_eq!(card.operator, "Pegasus Elite Aviation");
        assert_eq!(card.raw_departure_time.as_deref(), Some("2:00 PM"));
        assert_eq!(
            card.detail_url.as_deref(),
            Some("https://www.k9jets.com/flight/teterboro-dubai-2025-12-15/?ref=routes&v=2")
        );
    }

    #[test]
    fn test_sparse_card_defaults() {
        let listings = extract_listings(ROUTES).unwrap();
        let card = &listings[1];

        assert_eq!(card.raw_route, "Dubai, UAE");
        assert_eq!(card.raw_price, None);
        assert_eq!(card.raw_seats.as_deref(), Some("Sold Out"));
        assert_eq!(card.operator, "Unknown");
        assert_eq!(card.raw_departure_time, None);
        assert_eq!(card.detail_url, None);
    }

    #[test]
    fn test_detail_page_takes_highest_price() {
        let detail = extract_detail(DETAIL).unwrap();
        assert_eq!(detail.price.as_deref(), Some("$14,250.00"));
        assert_eq!(detail.stock.as_deref(), Some("2 Seats Available"));
    }

    #[test]
    fn test_detail_page_without_markup() {
        assert_eq!(
            extract_detail("<html><body>gone</body></html>").unwrap(),
            DetailRefinement::default()
        );
    }

    #[test]
    fn test_origin_options_drop_placeholders() {
        let origins = extract_filter_options(ROUTES, ORIGIN_SELECT).unwrap();
        assert_eq!(
            origins,
            vec![
                FilterOption {
                    value: "112".to_string(),
                    label: "Teterboro, New Jersey".to_string()
                },
                FilterOption { value: "118".to_string(), label: "London, UK".to_string() },
                FilterOption {
                    value: "131".to_string(),
                    label: "Van Nuys, California".to_string()
                },
            ]
        );
        assert!(extract_filter_options(ROUTES, DESTINATION_SELECT).unwrap().is_empty());
    }
}
