use super::{first_text, max_price, selector, text_of};
use crate::models::{Competitor, Listing};
use anyhow::Result;
use scraper::Html;
use tracing::debug;

const CARD: &str = ".flight_box";
const DETAILS: &str = ".flight_details";
const PRICE: &str = ".price-item--regular";
const SEATS: &str = ".flight-availability-info";
const SOLD_OUT_TAG: &str = ".sold-out-tag";

/// Bark only flies one aircraft type and never names an operator on the card
pub const OPERATOR: &str = "Gulfstream G5";

/// Flight cards on a filtered bookings page.
///
/// Bark cards carry no route text; the caller fills it in from the filter it
/// requested.
pub fn extract_listings(html: &str) -> Result<Vec<Listing>> {
    let document = Html::parse_document(html);
    let card_sel = selector(CARD)?;
    let details_sel = selector(DETAILS)?;
    let price_sel = selector(PRICE)?;
    let seats_sel = selector(SEATS)?;
    let sold_out_sel = selector(SOLD_OUT_TAG)?;

    let mut listings = Vec::new();

    for card in document.select(&card_sel) {
        let raw_date = card
            .select(&details_sel)
            .next()
            .and_then(|details| details.value().attr("data-flight-date"))
            .map(|date| date.trim().to_string())
            .filter(|date| !date.is_empty());

        let Some(raw_date) = raw_date else {
            debug!("Skipping Bark card without data-flight-date");
            continue;
        };

        let mut listing = Listing::new(Competitor::BarkAir, raw_date, String::new());
        listing.raw_price = max_price(card.select(&price_sel).map(text_of));
        listing.raw_seats = first_text(card, &seats_sel);
        listing.sold_out = card.select(&sold_out_sel).next().is_some();
        listing.operator = OPERATOR.to_string();

        listings.push(listing);
    }

    Ok(listings)
}
