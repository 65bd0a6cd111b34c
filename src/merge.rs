use crate::models::{Competitor, Listing};
use std::collections::HashMap;
use tracing::info;

/// Identity of a listing inside one run, before any parsing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub competitor: Competitor,
    pub route: String,
    pub date: String,
}

impl From<&Listing> for Signature {
    fn from(listing: &Listing) -> Self {
        Self {
            competitor: listing.competitor,
            route: listing.raw_route.clone(),
            date: listing.raw_date.clone(),
        }
    }
}

/// One listing per signature. Later listings replace earlier ones but keep
/// the position where the signature was first seen.
pub fn dedupe(listings: Vec<Listing>) -> Vec<Listing> {
    let total = listings.len();
    let mut positions: HashMap<Signature, usize> = HashMap::new();
    let mut unique: Vec<Listing> = Vec::with_capacity(total);

    for listing in listings {
        let signature = Signature::from(&listing);
        match positions.get(&signature) {
            Some(&idx) => unique[idx] = listing,
            None => {
                positions.insert(signature, unique.len());
                unique.push(listing);
            }
        }
    }

    info!("   📉 Deduplicated: removed {} duplicate entries", total - unique.len());
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(competitor: Competitor, date: &str, route: &str, price: &str) -> Listing {
        let mut listing = Listing::new(competitor, date, route);
        listing.raw_price = Some(price.to_string());
        listing
    }

    #[test]
    fn test_later_listing_wins() {
        let merged = dedupe(vec![
            listing(Competitor::K9Jets, "2025-12-15", "London -> Dubai", "$5,000"),
            listing(Competitor::K9Jets, "2025-12-15", "London -> Dubai", "$7,500"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].raw_price.as_deref(), Some("$7,500"));
    }

    #[test]
    fn test_first_position_is_kept() {
        let merged = dedupe(vec![
            listing(Competitor::K9Jets, "2025-12-15", "A -> B", "1"),
            listing(Competitor::K9Jets, "2025-12-16", "A -> B", "2"),
            listing(Competitor::K9Jets, "2025-12-15", "A -> B", "3"),
        ]);

        let prices: Vec<&str> = merged.iter().filter_map(|l| l.raw_price.as_deref()).collect();
        assert_eq!(prices, vec!["3", "2"]);
    }

    #[test]
    fn test_competitor_is_part_of_the_signature() {
        let merged = dedupe(vec![
            listing(Competitor::K9Jets, "2026-02-14", "New York -> London", "1"),
            listing(Competitor::BarkAir, "2026-02-14", "New York -> London", "2"),
        ]);
        assert_eq!(merged.len(), 2);
    }
}
