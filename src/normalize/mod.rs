pub mod airports;
pub mod dates;
pub mod text;

pub use airports::AirportMap;
pub use dates::{parse_departure_date, parse_departure_date_in, parse_departure_time};
pub use text::{clean_text, parse_price, parse_route, parse_seat_count};

use crate::error::ParseError;
use crate::extract::derive_status;
use crate::models::{Listing, NormalizedListing};
use tracing::{debug, warn};

/// Turns raw listings into typed ones
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    airports: Option<AirportMap>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite origin and destination to their canonical airport labels
    pub fn with_airports(airports: AirportMap) -> Self {
        Self { airports: Some(airports) }
    }

    /// Fails only when the departure date cannot be read; every other field
    /// falls back to an empty value.
    pub fn normalize(&self, listing: &Listing) -> Result<NormalizedListing, ParseError> {
        let departure_date = parse_departure_date(&listing.raw_date)?;

        let departure_time = listing
            .raw_departure_time
            .as_deref()
            .and_then(|raw| match parse_departure_time(raw) {
                Ok(time) => Some(time),
                Err(e) => {
                    warn!("⚠️ {}, dropping departure time", e);
                    None
                }
            });

        let (mut origin, mut destination) = parse_route(&listing.raw_route);
        if origin == destination {
            debug!("Route not splittable: {:?}", listing.raw_route);
        }
        if let Some(airports) = &self.airports {
            origin = airports.canonical(&origin);
            destination = airports.canonical(&destination);
        }

        let (status, seats_available) =
            derive_status(listing.raw_seats.as_deref(), listing.sold_out);

        Ok(NormalizedListing {
            competitor: listing.competitor,
            origin,
            destination,
            departure_date,
            departure_time,
            operator: listing.operator.clone(),
            price: listing.raw_price.as_deref().and_then(parse_price),
            seats_available,
            status,
        })
    }
}
