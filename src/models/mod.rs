use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Charter marketplace a listing was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Competitor {
    #[serde(rename = "K9 Jets")]
    K9Jets,
    #[serde(rename = "Bark Air")]
    BarkAir,
}

impl Competitor {
    pub fn label(&self) -> &'static str {
        match self {
            Competitor::K9Jets => "K9 Jets",
            Competitor::BarkAir => "Bark Air",
        }
    }
}

impl fmt::Display for Competitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seat availability of a flight at scrape time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlightStatus {
    Available,
    #[serde(rename = "Sold Out")]
    SoldOut,
}

/// One scraped flight offer, before any value is parsed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub competitor: Competitor,
    pub raw_date: String,
    pub raw_route: String,
    pub raw_price: Option<String>,
    pub raw_seats: Option<String>,
    /// Explicit sold-out marker found in the markup, independent of the stock text.
    pub sold_out: bool,
    pub operator: String,
    pub raw_departure_time: Option<String>,
    pub detail_url: Option<String>,
}

impl Listing {
    pub fn new(
        competitor: Competitor,
        raw_date: impl Into<String>,
        raw_route: impl Into<String>,
    ) -> Self {
        Self {
            competitor,
            raw_date: raw_date.into(),
            raw_route: raw_route.into(),
            raw_price: None,
            raw_seats: None,
            sold_out: false,
            operator: UNKNOWN_OPERATOR.to_string(),
            raw_departure_time: None,
            detail_url: None,
        }
    }
}

pub const UNKNOWN_OPERATOR: &str = "Unknown";

/// A listing with every field parsed into its typed form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedListing {
    pub competitor: Competitor,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub operator: String,
    pub price: Option<Decimal>,
    pub seats_available: Option<u32>,
    pub status: FlightStatus,
}

/// Row of the `flights` table, keyed by (competitor, origin, destination, departure_date)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightRecord {
    pub competitor: Competitor,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub departure_time: Option<NaiveTime>,
    pub operator: String,
}

impl From<&NormalizedListing> for FlightRecord {
    fn from(listing: &NormalizedListing) -> Self {
        Self {
            competitor: listing.competitor,
            origin: listing.origin.clone(),
            destination: listing.destination.clone(),
            departure_date: listing.departure_date,
            departure_time: listing.departure_time,
            operator: listing.operator.clone(),
        }
    }
}

/// Row of the append-only `flight_snapshots` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRecord {
    pub flight_id: i64,
    pub price: Option<Decimal>,
    pub seats_available: Option<u32>,
    pub status: FlightStatus,
}

impl SnapshotRecord {
    pub fn new(flight_id: i64, listing: &NormalizedListing) -> Self {
        Self {
            flight_id,
            price: listing.price,
            seats_available: listing.seats_available,
            status: listing.status,
        }
    }
}

pub const FLIGHTS_TABLE: &str = "flights";
pub const SNAPSHOTS_TABLE: &str = "flight_snapshots";
pub const FLIGHT_KEY: [&str; 4] = ["competitor", "origin", "destination", "departure_date"];

/// TIME columns want `HH:MM:SS`
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
