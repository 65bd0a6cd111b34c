use crate::error::StoreError;
use crate::models::{
    FlightRecord, Listing, NormalizedListing, SnapshotRecord, FLIGHTS_TABLE, FLIGHT_KEY,
    SNAPSHOTS_TABLE,
};
use crate::normalize::Normalizer;
use crate::storage::DataStore;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Distinct flights touched by the batch
    pub flights: usize,
    pub snapshots: usize,
    /// Listings whose departure date could not be read
    pub skipped: usize,
    /// Listings rejected by the store
    pub failed: usize,
}

impl PersistReport {
    pub fn rows(&self) -> usize {
        self.flights + self.snapshots
    }
}

/// Writes normalized listings as a flight identity plus a point-in-time snapshot
pub struct Persister {
    store: Arc<dyn DataStore>,
}

impl Persister {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Upsert the flight on its natural key, then append a snapshot against
    /// the returned id. Returns the flight id.
    pub async fn persist(&self, listing: &NormalizedListing) -> Result<i64, StoreError> {
        let record = serde_json::to_value(FlightRecord::from(listing))?;
        let row = self.store.upsert(FLIGHTS_TABLE, record, &FLIGHT_KEY).await?;

        let flight_id = row
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| StoreError::MissingId(FLIGHTS_TABLE.to_string()))?;

        let snapshot = serde_json::to_value(SnapshotRecord::new(flight_id, listing))?;
        self.store.insert(SNAPSHOTS_TABLE, snapshot).await?;

        debug!(
            flight_id,
            "Saved {} -> {} on {}", listing.origin, listing.destination, listing.departure_date
        );
        Ok(flight_id)
    }

    /// Normalize and persist every listing. A record that cannot be parsed or
    /// stored is logged and the batch moves on.
    pub async fn persist_all(
        &self,
        listings: &[Listing],
        normalizer: &Normalizer,
    ) -> PersistReport {
        info!("💾 Saving {} listings...", listings.len());
        let mut report = PersistReport::default();
        let mut flights = HashSet::new();

        for listing in listings {
            let normalized = match normalizer.normalize(listing) {
                Ok(normalized) => normalized,
                Err(e) => {
                    warn!(
                        competitor = %listing.competitor,
                        "⚠️ Skipping {}: {}", listing.raw_route, e
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match self.persist(&normalized).await {
                Ok(flight_id) => {
                    flights.insert(flight_id);
                    report.snapshots += 1;
                }
                Err(e) => {
                    error!(
                        competitor = %listing.competitor,
                        "❌ Failed to save {} ({}): {}", listing.raw_route, listing.raw_date, e
                    );
                    report.failed += 1;
                }
            }
        }

        report.flights = flights.len();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Competitor, FlightStatus};
    use crate::storage::{Filter, MemoryStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn normalized() -> NormalizedListing {
        NormalizedListing {
            competitor: Competitor::K9Jets,
            origin: "London".to_string(),
            destination: "Dubai".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            departure_time: None,
            operator: "Gulfstream G5".to_string(),
            price: Some(Decimal::new(995_000, 2)),
            seats_available: Some(3),
            status: FlightStatus::Available,
        }
    }

    #[tokio::test]
    async fn test_second_run_adds_only_a_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let persister = Persister::new(store.clone());

        let first = persister.persist(&normalized()).await.unwrap();
        let second = persister.persist(&normalized()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.rows(FLIGHTS_TABLE).len(), 1);

        let snapshots = store.rows(SNAPSHOTS_TABLE);
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s["flight_id"] == json!(first)));
    }

    #[tokio::test]
    async fn test_operator_is_overwritten_by_later_scrape() {
        let store = Arc::new(MemoryStore::new());
        let persister = Persister::new(store.clone());

        persister.persist(&normalized()).await.unwrap();
        let mut later = normalized();
        later.operator = "Boeing 737".to_string();
        persister.persist(&later).await.unwrap();

        let flights = store.rows(FLIGHTS_TABLE);
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0]["operator"], json!("Boeing 737"));
    }

    #[tokio::test]
    async fn test_unparseable_date_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let persister = Persister::new(store.clone());

        let listings = vec![
            Listing::new(Competitor::BarkAir, "2026-02-14", "New York -> London"),
            Listing::new(Competitor::BarkAir, "sometime soon", "New York -> Paris"),
        ];
        let report = persister.persist_all(&listings, &Normalizer::new()).await;

        assert_eq!(report, PersistReport { flights: 1, snapshots: 1, skipped: 1, failed: 0 });
        assert_eq!(store.rows(FLIGHTS_TABLE).len(), 1);
    }

    /// Rejects every flight bound for one destination
    struct PickyStore {
        inner: MemoryStore,
        rejected: &'static str,
    }

    #[async_trait]
    impl DataStore for PickyStore {
        async fn upsert(
            &self,
            table: &str,
            record: Value,
            conflict_key: &[&str],
        ) -> Result<Value, StoreError> {
            if record["destination"] == json!(self.rejected) {
                return Err(StoreError::MissingId(table.to_string()));
            }
            self.inner.upsert(table, record, conflict_key).await
        }

        async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
            self.inner.insert(table, record).await
        }

        async fn select(&self, table: &str, filter: &Filter<'_>) -> Result<Vec<Value>, StoreError> {
            self.inner.select(table, filter).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_the_batch() {
        let store = Arc::new(PickyStore { inner: MemoryStore::new(), rejected: "Paris" });
        let persister = Persister::new(store.clone());

        let listings = vec![
            Listing::new(Competitor::BarkAir, "2026-02-14", "New York -> Paris"),
            Listing::new(Competitor::BarkAir, "2026-02-14", "New York -> London"),
        ];
        let report = persister.persist_all(&listings, &Normalizer::new()).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.snapshots, 1);
        let saved = store.select(FLIGHTS_TABLE, &[("destination", json!("London"))]).await.unwrap();
        assert_eq!(saved.len(), 1);
    }
}
