//! Flight-listing scraper for private jet charter marketplaces that fly pets
//! in the cabin.
//!
//! Each run walks every marketplace once, normalizes what it finds and
//! records a flight row plus a price/availability snapshot per listing.

pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod persist;
pub mod retry;
pub mod scrapers;
pub mod storage;
