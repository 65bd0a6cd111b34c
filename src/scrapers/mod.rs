pub mod adapter;
pub mod bark;
pub mod k9;
pub mod traits;

pub use adapter::{repair_route, SourceAdapter, Stage};
pub use traits::{BrowserStep, DiscoveryStrategy, DiscoveryUnit, HtmlSource, UnitContext};
