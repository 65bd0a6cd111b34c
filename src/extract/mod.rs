//! Pulls listing cards out of marketplace markup.
//!
//! Each marketplace module parses the document once with `scraper` and
//! queries it by class-name substrings, so small layout changes only touch
//! the selector constants.

pub mod bark;
pub mod k9;
pub mod status;

pub use status::derive_status;

use crate::normalize::{clean_text, parse_price};
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Selector};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {:?}: {:?}", css, e))
}

/// Visible text of an element, entity-decoded and whitespace-collapsed
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text of the first match under `scope`, if any
pub(crate) fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope.select(sel).next().map(text_of)
}

/// The price fragment with the highest numeric value.
///
/// Variant prices share one container, and the highest one is the fare the
/// detail page quotes.
pub(crate) fn max_price<I>(fragments: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    fragments
        .into_iter()
        .filter_map(|text| parse_price(&text).map(|value| (value, text)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, text)| text)
}

/// Value after a case-insensitive `label`, e.g. `Operator: X` -> `X`
pub(crate) fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(text[label.len()..].trim())
    } else {
        None
    }
}
