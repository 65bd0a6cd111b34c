use crate::models::FlightStatus;
use crate::normalize::text::parse_seat_count;

/// Availability from a card's stock text.
///
/// "sold out" anywhere (or an explicit sold-out marker) clears the seat count.
/// Missing or count-less stock text is reported as available with no count.
pub fn derive_status(
    stock_text: Option<&str>,
    sold_out_marker: bool,
) -> (FlightStatus, Option<u32>) {
    let text = stock_text.unwrap_or("");
    if sold_out_marker || text.to_lowercase().contains("sold out") {
        return (FlightStatus::SoldOut, None);
    }

    match parse_seat_count(text) {
        0 => (FlightStatus::Available, None),
        seats => (FlightStatus::Available, Some(seats)),
    }
}
