pub mod formatting;

pub use formatting::{conv_datetime, conv_to_ms, format_day, format_iso, format_spaced};
