//! Shared primitive types used across the projection crate.

/// A simulated day. Day 0 is the initial snapshot.
pub type Day = u64;

/// A region identifier (province name, cleaned of quotes and whitespace).
pub type RegionName = String;

/// The canonical run identifier used by the store.
pub type RunId = String;

/// Infection count added to a region on its onset day when its prior
/// count is zero. Growth cannot start multiplicatively from zero.
pub const ONSET_SEED: f64 = 5.0;

/// Longest projection accepted, one hundred years of days. Every day is
/// materialised, so the horizon bounds memory.
pub const MAX_HORIZON_DAYS: Day = 36_500;

/// Strip the quoting and trailing carriage returns that raw tabular
/// exports leave around cells.
pub fn clean_cell(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_cell_strips_quotes_and_carriage_return() {
        assert_eq!(clean_cell("\"Wien\""), "Wien");
        assert_eq!(clean_cell("\"2028399\"\r"), "2028399");
        assert_eq!(clean_cell("  Tirol "), "Tirol");
        assert_eq!(clean_cell(" \"Salzburg\" \r"), "Salzburg");
    }
}
