//! Pipeline tests against real containers in temporary directories

pub mod end_to_end;

use crate::constants;
use crate::source::InMemorySource;

/// Ledger with two customers, one row lacking SM and PO REF
pub fn sample_source() -> InMemorySource {
    InMemorySource::from_rows(
        &constants::REQUIRED_COLUMNS,
        &[
            vec![
                "Acme", "P1", "Jane", "1/15/2024", "PO-1", "100", "80", "", "5", "20", "EU",
            ],
            vec![
                "Globex", "P2", "", "2/3/2024", "", "", "", "50", "", "", "APAC",
            ],
            vec![
                "Acme", "P1", "Jane", "3/1/2024", "PO-2", "40", "", "30", "", "", "EU",
            ],
        ],
    )
}
