//! Domain model for a downloadable pay statement.
//!
//! Decoupled from the portal's wire format (which lives next to the client);
//! each statement maps to exactly one local file named by its pay date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One downloadable pay statement, as listed by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayStatement {
    pub pay_date: NaiveDate,
    /// Fully resolved URL for the statement PDF
    pub document_url: String,
}

impl PayStatement {
    /// File name the statement is saved under: `YYYY-MM-DD.pdf`
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.pay_date.format("%Y-%m-%d"))
    }

    /// Year component of the pay date, used for year-folder lookups
    pub fn year(&self) -> String {
        self.pay_date.format("%Y").to_string()
    }
}
