pub mod jwt;

use chrono::{Local, NaiveDate};

/// Local calendar date used for default settlement and entry dates.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
