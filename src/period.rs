//! Period filter: narrow a flight list to today, this calendar week, or all time.

use std::str::FromStr;

use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::Flight;

// ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    #[default]
    All,
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "today" => Ok(Period::Daily),
            "weekly" | "week" => Ok(Period::Weekly),
            "all" | "" => Ok(Period::All),
            other => Err(format!("unknown period '{other}'")),
        }
    }
}

/// Monday..=Sunday of the week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    // ---
    let offset = u64::from(today.weekday().number_from_monday() - 1);
    let monday = today - Days::new(offset);
    (monday, monday + Days::new(6))
}

/// Keep the flights that fall in `period` relative to the calendar date `today`.
pub fn filter_flights_by_period(flights: &[Flight], period: Period, today: NaiveDate) -> Vec<Flight> {
    // ---
    match period {
        Period::All => flights.to_vec(),
        Period::Daily => flights.iter().filter(|f| f.date == today).cloned().collect(),
        Period::Weekly => {
            let (monday, sunday) = week_bounds(today);
            flights
                .iter()
                .filter(|f| f.date >= monday && f.date <= sunday)
                .cloned()
                .collect()
        }
    }
}

/// Same as [`filter_flights_by_period`], relative to the local calendar date.
pub fn filter_flights_for_now(flights: &[Flight], period: Period) -> Vec<Flight> {
    filter_flights_by_period(flights, period, Local::now().date_naive())
}
