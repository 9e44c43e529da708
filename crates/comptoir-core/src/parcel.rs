//! # Parcel Tracking Types
//!
//! What the Colissimo integration returns, and how a search box query is
//! routed.
//!
//! ## Search Routing
//! ```text
//!   query (trimmed)
//!       │
//!       ├── empty                               → All
//!       ├── ≥ 10 chars, ASCII letters/digits    → TrackingNumber (vendor lookup, ≤ 1 result)
//!       └── anything else                       → Filter (local list, case-insensitive)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Minimum length for a query to be treated as a tracking number.
pub const TRACKING_QUERY_MIN_LEN: usize = 10;

/// Latest tracking event reported by the carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrackingEvent {
    /// Carrier event code (e.g. `LIVCFM` for delivered).
    pub code: String,
    /// Timestamp exactly as the carrier sent it.
    pub date: Option<String>,
    pub label: String,
    pub site: Option<String>,
}

/// Tracking status of one parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParcelStatus {
    pub tracking_number: String,
    pub event: Option<TrackingEvent>,
    pub recipient_city: Option<String>,
    pub recipient_zip_code: Option<String>,
    pub recipient_country_code: Option<String>,
}

impl ParcelStatus {
    /// A parcel known locally but not (yet) looked up.
    pub fn untracked(tracking_number: impl Into<String>) -> Self {
        ParcelStatus {
            tracking_number: tracking_number.into(),
            event: None,
            recipient_city: None,
            recipient_zip_code: None,
            recipient_country_code: None,
        }
    }

    /// Label of the latest event, if any.
    pub fn status_label(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.label.as_str())
    }

    /// Case-insensitive match on tracking number, city and status label.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let haystacks = [
            Some(self.tracking_number.as_str()),
            self.recipient_city.as_deref(),
            self.status_label(),
        ];

        haystacks
            .into_iter()
            .flatten()
            .any(|h| h.to_lowercase().contains(&needle))
    }
}

/// How a parcel search query is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelQuery {
    /// No query: list every known parcel.
    All,
    /// Direct lookup of one tracking number at the carrier.
    TrackingNumber(String),
    /// Substring filter over the locally known parcels.
    Filter(String),
}

impl ParcelQuery {
    pub fn parse(query: &str) -> Self {
        let query = query.trim();

        if query.is_empty() {
            ParcelQuery::All
        } else if query.len() >= TRACKING_QUERY_MIN_LEN
            && query.chars().all(|c| c.is_ascii_alphanumeric())
        {
            ParcelQuery::TrackingNumber(query.to_ascii_uppercase())
        } else {
            ParcelQuery::Filter(query.to_string())
        }
    }

    /// Applies a `Filter`/`All` query to a local list. A `TrackingNumber`
    /// query keeps only the exact parcel, so at most one result comes back.
    pub fn filter(&self, parcels: Vec<ParcelStatus>) -> Vec<ParcelStatus> {
        match self {
            ParcelQuery::All => parcels,
            ParcelQuery::Filter(needle) => parcels.into_iter().filter(|p| p.matches(needle)).collect(),
            ParcelQuery::TrackingNumber(number) => parcels
                .into_iter()
                .find(|p| p.tracking_number.eq_ignore_ascii_case(number))
                .into_iter()
                .collect(),
        }
    }
}
