//! Result tables
//!
//! One generic controller drives both the whois and the IP-quality table:
//! - Normalizing raw collaborator records into flat, display-ready rows
//! - Stable sorting on any field
//! - Case-insensitive search plus a live/dead status filter
//! - Live/dead statistics over the full record set
//! - CSV export of the displayed view

pub mod controller;
pub mod export;
pub mod filter;
pub mod models;
pub mod record;
pub mod sort;
pub mod stats;

pub use controller::{TableController, TableState};
pub use export::{export_csv, write_csv, CsvStyle};
pub use filter::{filter_records, FilterState, StatusFilter};
pub use models::{QualityRecord, WhoisRecord};
pub use record::{Column, FieldValue, Record, StatusClass, StatusRule, TableSpec};
pub use sort::{sort_records, SortConfig, SortDirection};
pub use stats::{compute_stats, TableStats};
