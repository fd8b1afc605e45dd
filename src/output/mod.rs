//! Output module for the CSV snapshot
//!
//! This module handles:
//! - The persisted record shape and its fixed column order
//! - Writing full snapshots (checkpoints and the final flush)
//! - Reading snapshots back for resume and for the catalog
//! - Printing catalog statistics

mod csv_snapshot;
pub mod stats;

pub use csv_snapshot::{
    read_snapshot, read_snapshot_if_exists, write_snapshot, write_snapshot_retaining,
    RetainReason, RetainedRow, SnapshotLoad,
};
pub use stats::{format_statistics, print_statistics};

use crate::crawler::ParsedBook;
use serde::{Deserialize, Serialize};

/// Column names of the snapshot, in file order
pub const CSV_HEADER: [&str; 8] = [
    "id",
    "title",
    "price",
    "rating",
    "availability",
    "category",
    "image_url",
    "product_page_url",
];

/// One scraped book as persisted in the snapshot
///
/// Field order is the column order; serde derives the header from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub rating: u8,
    pub availability: u32,
    pub category: String,
    pub image_url: String,
    #[serde(rename = "product_page_url")]
    pub detail_url: String,
}

impl BookRecord {
    pub fn from_parsed(id: u64, parsed: ParsedBook) -> Self {
        Self {
            id,
            title: parsed.title,
            price: parsed.price,
            rating: parsed.rating,
            availability: parsed.availability,
            category: parsed.category,
            image_url: parsed.image_url,
            detail_url: parsed.detail_url,
        }
    }
}
