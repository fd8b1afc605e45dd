//! Statistics rendering for a loaded catalog
//!
//! This module turns the aggregates computed by [`Catalog`] into the
//! report shown by `--stats`.

use crate::catalog::Catalog;
use std::fmt::Write;

/// Number of books listed in the "Top Rated" section
pub const TOP_RATED_SHOWN: usize = 5;

const LOADED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders the statistics report for `catalog`
///
/// The report has an overview, a per-category table and the best rated
/// books. An empty catalog renders the overview only.
pub fn format_statistics(catalog: &Catalog) -> String {
    let mut out = String::new();
    let overview = catalog.overview();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Catalog Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(
        out,
        "  Loaded at: {}",
        catalog.loaded_at().format(LOADED_AT_FORMAT)
    );
    let _ = writeln!(out, "  Total books: {}", overview.total_books);
    if catalog.skipped_rows() > 0 {
        let _ = writeln!(out, "  Unreadable rows skipped: {}", catalog.skipped_rows());
    }
    if overview.total_books == 0 {
        let _ = writeln!(out, "\nNo books in the snapshot yet.");
        return out;
    }
    let _ = writeln!(out, "  Average price: £{:.2}", overview.average_price);
    let _ = writeln!(
        out,
        "  Price range: £{:.2} - £{:.2}",
        overview.min_price, overview.max_price
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Rating Distribution:");
    for (index, count) in overview.rating_distribution.iter().enumerate().rev() {
        let percentage = (*count as f64 / overview.total_books as f64) * 100.0;
        let _ = writeln!(
            out,
            "  {} star{}: {} ({:.1}%)",
            index + 1,
            if index == 0 { "" } else { "s" },
            count,
            percentage
        );
    }
    let _ = writeln!(out);

    let categories = catalog.category_stats();
    let _ = writeln!(out, "Categories ({}):", categories.len());
    for stats in &categories {
        let _ = writeln!(
            out,
            "  {}: {} books, avg £{:.2} (£{:.2} - £{:.2}), avg rating {:.2}",
            stats.category,
            stats.count,
            stats.average_price,
            stats.min_price,
            stats.max_price,
            stats.average_rating
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Top Rated:");
    for book in catalog.top_rated(TOP_RATED_SHOWN, 1, None) {
        let _ = writeln!(
            out,
            "  [{}] {} ({}/5, £{:.2}, {})",
            book.id, book.title, book.rating, book.price, book.category
        );
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(catalog: &Catalog) {
    print!("{}", format_statistics(catalog));
}
