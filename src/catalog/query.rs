use crate::catalog::Catalog;
use crate::output::BookRecord;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Column a listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Title,
    Price,
    Rating,
    Availability,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "price" => Ok(Self::Price),
            "rating" => Ok(Self::Rating),
            "availability" => Ok(Self::Availability),
            other => Err(format!("Unknown sort field: {}", other)),
        }
    }
}

impl SortField {
    /// Parses a field name, falling back to `Id` for anything unknown
    pub fn parse_or_id(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    fn compare(&self, a: &BookRecord, b: &BookRecord) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Title => a.title.cmp(&b.title),
            Self::Price => a.price.total_cmp(&b.price),
            Self::Rating => a.rating.cmp(&b.rating),
            Self::Availability => a.availability.cmp(&b.availability),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `"desc"` in any case means descending; everything else ascending
    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// Parameters for [`Catalog::list`]
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: usize,
    pub order_by: SortField,
    pub order: SortOrder,
    /// Exact category match
    pub category: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            order_by: SortField::Id,
            order: SortOrder::Asc,
            category: None,
        }
    }
}

/// Whole-catalog figures
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogOverview {
    pub total_books: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Books per rating, index 0 holding rating 1
    pub rating_distribution: [usize; 5],
}

/// Figures for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub category: String,
    pub count: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub average_rating: f64,
}

fn in_category(record: &BookRecord, category: Option<&str>) -> bool {
    category.map_or(true, |c| record.category == c)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Catalog {
    /// Records filtered by category and sorted, at most `query.limit` of them
    ///
    /// Ties keep snapshot order, so equal keys stay in discovery order.
    pub fn list(&self, query: &ListQuery) -> Vec<&BookRecord> {
        let mut rows: Vec<&BookRecord> = self
            .records()
            .iter()
            .filter(|r| in_category(r, query.category.as_deref()))
            .collect();

        rows.sort_by(|a, b| {
            let ordering = query.order_by.compare(a, b);
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        rows.truncate(query.limit);
        rows
    }

    /// Books rated at least `min_rating`, best first, cheaper first on ties
    pub fn top_rated(&self, limit: usize, min_rating: u8, category: Option<&str>) -> Vec<&BookRecord> {
        let mut rows: Vec<&BookRecord> = self
            .records()
            .iter()
            .filter(|r| r.rating >= min_rating && in_category(r, category))
            .collect();

        rows.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.price.total_cmp(&b.price))
        });
        rows.truncate(limit);
        rows
    }

    /// Books priced within `[min, max]`, cheapest first
    pub fn price_range(
        &self,
        min: f64,
        max: f64,
        limit: usize,
        category: Option<&str>,
    ) -> Vec<&BookRecord> {
        let mut rows: Vec<&BookRecord> = self
            .records()
            .iter()
            .filter(|r| r.price >= min && r.price <= max && in_category(r, category))
            .collect();

        rows.sort_by(|a, b| a.price.total_cmp(&b.price));
        rows.truncate(limit);
        rows
    }

    /// Case-insensitive title substring search, optionally within a category
    pub fn search(&self, title: Option<&str>, category: Option<&str>) -> Vec<&BookRecord> {
        let needle = title.map(str::to_lowercase);
        self.records()
            .iter()
            .filter(|r| {
                needle
                    .as_deref()
                    .map_or(true, |n| r.title.to_lowercase().contains(n))
            })
            .filter(|r| in_category(r, category))
            .collect()
    }

    pub fn overview(&self) -> CatalogOverview {
        let records = self.records();
        let mut rating_distribution = [0usize; 5];
        for record in records {
            if (1..=5).contains(&record.rating) {
                rating_distribution[(record.rating - 1) as usize] += 1;
            }
        }

        let prices = records.iter().map(|r| r.price);
        let (average_price, min_price, max_price) = if records.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = prices.clone().sum();
            (
                round2(sum / records.len() as f64),
                prices.clone().fold(f64::INFINITY, f64::min),
                prices.fold(f64::NEG_INFINITY, f64::max),
            )
        };

        CatalogOverview {
            total_books: records.len(),
            average_price,
            min_price,
            max_price,
            rating_distribution,
        }
    }

    /// Per-category figures, largest categories first, then by name
    pub fn category_stats(&self) -> Vec<CategoryStats> {
        let mut groups: BTreeMap<&str, Vec<&BookRecord>> = BTreeMap::new();
        for record in self.records() {
            groups.entry(record.category.as_str()).or_default().push(record);
        }

        let mut stats: Vec<CategoryStats> = groups
            .into_iter()
            .map(|(category, rows)| {
                let count = rows.len();
                let price_sum: f64 = rows.iter().map(|r| r.price).sum();
                let rating_sum: u64 = rows.iter().map(|r| u64::from(r.rating)).sum();
                CategoryStats {
                    category: category.to_string(),
                    count,
                    average_price: round2(price_sum / count as f64),
                    min_price: rows.iter().map(|r| r.price).fold(f64::INFINITY, f64::min),
                    max_price: rows.iter().map(|r| r.price).fold(f64::NEG_INFINITY, f64::max),
                    average_rating: round2(rating_sum as f64 / count as f64),
                }
            })
            .collect();

        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        stats
    }
}
