//! HTML parser for the catalog site
//!
//! This module extracts three things from fetched documents:
//! - A book record from a product detail page
//! - Product links and the "next" link from a category listing page
//! - Category links from the sidebar of the index page
//!
//! The selectors are tied to the site's fixed layout. Title, price and the
//! star-rating marker are structural anchors: when one is missing the page
//! is rejected with a [`ParseError`]. Every other field falls back to a
//! default instead.

use crate::ParseError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const TITLE: &str = ".product_main h1";
const PRICE: &str = ".product_main .price_color";
const RATING: &str = ".product_main p.star-rating";
const AVAILABILITY: &str = ".product_main .availability";
const BREADCRUMB: &str = "ul.breadcrumb li";
const IMAGE: &str = "#product_gallery img";
const PRODUCT_LINK: &str = "article.product_pod h3 a";
const NEXT_LINK: &str = "li.next a";
const CATEGORY_LINK: &str = ".side_categories ul li ul li a";

/// Category used when the breadcrumb is too short to name one
pub const UNKNOWN_CATEGORY: &str = "Unknown";

const RATING_WORDS: [(&str, u8); 5] = [("One", 1), ("Two", 2), ("Three", 3), ("Four", 4), ("Five", 5)];

/// Fields extracted from one product page, before an id is assigned
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBook {
    pub title: String,
    pub price: f64,
    pub rating: u8,
    pub availability: u32,
    pub category: String,
    pub image_url: String,
    pub detail_url: String,
}

/// Links found on one category listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Product detail pages, in document order
    pub product_urls: Vec<Url>,

    /// The following listing page; `None` on the last page
    pub next_page_url: Option<Url>,
}

/// A category link from the index sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub url: Url,
}

/// Parses a product detail page
///
/// # Defaults
///
/// | Field | Missing or unreadable |
/// |-------|-----------------------|
/// | price digits | `0.0` |
/// | rating word | `1` |
/// | availability | `0` |
/// | category | `"Unknown"` |
/// | image | empty string |
///
/// # Example
///
/// ```
/// use shelf_crawler::crawler::parse_detail;
/// use url::Url;
///
/// let html = r#"<div class="product_main"><h1>Sharp Objects</h1>
///     <p class="price_color">£47.82</p>
///     <p class="star-rating Four"></p></div>"#;
/// let url = Url::parse("https://example.com/catalogue/sharp-objects/index.html").unwrap();
/// let book = parse_detail(html, &url).unwrap();
/// assert_eq!(book.rating, 4);
/// assert_eq!(book.category, "Unknown");
/// ```
pub fn parse_detail(html: &str, source_url: &Url) -> Result<ParsedBook, ParseError> {
    let document = Html::parse_document(html);
    let url = source_url.as_str();

    let title = select_first(&document, TITLE)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ParseError::missing(url, "title"))?;

    let price_text = select_first(&document, PRICE)
        .map(|el| element_text(&el))
        .ok_or_else(|| ParseError::missing(url, "price"))?;
    let price = parse_price(&price_text);

    let rating_el =
        select_first(&document, RATING).ok_or_else(|| ParseError::missing(url, "star rating"))?;
    let rating = rating_from_classes(rating_el.value().classes());

    let availability = select_first(&document, AVAILABILITY)
        .and_then(|el| first_integer(&element_text(&el)))
        .unwrap_or(0);

    let category = extract_category(&document);

    let image_url = select_first(&document, IMAGE)
        .and_then(|el| el.value().attr("src"))
        .and_then(|src| source_url.join(src.trim()).ok())
        .map(|u| u.to_string())
        .unwrap_or_default();

    Ok(ParsedBook {
        title,
        price,
        rating,
        availability,
        category,
        image_url,
        detail_url: url.to_string(),
    })
}

/// Parses a category listing page
pub fn parse_listing(html: &str, source_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);

    let product_urls = select_all(&document, PRODUCT_LINK)
        .into_iter()
        .filter_map(|el| resolve_href(&el, source_url))
        .collect();

    let next_page_url =
        select_first(&document, NEXT_LINK).and_then(|el| resolve_href(&el, source_url));

    ListingPage {
        product_urls,
        next_page_url,
    }
}

/// Parses the category sidebar of the index page
pub fn parse_category_index(html: &str, base_url: &Url) -> Vec<Category> {
    let document = Html::parse_document(html);

    select_all(&document, CATEGORY_LINK)
        .into_iter()
        .filter_map(|el| {
            let url = resolve_href(&el, base_url)?;
            Some(Category {
                name: element_text(&el),
                url,
            })
        })
        .collect()
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Concatenated text of an element with runs of whitespace collapsed
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_href(element: &ElementRef<'_>, base_url: &Url) -> Option<Url> {
    let href = element.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    base_url.join(href).ok()
}

/// Second-to-last breadcrumb entry; the last one is the book itself
fn extract_category(document: &Html) -> String {
    let crumbs = select_all(document, BREADCRUMB);
    if crumbs.len() < 2 {
        return UNKNOWN_CATEGORY.to_string();
    }

    let name = element_text(&crumbs[crumbs.len() - 2]);
    if name.is_empty() {
        UNKNOWN_CATEGORY.to_string()
    } else {
        name
    }
}

fn rating_from_classes<'a>(mut classes: impl Iterator<Item = &'a str>) -> u8 {
    classes
        .find_map(|class| {
            RATING_WORDS
                .iter()
                .find(|(word, _)| *word == class)
                .map(|(_, value)| *value)
        })
        .unwrap_or(1)
}

/// Reads the first `digits[.digits]` token after turning commas into dots
fn parse_price(text: &str) -> f64 {
    let normalized = text.replace(',', ".");
    first_decimal_token(&normalized)
        .and_then(|token| token.parse().ok())
        .unwrap_or(0.0)
}

fn first_decimal_token(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;

    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    Some(&text[start..end])
}

fn first_integer(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
