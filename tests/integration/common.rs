//! Shared fixtures: a miniature catalog site served by wiremock

use shelf_crawler::config::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A product page served by the mock site
#[derive(Debug, Clone, Copy)]
pub struct TestBook {
    pub slug: &'static str,
    pub title: &'static str,
    pub price: &'static str,
    pub rating: &'static str,
    pub stock: u32,
    pub category: &'static str,
}

impl TestBook {
    pub fn path(&self) -> String {
        format!("/catalogue/{}/index.html", self.slug)
    }

    pub fn url(&self, server: &MockServer) -> String {
        format!("{}{}", server.uri(), self.path())
    }

    pub fn html(&self) -> String {
        format!(
            r##"<html><body>
            <ul class="breadcrumb">
                <li><a href="/index.html">Home</a></li>
                <li><a href="/catalogue/category/books_1/index.html">Books</a></li>
                <li><a href="#">{category}</a></li>
                <li class="active">{title}</li>
            </ul>
            <div id="product_gallery"><img src="../../media/{slug}.jpg" alt="{title}"></div>
            <div class="product_main">
                <h1>{title}</h1>
                <p class="price_color">£{price}</p>
                <p class="instock availability">
                    In stock ({stock} available)
                </p>
                <p class="star-rating {rating}"><i class="icon-star"></i></p>
            </div>
            </body></html>"##,
            category = self.category,
            title = self.title,
            slug = self.slug,
            price = self.price,
            stock = self.stock,
            rating = self.rating,
        )
    }
}

pub const HIMALAYAS: TestBook = TestBook {
    slug: "its-only-the-himalayas_981",
    title: "It's Only the Himalayas",
    price: "45.17",
    rating: "Two",
    stock: 19,
    category: "Travel",
};

pub const FULL_MOON: TestBook = TestBook {
    slug: "full-moon-over-noahs-ark_811",
    title: "Full Moon over Noah's Ark",
    price: "49.43",
    rating: "Four",
    stock: 15,
    category: "Travel",
};

pub const SEE_AMERICA: TestBook = TestBook {
    slug: "see-america_732",
    title: "See America",
    price: "48.87",
    rating: "Three",
    stock: 14,
    category: "Travel",
};

pub const ATTIC: TestBook = TestBook {
    slug: "a-light-in-the-attic_1000",
    title: "A Light in the Attic",
    price: "51.77",
    rating: "Three",
    stock: 22,
    category: "Poetry",
};

pub const OLIO: TestBook = TestBook {
    slug: "olio_984",
    title: "Olio",
    price: "23.88",
    rating: "One",
    stock: 19,
    category: "Poetry",
};

pub const SHARP_OBJECTS: TestBook = TestBook {
    slug: "sharp-objects_997",
    title: "Sharp Objects",
    price: "47.82",
    rating: "Four",
    stock: 20,
    category: "Mystery",
};

/// Path of a category's first listing page
pub fn category_path(slug: &str) -> String {
    format!("/catalogue/category/books/{}/index.html", slug)
}

/// Serves the index page with a sidebar of `(name, slug)` categories
pub async fn mount_index(server: &MockServer, categories: &[(&str, &str)]) {
    let links: String = categories
        .iter()
        .map(|(name, slug)| {
            format!(
                r#"<li><a href="catalogue/category/books/{}/index.html">
                    {}
                </a></li>"#,
                slug, name
            )
        })
        .collect();

    let body = format!(
        r#"<html><body><div class="side_categories"><ul><li>
            <a href="catalogue/category/books_1/index.html">Books</a>
            <ul>{}</ul>
        </li></ul></div></body></html>"#,
        links
    );
    mount_page(server, "/", body).await;
}

/// Serves a listing page linking to `books`, optionally followed by `next`
pub async fn mount_listing(
    server: &MockServer,
    page_path: &str,
    books: &[TestBook],
    next: Option<&str>,
) {
    let pods: String = books
        .iter()
        .map(|book| {
            format!(
                r#"<li><article class="product_pod">
                    <h3><a href="{}" title="{}">{}</a></h3>
                </article></li>"#,
                book.path(),
                book.title,
                book.title
            )
        })
        .collect();

    let pager = next
        .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#, href))
        .unwrap_or_default();

    let body = format!(
        r#"<html><body><ol class="row">{}</ol>{}</body></html>"#,
        pods, pager
    );
    mount_page(server, page_path, body).await;
}

/// Serves every book's detail page
pub async fn mount_books(server: &MockServer, books: &[TestBook]) {
    for book in books {
        mount_page(server, &book.path(), book.html()).await;
    }
}

pub async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves the standard two-category site: Travel (3 books), Poetry (2 books)
pub async fn mount_catalog(server: &MockServer) {
    mount_index(server, &[("Travel", "travel_2"), ("Poetry", "poetry_23")]).await;
    mount_listing(
        server,
        &category_path("travel_2"),
        &[HIMALAYAS, FULL_MOON, SEE_AMERICA],
        None,
    )
    .await;
    mount_listing(server, &category_path("poetry_23"), &[ATTIC, OLIO], None).await;
    mount_books(server, &[HIMALAYAS, FULL_MOON, SEE_AMERICA, ATTIC, OLIO]).await;
}

/// Snapshot location inside a not yet existing subdirectory
pub fn snapshot_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data").join("books.csv")
}

/// Creates a configuration pointed at the mock server with no waiting
pub fn create_test_config(server: &MockServer, csv_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            delay_ms: 0,
            retries: 1,
            connection_retries: Some(1),
            connection_backoff_ms: 1,
            retry_backoff_ms: 1,
            request_timeout_secs: 5,
            limit: None,
            checkpoint_every: 100,
            progress_every: 20,
            category_cooldown_ms: 0,
            resume: false,
            verbose: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        source: SourceConfig {
            base_url: format!("{}/", server.uri()),
        },
        output: OutputConfig {
            csv_path: csv_path.display().to_string(),
            log_file: None,
        },
    }
}
