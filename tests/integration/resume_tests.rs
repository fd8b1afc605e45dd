//! Integration tests for checkpoints and resumed runs

use crate::common::*;
use shelf_crawler::crawler::Coordinator;
use shelf_crawler::output::{read_snapshot, write_snapshot, BookRecord, CSV_HEADER};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn existing_record(id: u64, detail_url: String) -> BookRecord {
    BookRecord {
        id,
        title: format!("Existing {}", id),
        price: 10.0,
        rating: 5,
        availability: 1,
        category: "Classics".to_string(),
        image_url: String::new(),
        detail_url,
    }
}

#[tokio::test]
async fn test_resume_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let csv_path = snapshot_path(&dir);
    let config = create_test_config(&mock_server, &csv_path);
    Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    let first_run = std::fs::read_to_string(&csv_path).unwrap();

    // Second run sees the same listings but must not touch a product page
    mock_server.reset().await;
    mount_index(&mock_server, &[("Travel", "travel_2"), ("Poetry", "poetry_23")]).await;
    mount_listing(
        &mock_server,
        &category_path("travel_2"),
        &[HIMALAYAS, FULL_MOON, SEE_AMERICA],
        None,
    )
    .await;
    mount_listing(&mock_server, &category_path("poetry_23"), &[ATTIC, OLIO], None).await;

    let mut config = config;
    config.crawler.resume = true;
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.successes, 0);
    assert_eq!(report.failures, 0);
    assert_eq!(report.total_records, 5);
    assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), first_run);

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.path().starts_with("/catalogue/") || r.url.path().contains("/category/")));
}

#[tokio::test]
async fn test_resume_continues_after_highest_id() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, &[("Travel", "travel_2"), ("Poetry", "poetry_23")]).await;
    mount_listing(
        &mock_server,
        &category_path("travel_2"),
        &[HIMALAYAS, FULL_MOON, SEE_AMERICA],
        None,
    )
    .await;
    mount_listing(&mock_server, &category_path("poetry_23"), &[ATTIC, OLIO], None).await;
    mount_books(&mock_server, &[FULL_MOON, SEE_AMERICA, ATTIC, OLIO]).await;

    Mock::given(method("GET"))
        .and(path(HIMALAYAS.path()))
        .respond_with(ResponseTemplate::new(200).set_body_string(HIMALAYAS.html()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv_path = snapshot_path(&dir);
    write_snapshot(
        &csv_path,
        &[
            existing_record(3, "https://elsewhere.example/book".to_string()),
            existing_record(7, HIMALAYAS.url(&mock_server)),
        ],
    )
    .unwrap();

    let mut config = create_test_config(&mock_server, &csv_path);
    config.crawler.resume = true;
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.successes, 4);
    assert_eq!(report.total_records, 6);

    let records = read_snapshot(&csv_path).unwrap().records;
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 7, 8, 9, 10, 11]);
    assert_eq!(records[1].title, "Existing 7");
    assert_eq!(records[2].title, "Full Moon over Noah's Ark");
}

#[tokio::test]
async fn test_resume_keeps_unreadable_rows() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let csv_path = snapshot_path(&dir);
    let hand_edited = "2,Hand edited,N/A,4,3,Travel,,https://elsewhere.example/b2";
    std::fs::create_dir_all(csv_path.parent().unwrap()).unwrap();
    std::fs::write(
        &csv_path,
        format!(
            "{}\n1,Existing,10.0,5,1,Classics,,https://elsewhere.example/b1\n{}\n",
            CSV_HEADER.join(","),
            hand_edited
        ),
    )
    .unwrap();

    let mut config = create_test_config(&mock_server, &csv_path);
    config.crawler.resume = true;
    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.successes, 5);

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[2], hand_edited);

    let snapshot = read_snapshot(&csv_path).unwrap();
    let ids: Vec<u64> = snapshot.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 4, 5, 6, 7]);
    assert_eq!(snapshot.retained.len(), 1);
    assert_eq!(snapshot.retained[0].id, Some(2));
}

#[tokio::test]
async fn test_fresh_run_replaces_snapshot() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let csv_path = snapshot_path(&dir);
    write_snapshot(&csv_path, &[existing_record(40, HIMALAYAS.url(&mock_server))]).unwrap();

    let config = create_test_config(&mock_server, &csv_path);
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.successes, 5);
    let records = read_snapshot(&csv_path).unwrap().records;
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].title, "It's Only the Himalayas");
}

#[tokio::test]
async fn test_resume_from_unreadable_snapshot_starts_empty() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let csv_path = snapshot_path(&dir);
    std::fs::create_dir_all(csv_path.parent().unwrap()).unwrap();
    std::fs::write(&csv_path, "name,cost\nsomething,12\n").unwrap();

    let mut config = create_test_config(&mock_server, &csv_path);
    config.crawler.resume = true;
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.total_records, 5);
    let records = read_snapshot(&csv_path).unwrap().records;
    assert_eq!(records[0].id, 1);
}

#[tokio::test]
async fn test_checkpoint_is_complete_prefix() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, &[("Travel", "travel_2"), ("Poetry", "poetry_23")]).await;
    mount_listing(
        &mock_server,
        &category_path("travel_2"),
        &[HIMALAYAS, FULL_MOON, SEE_AMERICA],
        None,
    )
    .await;
    mount_books(&mock_server, &[HIMALAYAS, FULL_MOON, SEE_AMERICA, ATTIC, OLIO]).await;

    // Hold the second category back so the checkpoint can be observed
    Mock::given(method("GET"))
        .and(path(category_path("poetry_23")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><body>
                    <article class="product_pod"><h3><a href="{}">Attic</a></h3></article>
                    <article class="product_pod"><h3><a href="{}">Olio</a></h3></article>
                    </body></html>"#,
                    ATTIC.path(),
                    OLIO.path()
                ))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv_path = snapshot_path(&dir);
    let mut config = create_test_config(&mock_server, &csv_path);
    config.crawler.checkpoint_every = 2;

    let mut coordinator = Coordinator::new(config).unwrap();
    let watch = async {
        loop {
            if csv_path.exists() {
                return read_snapshot(&csv_path).unwrap().records;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    let (report, checkpoint) = tokio::join!(coordinator.run(), watch);
    let report = report.unwrap();

    // The first file to appear is a checkpoint, never the final flush
    assert!(!checkpoint.is_empty());
    assert!(checkpoint.len() < 5);
    assert_eq!(checkpoint.len() % 2, 0);
    for (index, record) in checkpoint.iter().enumerate() {
        assert_eq!(record.id, index as u64 + 1);
    }

    assert_eq!(report.total_records, 5);
    let records = read_snapshot(&csv_path).unwrap().records;
    assert_eq!(&records[..checkpoint.len()], checkpoint.as_slice());
}
