//! News aggregation across mock sources.

use radiodeck::config::NewsConfig;
use radiodeck::news::PLACEHOLDER_IMAGE;
use radiodeck::NewsClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, paths: &[&str]) -> NewsClient {
    let sources = paths.iter().map(|p| format!("{}{p}", server.uri())).collect();
    NewsClient::new(
        &NewsConfig {
            sources,
            ..Default::default()
        },
        "radiodeck-test",
    )
    .unwrap()
}

#[tokio::test]
async fn merges_sources_in_order_and_fills_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a1", "title": "First", "description": "d", "image_url": "https://img/a1.jpg",
             "source": "A", "url": "https://a/1", "published_at": "2024-05-01T10:00:00Z"},
            {"title": "No id", "source": "A", "url": "https://a/2"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "title": "Third", "source": "B", "url": "https://b/1"}
        ])))
        .mount(&server)
        .await;

    let items = client(&server, &["/news/a", "/news/b"]).fetch_news().await;
    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "No id", "Third"]);
    assert_eq!(items[0].image_url, "https://img/a1.jpg");
    assert_eq!(items[1].image_url, PLACEHOLDER_IMAGE);
    assert_eq!(items[1].id.len(), 32);
    assert_eq!(items[2].id, "9");
}

#[tokio::test]
async fn one_failing_source_empties_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x", "title": "Fine", "source": "ok", "url": "https://ok/x"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client(&server, &["/news/ok", "/news/down"]).fetch_news().await.is_empty());
    assert_eq!(client(&server, &["/news/ok"]).fetch_news().await.len(), 1);
}

#[tokio::test]
async fn nested_source_field_keeps_other_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "title": "Ok"},
            {"id": "2", "title": "Nested", "source": {"name": "BBC"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "3", "title": "Other", "source": "B"}
        ])))
        .mount(&server)
        .await;

    let items = client(&server, &["/news/a", "/news/b"]).fetch_news().await;
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(items[1].source, "");
}
