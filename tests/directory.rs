//! Station directory queries against a mock Radio Browser server.

use radiodeck::config::DirectoryConfig;
use radiodeck::{RadioBrowserClient, TrendingCategory};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RadioBrowserClient {
    RadioBrowserClient::new(&DirectoryConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

fn station_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "changeuuid": format!("c-{id}"),
        "stationuuid": id,
        "name": name,
        "url": format!("http://stream.example/{id}"),
        "url_resolved": format!("http://stream.example/{id}.mp3"),
        "tags": "bongo,taarab",
        "country": "Tanzania",
        "countrycode": "TZ",
        "votes": 12,
        "clickcount": 3,
        "codec": "MP3",
        "bitrate": 128,
        "geo_lat": null,
        "geo_long": null,
        "has_extended_info": false
    })
}

#[tokio::test]
async fn by_country_sends_limit_and_hidebroken() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/bycountry/Tanzania"))
        .and(query_param("hidebroken", "true"))
        .and(query_param("limit", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([station_json("u1", "Clouds FM"), station_json("u2", "TBC Taifa")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stations = client(&server).by_country("Tanzania").await;
    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].name, "Clouds FM");
    assert_eq!(stations[1].playable_url(), "http://stream.example/u2.mp3");
}

#[tokio::test]
async fn search_with_no_hits_is_empty_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .and(query_param("name", "jazz"))
        .and(query_param("limit", "30"))
        .and(query_param("hidebroken", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).search("jazz").await.is_empty());
}

#[tokio::test]
async fn server_error_yields_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let rb = client(&server);
    assert!(rb.by_country("Tanzania").await.is_empty());
    assert!(rb.by_tag("jazz").await.is_empty());
    assert!(rb.trending(TrendingCategory::Clicks).await.is_empty());
    assert!(rb.by_id("u1").await.is_none());
}

#[tokio::test]
async fn malformed_body_yields_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/bytag/jazz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    assert!(client(&server).by_tag("jazz").await.is_empty());
}

#[tokio::test]
async fn trending_hits_category_endpoint() {
    let server = MockServer::start().await;
    for (endpoint, id) in [("topvote", "v"), ("topclick", "c"), ("lastchange", "r")] {
        Mock::given(method("GET"))
            .and(path(format!("/json/stations/{endpoint}/50")))
            .and(query_param("hidebroken", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([station_json(id, id)])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let rb = client(&server);
    assert_eq!(rb.trending(TrendingCategory::Votes).await[0].stationuuid, "v");
    assert_eq!(rb.trending(TrendingCategory::Clicks).await[0].stationuuid, "c");
    assert_eq!(rb.trending(TrendingCategory::Recent).await[0].stationuuid, "r");
}

#[tokio::test]
async fn by_id_returns_first_or_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/stations/byuuid/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([station_json("u1", "One")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json/stations/byuuid/missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let rb = client(&server);
    assert_eq!(rb.by_id("u1").await.map(|s| s.name), Some("One".to_string()));
    assert!(rb.by_id("missing").await.is_none());
}
