mod common;

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cmvr_render::{HttpImageFetcher, ImageSource, ImageStore};

async fn server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(common::png_bytes(40, 20)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(common::png_bytes(40, 20))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/text.png"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/error.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn fetch_returns_bytes_only_on_success() {
    common::init_logging();
    let server = server().await;
    let fetcher = HttpImageFetcher::new(Duration::from_millis(200));

    let ok = fetcher.fetch(&format!("{}/ok.png", server.uri())).await;
    assert!(ok.is_some_and(|b| b.starts_with(b"\x89PNG")));

    // Unmatched paths are a 404 from the mock server.
    assert!(fetcher.fetch(&format!("{}/gone.png", server.uri())).await.is_none());
    assert!(fetcher.fetch(&format!("{}/error.png", server.uri())).await.is_none());
    assert!(fetcher.fetch(&format!("{}/slow.png", server.uri())).await.is_none());
}

#[tokio::test]
async fn prefetch_records_every_url() {
    common::init_logging();
    let server = server().await;
    let fetcher = HttpImageFetcher::new(Duration::from_millis(200));
    let urls: Vec<String> = ["ok.png", "slow.png", "text.png", "gone.png"]
        .iter()
        .map(|p| format!("{}/{p}", server.uri()))
        .collect();

    let store = ImageStore::prefetch(&fetcher, &urls).await;
    assert_eq!(store.len(), 4);
    assert!(store.get(&urls[0]).is_some());
    assert!(store.get(&urls[1]).is_none(), "timed out");
    assert!(store.get(&urls[2]).is_none(), "undecodable");
    assert!(store.get(&urls[3]).is_none(), "not found");

    let loaded = store.get(&urls[0]).expect("ok.png");
    assert_eq!((loaded.pixel_width, loaded.pixel_height), (40, 20));
}

#[tokio::test]
async fn unreachable_hosts_fail_softly() {
    common::init_logging();
    let fetcher = HttpImageFetcher::new(Duration::from_millis(200));
    assert!(fetcher.fetch("http://127.0.0.1:9/none.png").await.is_none());
    assert!(fetcher.fetch("not a url").await.is_none());
}
