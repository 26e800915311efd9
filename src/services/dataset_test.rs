//! Tests for the hub dataset fetcher.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{DatasetFetcher, HubDatasetFetcher, ServiceError};

#[tokio::test]
async fn fetch_downloads_every_listed_file() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/datasets/acme/ultra"))
    .and(header("authorization", "Bearer hf_token"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "siblings": [{"rfilename": "agriculture.jsonl"}, {"rfilename": "nested/cs.jsonl"}]
    })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/datasets/acme/ultra/resolve/main/agriculture.jsonl"))
    .respond_with(ResponseTemplate::new(200).set_body_string("{\"context\": \"a\"}\n"))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/datasets/acme/ultra/resolve/main/nested/cs.jsonl"))
    .respond_with(ResponseTemplate::new(200).set_body_string("{\"context\": \"b\"}\n"))
    .mount(&server)
    .await;

  let dir = tempfile::tempdir().unwrap();
  let fetcher = HubDatasetFetcher::new(server.uri(), Some("hf_token".to_string())).unwrap();
  let n = fetcher.fetch("acme/ultra", dir.path()).await.unwrap();

  assert_eq!(n, 2);
  let a = std::fs::read_to_string(dir.path().join("agriculture.jsonl")).unwrap();
  assert_eq!(a, "{\"context\": \"a\"}\n");
  assert!(dir.path().join("nested/cs.jsonl").is_file());
}

#[tokio::test]
async fn unknown_dataset_is_a_status_error() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
    .mount(&server)
    .await;

  let dir = tempfile::tempdir().unwrap();
  let fetcher = HubDatasetFetcher::new(server.uri(), None).unwrap();
  assert!(matches!(
    fetcher.fetch("acme/missing", dir.path()).await,
    Err(ServiceError::Status { status: 404, .. })
  ));
}

#[tokio::test]
async fn traversal_file_names_are_refused() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/datasets/acme/evil"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"siblings": [{"rfilename": "../escape"}]})),
    )
    .mount(&server)
    .await;

  let dir = tempfile::tempdir().unwrap();
  let fetcher = HubDatasetFetcher::new(server.uri(), None).unwrap();
  assert!(matches!(
    fetcher.fetch("acme/evil", dir.path()).await,
    Err(ServiceError::Protocol { .. })
  ));
}

#[tokio::test]
async fn file_names_are_percent_encoded_in_download_urls() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/datasets/acme/ultra"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "siblings": [{"rfilename": "crop notes #1.jsonl"}]
    })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/datasets/acme/ultra/resolve/main/crop%20notes%20%231.jsonl"))
    .respond_with(ResponseTemplate::new(200).set_body_string("{\"context\": \"c\"}\n"))
    .mount(&server)
    .await;

  let dir = tempfile::tempdir().unwrap();
  let fetcher = HubDatasetFetcher::new(format!("{}/", server.uri()), None).unwrap();
  assert_eq!(fetcher.fetch("acme/ultra", dir.path()).await.unwrap(), 1);
  assert!(dir.path().join("crop notes #1.jsonl").is_file());
}

#[test]
fn endpoint_must_be_a_url() {
  assert!(matches!(
    HubDatasetFetcher::new("not a url", None),
    Err(ServiceError::Protocol { .. })
  ));
}
