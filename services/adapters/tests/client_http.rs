//! ProviderClient against a mock provider

use adapter_service::{FlightProvider, ProviderClient, ScrapeError};
use chrono::NaiveDate;
use config::ProviderSettings;
use mockito::Matcher;
use serde_json::json;
use types::{Route, ScrapeTask};

fn settings(server: &mockito::Server) -> ProviderSettings {
    ProviderSettings {
        api_base_url: format!("{}/v1/flights/offers", server.url()),
        site_base_url: format!("{}/flights-offers", server.url()),
        request_timeout_secs: 5,
        ..ProviderSettings::default()
    }
}

fn task() -> ScrapeTask {
    ScrapeTask::new(
        Route::parse("AEP", "COR").unwrap(),
        NaiveDate::from_ymd_opt(2025, 7, 16).unwrap(),
    )
}

#[tokio::test]
async fn test_calendar_request_and_parse() {
    let mut server = mockito::Server::new_async().await;
    let body = json!({
        "calendarOffers": { "0": [
            {
                "departure": "2025-07-22",
                "leg": {
                    "stops": 0,
                    "totalDuration": 80,
                    "segments": [{
                        "airline": "AR",
                        "flightNumber": 1520,
                        "origin": "AEP",
                        "destination": "COR",
                        "departure": "2025-07-22T21:45:00",
                        "arrival": "2025-07-22T23:05:00"
                    }]
                },
                "offerDetails": {
                    "cabinClass": "Economy",
                    "seatAvailability": { "seats": 9 },
                    "fare": { "total": 61000.75 }
                }
            },
            { "departure": "2025-07-23", "leg": null }
        ]},
        "searchMetadata": { "shoppingId": "abc" }
    });
    let mock = server
        .mock("GET", "/v1/flights/offers")
        .match_header("authorization", "Bearer live-token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("flexDates".into(), "true".into()),
            Matcher::UrlEncoded("flightType".into(), "ONE_WAY".into()),
            Matcher::UrlEncoded("leg".into(), "AEP-COR-20250716".into()),
            Matcher::UrlEncoded("adt".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = ProviderClient::new(settings(&server)).unwrap();
    let batch = client.fetch_calendar(&task(), "live-token").await.unwrap();

    mock.assert_async().await;
    assert_eq!(batch.provider, "AerolineasARG");
    assert_eq!(batch.observations.len(), 2);
    assert_eq!(batch.active_count(), 1);
    assert_eq!(batch.observations[0].primary_offer().unwrap().price, 61000);
}

#[tokio::test]
async fn test_access_denied_is_expired_token() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/flights/offers")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"errorMessage": "core.gateway.access-denied"}"#)
        .create_async()
        .await;

    let client = ProviderClient::new(settings(&server)).unwrap();
    let err = client.probe_token("old-token", &task()).await.unwrap_err();
    assert!(matches!(err, ScrapeError::ExpiredToken { .. }));
}

#[tokio::test]
async fn test_rate_limited_is_blocked() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/flights/offers")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let client = ProviderClient::new(settings(&server)).unwrap();
    let err = client.fetch_calendar(&task(), "token").await.unwrap_err();
    assert!(matches!(err, ScrapeError::RequestsBlocked { status: 429, .. }));
    assert!(err.is_task_recoverable());
}

#[tokio::test]
async fn test_token_page_scrape() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/flights-offers")
        .match_query(Matcher::UrlEncoded("flexDates".into(), "false".into()))
        .with_status(200)
        .with_body(r#"<html><script>window.__ACCESS_TOKEN__ = "eyJfresh.token";</script></html>"#)
        .create_async()
        .await;

    let client = ProviderClient::new(settings(&server)).unwrap();
    assert_eq!(client.fetch_token(&task()).await.unwrap(), "eyJfresh.token");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_token_page_without_token() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/flights-offers")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>redesigned</html>")
        .create_async()
        .await;

    let client = ProviderClient::new(settings(&server)).unwrap();
    let err = client.fetch_token(&task()).await.unwrap_err();
    assert_eq!(err, ScrapeError::TokenNotFound);
    assert!(err.is_fatal());
}
