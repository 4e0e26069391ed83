//! Fleet service client against a mock server

use sdk::collaborators::FleetSource;
use sdk::EngineError;
use serde_json::json;
use transit_engine::fleet::HttpFleetClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_with_b1() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bus/status"))
        .and(query_param("bus_id", "B1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "data": {
                "bus_id": "B1",
                "status": "running",
                "status_message": "On schedule",
                "lat": 22.5726,
                "lon": 88.3639,
                "route_id": "R1"
            },
            "error": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bus/status"))
        .and(query_param("bus_id", "B9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ok": false,
            "data": null,
            "error": { "code": "NOT_FOUND", "message": "Bus not found" }
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_bus_location_and_status() {
    let server = server_with_b1().await;
    let client = HttpFleetClient::new(server.uri());

    let location = client.get_bus_location("B1").await.unwrap().unwrap();
    assert_eq!(location.bus_id, "B1");
    assert_eq!(location.route_id.as_deref(), Some("R1"));
    assert_eq!(location.speed_kmph, 20.0);

    let status = client.get_bus_status("B1").await.unwrap().unwrap();
    assert_eq!(status.status, "running");
}

#[tokio::test]
async fn test_unknown_bus_is_none() {
    let server = server_with_b1().await;
    let client = HttpFleetClient::new(server.uri());
    assert!(client.get_bus_location("B9").await.unwrap().is_none());
    assert!(client.get_bus_status("B9").await.unwrap().is_none());
}

#[tokio::test]
async fn test_route_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/route"))
        .and(query_param("route_id", "R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "data": { "stops": [
                { "stop_id": "S1", "name": "Esplanade", "lat": 22.5906, "lon": 88.3639 }
            ]}
        })))
        .mount(&server)
        .await;

    let client = HttpFleetClient::new(format!("{}/", server.uri()));
    let route = client.get_route("R1").await.unwrap().unwrap();
    assert_eq!(route.route_id, "R1");
    assert_eq!(route.find_stop("s1").map(|s| s.lat), Some(22.5906));
}

#[tokio::test]
async fn test_error_envelope_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/route"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "data": null,
            "error": { "code": "INTERNAL", "message": "database locked" }
        })))
        .mount(&server)
        .await;

    let client = HttpFleetClient::new(server.uri());
    let err = client.get_route("R1").await.unwrap_err();
    match err {
        EngineError::Network(msg) => assert!(msg.contains("database locked")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_buses_on_route_from_overview() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/fleet/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "data": [
                { "bus_id": "B3", "route_id": "R1" },
                { "bus_id": "B2", "route_id": "R2" },
                { "bus_id": "B1", "route_id": "R1" }
            ]
        })))
        .mount(&server)
        .await;

    let client = HttpFleetClient::new(server.uri());
    assert_eq!(
        client.buses_on_route("R1").await.unwrap(),
        vec!["B1".to_string(), "B3".to_string()]
    );
}
