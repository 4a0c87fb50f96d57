//! Vehicle state refresh against a mocked backend

mod common;

use audi_connect::model::TripKind;
use audi_connect::DataSource;
use common::{account_with_vehicle, mount_home_region, VIN};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_json(server: &MockServer, wanted: String, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(wanted))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_connected_vehicle(server: &MockServer) {
    let status = format!("/cv/vehicles/{VIN}/selectivestatus");
    Mock::given(method("GET"))
        .and(path(status.as_str()))
        .and(query_param("jobs", "userCapabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userCapabilities": {"capabilitiesStatus": {"value": [{"id": "access"}]}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(status.as_str()))
        .and(query_param("jobs", "access,userCapabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": {"accessStatus": {"value": {
                "carCapturedTimestamp": "2024-05-01T10:00:00Z",
                "overallStatus": "safe",
                "doorLockStatus": "locked"
            }}}
        })))
        .mount(server)
        .await;

    mount_json(
        server,
        format!("/cv/vehicles/{VIN}/capabilities"),
        json!({"capabilities": [{"id": "access", "status": []}]}),
    )
    .await;
    mount_json(
        server,
        format!("/cv/vehicles/{VIN}/parkingposition"),
        json!({"data": {"lat": 48.77, "lon": 11.42, "carCapturedTimestamp": "2024-05-01T10:00:00Z"}}),
    )
    .await;
    mount_json(
        server,
        format!("/api/bs/tripstatistics/v1/vehicles/{VIN}/tripdata/shortTerm"),
        json!({"tripDataList": {"tripData": [
            {"tripID": 2, "startMileage": 1000, "overallMileage": 1040, "mileage": 40},
            {"tripID": 1, "startMileage": 990, "overallMileage": 1000, "mileage": 10}
        ]}}),
    )
    .await;
}

/// Every other resource is refused the way the backend refuses unknown services
async fn refuse_the_rest(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, wanted: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == wanted)
        .count()
}

#[tokio::test]
async fn test_update_collects_state() {
    let server = MockServer::start().await;
    mount_home_region(&server).await;
    mount_connected_vehicle(&server).await;
    refuse_the_rest(&server, 403).await;

    let mut account = account_with_vehicle(&server).await;
    account.update_vehicle(VIN).await.unwrap();

    let vehicle = account.vehicle(VIN).unwrap();
    let access = vehicle
        .state
        .status
        .as_ref()
        .and_then(|s| s.access.as_ref())
        .and_then(|a| a.access_status.as_ref())
        .unwrap();
    assert_eq!(access.door_lock_status, Some(true));
    assert_eq!(vehicle.state.capabilities.as_ref().map(Vec::len), Some(1));
    assert_eq!(vehicle.position().map(|p| p.latitude), Some(48.77));
    assert_eq!(vehicle.state.trips[&TripKind::ShortTerm].current.trip_id, 2);
    assert!(vehicle.last_update.is_some());

    let status = format!("/cv/vehicles/{VIN}/selectivestatus");
    let queries: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == status)
        .filter_map(|r| r.url.query().map(str::to_string))
        .collect();
    assert_eq!(queries, vec!["jobs=userCapabilities", "jobs=access,userCapabilities"]);
}

#[tokio::test]
async fn test_refused_sources_are_disabled() {
    let server = MockServer::start().await;
    mount_home_region(&server).await;
    mount_connected_vehicle(&server).await;
    refuse_the_rest(&server, 403).await;

    let mut account = account_with_vehicle(&server).await;
    account.update_vehicle(VIN).await.unwrap();

    let support = account.vehicle(VIN).unwrap().support;
    assert!(support.get(DataSource::SelectiveStatus));
    assert!(support.get(DataSource::TripShortTerm));
    for source in [
        DataSource::Location,
        DataSource::Charger,
        DataSource::Climater,
        DataSource::Preheater,
        DataSource::StoredData,
        DataSource::TripLongTerm,
        DataSource::TripCyclic,
    ] {
        assert!(!support.get(source), "{source:?} still enabled");
    }

    let charger = format!("/fs-car/bs/batterycharge/v1/Audi/DE/vehicles/{VIN}/charger");
    account.update_vehicle(VIN).await.unwrap();
    assert_eq!(requests_to(&server, &charger).await, 1);
}

#[tokio::test]
async fn test_server_error_is_not_swallowed() {
    let server = MockServer::start().await;
    mount_home_region(&server).await;
    mount_connected_vehicle(&server).await;
    refuse_the_rest(&server, 500).await;

    let mut account = account_with_vehicle(&server).await;
    let err = account.update_vehicle(VIN).await.unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert!(account.vehicle(VIN).unwrap().support.get(DataSource::Location));
}

#[tokio::test]
async fn test_update_all_keeps_going_after_failure() {
    let server = MockServer::start().await;
    mount_home_region(&server).await;
    refuse_the_rest(&server, 500).await;

    let mut account = account_with_vehicle(&server).await;
    account.update(None).await.unwrap();

    assert!(account.vehicle(VIN).unwrap().last_update.is_none());
}
