//! Configuration files drive engine behavior.

use std::io::Write;

use trip_engine::config::{load_config, ConfigError};
use trip_engine::itinerary::ViaReorderRequest;
use trip_engine::model::{RideRiderStatus, RideStatus};
use trip_engine::store::InMemoryStore;
use trip_engine::{Engine, EngineError};

mod common;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_temporary_pool_follows_config() {
    let file = write_config(
        r#"
[ordinals]
temporary_base = 500
max_vias_per_trip = 16
"#,
    );
    let config = load_config(file.path()).unwrap();
    let store = InMemoryStore::new();
    let trip = common::seed_trip(&store, 3);
    let (a, b, c) = (trip.vias[0].id, trip.vias[1].id, trip.vias[2].id);
    let engine = Engine::new(store.clone(), config);

    let request = ViaReorderRequest::reorder(&trip, &[b, c, a]).unwrap();
    engine.reorder_trip(trip.id, request).await.unwrap();

    let parked: Vec<i32> = store
        .ordinal_log()
        .iter()
        .map(|w| w.ordinal)
        .filter(|o| *o >= 500)
        .collect();
    assert_eq!(parked, vec![500]);
    common::assert_order(&store, trip.id, &[b, c, a]);
}

#[tokio::test]
async fn test_via_limit_follows_config() {
    let file = write_config("[ordinals]\ntemporary_base = 100\nmax_vias_per_trip = 2\n");
    let config = load_config(file.path()).unwrap();
    let store = InMemoryStore::new();
    let trip = common::seed_trip(&store, 2);
    let engine = Engine::new(store.clone(), config);

    let mut request = ViaReorderRequest::reorder(&trip, &[trip.vias[0].id, trip.vias[1].id]).unwrap();
    request.push(common::via(trip.id, 2));
    let err = engine.reorder_trip(trip.id, request).await.unwrap_err();

    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_approve_rights_follow_config() {
    let file = write_config("[membership]\napprove_statuses = [\"owner\", \"joined\"]\n");
    let config = load_config(file.path()).unwrap();
    let store = InMemoryStore::new();
    let trip = common::seed_trip(&store, 1);
    let via = trip.vias[0].id;
    let p1 = common::passenger(&store, via);
    let p2 = common::passenger(&store, via);
    let member = common::rider(&store, via, &[&p1]);
    let hopeful = common::rider(&store, via, &[&p2]);
    let ride = common::ride(&store, RideStatus::CabShare);
    let member_row = common::membership(&store, &ride, &member, RideRiderStatus::Joined, 0);
    let applicant = common::membership(&store, &ride, &hopeful, RideRiderStatus::Applied, 1);
    let engine = Engine::new(store.clone(), config);

    let approved = engine.approve(&member_row, applicant).await.unwrap();
    assert_eq!(approved.status, RideRiderStatus::Joined);
}

#[test]
fn test_invalid_config_reports_every_problem() {
    let file = write_config(
        r#"
[ordinals]
temporary_base = 4
max_vias_per_trip = 8

[geo]
score_scale_m = -1.0

[observability]
log_level = "loud"
"#,
    );
    match load_config(file.path()).unwrap_err() {
        ConfigError::Validation(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
            assert!(fields.contains(&"ordinals.temporary_base"));
            assert!(fields.contains(&"geo.score_scale_m"));
            assert!(fields.contains(&"observability.log_level"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_unknown_status_is_a_parse_error() {
    let file = write_config("[membership]\napprove_statuses = [\"captain\"]\n");
    assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
}
