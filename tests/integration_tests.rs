use calima_detector::cli::{run, Cli};
use calima_detector::ingest::read_response;
use calima_detector::models::AirQualityData;
use calima_detector::storage::{MemoryStore, ModifyRepository, ReadRepository};
use calima_detector::EpisodeScanner;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn dt(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn dusty(hour: i64, dust: f64) -> AirQualityData {
    AirQualityData::empty(dt(hour)).with_dust(dust)
}

fn store_with(location: &str, data: Vec<AirQualityData>) -> MemoryStore {
    let store = MemoryStore::new();
    store.add_location(location, 28.4636, -16.2518).unwrap();
    store.bulk_add_measurements(location, data).unwrap();
    store
}

fn spans(store: &MemoryStore, location: &str) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut spans: Vec<_> = store
        .get_calima_events(location)
        .unwrap()
        .iter()
        .map(|e| (e.start_time, e.end_time))
        .collect();
    spans.sort();
    spans
}

#[test]
fn test_detects_and_persists_two_episodes() {
    let store = store_with(
        "santa_cruz",
        vec![
            dusty(0, 200.0),
            dusty(1, 200.0),
            dusty(2, 200.0),
            dusty(3, 10.0),
            AirQualityData::empty(dt(4)).with_pm10(70.0).with_aod(0.8),
            AirQualityData::empty(dt(5)).with_pm10(70.0).with_aod(0.8),
            AirQualityData::empty(dt(6)).with_pm10(70.0).with_aod(0.8),
            AirQualityData::empty(dt(7)).with_pm10(10.0).with_aod(0.1),
        ],
    );

    let episodes = EpisodeScanner::new(&store, &store)
        .detect_events("santa_cruz")
        .unwrap();

    assert_eq!(episodes.len(), 2);
    assert_eq!((episodes[0].start_time, episodes[0].end_time), (dt(0), dt(2)));
    assert_eq!((episodes[1].start_time, episodes[1].end_time), (dt(4), dt(6)));
    assert_eq!(spans(&store, "santa_cruz"), vec![(dt(0), dt(2)), (dt(4), dt(6))]);
}

#[test]
fn test_incremental_detection_with_new_data() {
    let store = store_with(
        "adeje",
        vec![
            dusty(0, 200.0),
            dusty(1, 200.0),
            dusty(2, 200.0),
            dusty(3, 10.0),
            dusty(4, 300.0),
            dusty(5, 300.0),
        ],
    );
    let scanner = EpisodeScanner::new(&store, &store);

    assert_eq!(scanner.detect_events("adeje").unwrap().len(), 1);
    assert!(scanner.detect_events("adeje").unwrap().is_empty());

    // The open run at hours 4-5 closes once more data arrives
    store
        .bulk_add_measurements("adeje", vec![dusty(6, 250.0), dusty(7, 5.0)])
        .unwrap();
    let episodes = scanner.detect_events("adeje").unwrap();

    assert_eq!(episodes.len(), 1);
    assert_eq!((episodes[0].start_time, episodes[0].end_time), (dt(4), dt(6)));
    assert_eq!(episodes[0].peak_dust, 300.0);
    assert!(scanner.detect_events("adeje").unwrap().is_empty());
}

#[test]
fn test_hours_before_resume_point_are_not_rescanned() {
    let store = store_with(
        "santa_cruz",
        vec![
            dusty(8, 200.0),
            dusty(9, 200.0),
            dusty(10, 200.0),
            dusty(11, 200.0),
            dusty(12, 200.0),
            dusty(13, 10.0),
        ],
    );
    let scanner = EpisodeScanner::new(&store, &store);
    assert!(spans(&store, "santa_cruz").is_empty());
    assert_eq!(scanner.detect_events("santa_cruz").unwrap().len(), 1);
    assert_eq!(spans(&store, "santa_cruz"), vec![(dt(8), dt(12))]);

    store
        .bulk_add_measurements(
            "santa_cruz",
            vec![dusty(14, 200.0), dusty(15, 200.0), dusty(16, 200.0), dusty(17, 1.0)],
        )
        .unwrap();
    let episodes = scanner.detect_events("santa_cruz").unwrap();

    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].start_time, dt(14));
    assert_eq!(
        spans(&store, "santa_cruz"),
        vec![(dt(8), dt(12)), (dt(14), dt(16))]
    );
}

#[test]
fn test_unknown_location_yields_nothing() {
    let store = MemoryStore::new();
    let episodes = EpisodeScanner::new(&store, &store)
        .detect_events("atlantis")
        .unwrap();
    assert!(episodes.is_empty());
}

#[test]
fn test_detection_survives_snapshot_reload() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("store.json");

    let store = store_with(
        "puerto_de_la_cruz",
        vec![dusty(0, 170.0), dusty(1, 170.0), dusty(2, 170.0), dusty(3, 0.0)],
    );
    EpisodeScanner::new(&store, &store)
        .detect_events("puerto_de_la_cruz")
        .unwrap();
    store.save(&path).unwrap();

    let reloaded = MemoryStore::load(&path).unwrap();
    let again = EpisodeScanner::new(&reloaded, &reloaded)
        .detect_events("puerto_de_la_cruz")
        .unwrap();

    assert!(again.is_empty());
    assert_eq!(reloaded.get_calima_events("puerto_de_la_cruz").unwrap().len(), 1);
}

#[test]
fn test_import_open_meteo_response() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("response.json");
    write_response(&path);

    let series = read_response(&path).unwrap();
    let store = MemoryStore::new();
    store.add_location("santa_cruz", 28.4636, -16.2518).unwrap();
    let inserted = store
        .bulk_add_measurements("santa_cruz", series.to_measurements())
        .unwrap();

    assert_eq!(inserted, 6);
    assert_eq!(store.find_calima_hours("santa_cruz").unwrap().len(), 3);

    let episodes = EpisodeScanner::new(&store, &store)
        .detect_events("santa_cruz")
        .unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].peak_dust, 230.0);
    assert_eq!(episodes[0].peak_pm10, 95.0);

    let daily = store.get_daily_max("santa_cruz").unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].dust, Some(230.0));
}

fn write_response(path: &Path) {
    let body = r#"{
        "latitude": 28.46,
        "longitude": -16.25,
        "hourly": {
            "time": [
                "2026-03-01T00:00", "2026-03-01T01:00", "2026-03-01T02:00",
                "2026-03-01T03:00", "2026-03-01T04:00", "2026-03-01T05:00"
            ],
            "pm10": [20.0, 95.0, null, 80.0, 30.0, null],
            "pm2_5": [5.0, 30.0, null, 20.0, 8.0, null],
            "dust": [15.0, 160.0, 230.0, 120.0, 20.0, null],
            "aerosol_optical_depth": [0.1, 0.6, null, 0.7, 0.2, null]
        }
    }"#;
    fs::write(path, body).unwrap();
}

#[test]
fn test_cli_workflow() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store_path = dir.path().join("store.json");
    let config_path = dir.path().join("calima.toml");
    let response_path = dir.path().join("response.json");
    write_response(&response_path);

    let invoke = |args: &[&str]| {
        let mut argv = vec![
            "calima-detector",
            "--store",
            store_path.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
        ];
        argv.extend_from_slice(args);
        run(Cli::parse_from(argv))
    };

    invoke(&["init"]).unwrap();
    invoke(&[
        "import",
        "--location",
        "santa_cruz",
        "--input-file",
        response_path.to_str().unwrap(),
    ])
    .unwrap();
    invoke(&["detect", "--location", "santa_cruz"]).unwrap();
    invoke(&["events", "--location", "santa_cruz"]).unwrap();

    let store = MemoryStore::load(&store_path).unwrap();
    assert_eq!(store.list_locations().unwrap().len(), 3);
    assert_eq!(store.get_calima_events("santa_cruz").unwrap().len(), 1);

    invoke(&["remove-location", "--name", "santa_cruz"]).unwrap();
    let store = MemoryStore::load(&store_path).unwrap();
    assert!(store.get_location("santa_cruz").unwrap().is_none());
    assert!(store.get_measurements("santa_cruz").unwrap().is_empty());

    assert!(invoke(&["remove-location", "--name", "santa_cruz"]).is_err());
}

#[test]
fn test_cli_fetch_validates_before_requesting() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store_path = dir.path().join("store.json");
    let config_path = dir.path().join("calima.toml");

    let invoke = |args: &[&str]| {
        let mut argv = vec![
            "calima-detector",
            "--store",
            store_path.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
        ];
        argv.extend_from_slice(args);
        run(Cli::parse_from(argv))
    };

    invoke(&["init"]).unwrap();

    let too_long = invoke(&["fetch", "--location", "adeje", "--days", "91"]).unwrap_err();
    assert!(too_long.to_string().contains("past_days"));

    let unknown = invoke(&["fetch", "--location", "atlantis"]).unwrap_err();
    assert!(unknown.to_string().contains("unknown location"));
}
