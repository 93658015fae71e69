use hitoffset_runner::{load_series_json_from_str, load_session_json_from_str, NpsBoard, SeriesStore};
use hitoffset_schema::{HitType, IntervalStat, TappingRate};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("hitoffset_runner_{}_{}", std::process::id(), name));
    p
}

fn stat(peak_interval: f64, mean_offset: f64) -> IntervalStat {
    IntervalStat {
        peak_interval,
        mean_offset,
        stddev_offset: 1.0,
        sample_count: 50,
    }
}

#[test]
fn test_series_store_starts_empty_and_appends() {
    let path = temp_path("series.json");
    let _ = std::fs::remove_file(&path);

    let mut store = SeriesStore::open(&path).unwrap();
    assert!(store.series().is_empty());

    store.append(&[stat(100.0, 12.0), stat(200.0, 0.5)]);
    store.save().unwrap();

    // Reopen and keep appending
    let mut store = SeriesStore::open(&path).unwrap();
    assert_eq!(store.series().distr_t, vec![100.0, 200.0]);
    store.append(&[stat(100.0, 11.0)]);
    store.save().unwrap();

    let store = SeriesStore::open(&path).unwrap();
    assert_eq!(store.series().len(), 3);
    assert_eq!(store.series().mean_h, vec![12.0, 0.5, 11.0]);
    assert_eq!(store.series().var_h, vec![1.0, 1.0, 1.0]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_series_store_rejects_broken_file() {
    let path = temp_path("broken_series.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = SeriesStore::open(&path).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse series json"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_nps_board_keeps_best_rate() {
    let mut board = NpsBoard::default();
    let rate = |nps| TappingRate { is_definite: true, nps };

    assert!(board.record("a1", &rate(7.5)));
    assert!(!board.record("a1", &rate(6.0)));
    assert!(board.record("a1", &rate(8.0)));
    assert!(board.record("b2", &rate(9.0)));
    assert_eq!(board.get("a1"), Some(8.0));

    assert_eq!(board.top(), vec![("b2", 9.0), ("a1", 8.0)]);

    let path = temp_path("nps.json");
    board.save(&path).unwrap();
    assert_eq!(NpsBoard::load(&path).unwrap(), board);
    let _ = std::fs::remove_file(&path);

    assert_eq!(NpsBoard::load(temp_path("missing_nps.json")).unwrap(), NpsBoard::default());
}

#[test]
fn test_load_session_and_series_from_str() {
    let session = load_session_json_from_str(
        r#"{"columns":[{"column":0,"note_times":[0.0,100.0],
            "scores":[{"column":0,"hit_type":"hit_press","scheduled_ms":100.0,"actual_ms":103.0}]}]}"#,
    )
    .unwrap();
    assert_eq!(session.id, None);
    assert_eq!(session.columns[0].scores[0].hit_type, HitType::HitPress);

    let series = load_series_json_from_str(r#"{"distr_t":[1.0],"mean_h":[2.0]}"#).unwrap();
    assert_eq!(series.len(), 1);
    assert!(series.var_h.is_empty());

    assert!(load_series_json_from_str("[]").is_err());
}
