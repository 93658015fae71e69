use std::{
    env,
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn norm_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "")
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("hitoffset_cli_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_hitoffset");
    Command::new(exe).args(args).env_remove("RUST_LOG").output().unwrap()
}

/// One column of `notes` notes `spacing` ms apart, note `i` hit `lateness(i)` ms late.
fn session_json(id: &str, notes: usize, spacing: f64, lateness: impl Fn(usize) -> f64) -> String {
    let times: Vec<f64> = (0..notes).map(|i| i as f64 * spacing).collect();
    let scores: Vec<serde_json::Value> = times
        .iter()
        .enumerate()
        .map(|(i, t)| {
            serde_json::json!({
                "column": 0,
                "hit_type": "hit_press",
                "scheduled_ms": t,
                "actual_ms": t + lateness(i),
            })
        })
        .collect();
    serde_json::json!({
        "id": id,
        "columns": [{ "column": 0, "note_times": times, "scores": scores }],
    })
    .to_string()
}

#[test]
fn help_mentions_subcommands() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    for cmd in ["analyze", "fit", "tapping", "simulate"] {
        assert!(stdout.contains(cmd), "missing {cmd}");
    }
}

#[test]
fn analyze_prints_stats_and_appends_series() {
    let dir = temp_dir("analyze");
    let session = dir.join("play.json");
    let series = dir.join("series.json");
    let _ = fs::remove_file(&series);
    fs::write(&session, session_json("abc", 61, 120.0, |_| 4.0)).unwrap();

    for _ in 0..2 {
        let output = run(&[
            "analyze",
            session.to_str().unwrap(),
            "--series",
            series.to_str().unwrap(),
        ]);
        assert!(output.status.success());

        let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
        assert!(stdout.starts_with("peak_interval\tmean_offset\tstddev_offset\tcount\n"));
        assert!(stdout.contains("120.0\t4.000\t0.000\t60\n"));
    }

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&series).unwrap()).unwrap();
    assert_eq!(v["distr_t"], serde_json::json!([120.0, 120.0]));
    assert_eq!(v["mean_h"], serde_json::json!([4.0, 4.0]));
}

#[test]
fn analyze_missing_session_is_reported() {
    let missing = env::temp_dir().join(format!("hitoffset_cli_missing_{}.json", std::process::id()));
    let _ = fs::remove_file(&missing);

    let output = run(&["analyze", missing.to_str().unwrap()]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: failed to read session: "));
    assert!(stderr.contains("Caused by:"));
}

#[test]
fn analyze_empty_play_is_an_empty_selection() {
    let dir = temp_dir("empty");
    let session = dir.join("empty.json");
    fs::write(&session, r#"{"columns":[{"column":0,"note_times":[0.0,100.0]}]}"#).unwrap();

    let output = run(&["analyze", session.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: analysis failed: "));
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains("E1001: play has no hits and no misses"));
}

#[test]
fn fit_two_point_prints_model_summary() {
    let dir = temp_dir("fit");
    let series = dir.join("series.json");
    fs::write(
        &series,
        r#"{"distr_t":[50.0,100.0,150.0,200.0,300.0],"mean_h":[20.0,10.0,1.0,0.5,0.2]}"#,
    )
    .unwrap();

    let output = run(&["fit", series.to_str().unwrap(), "--method", "two-point"]);

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    assert!(stdout.starts_with("r = -0.20   t_min = 150.00 ms (200.00 bpm)  y = 0.00 ms  err = "));
}

#[test]
fn fit_descent_on_empty_series_fails_with_code() {
    let dir = temp_dir("fit_empty");
    let series = dir.join("series.json");
    fs::write(&series, r#"{"distr_t":[],"mean_h":[]}"#).unwrap();

    let output = run(&["fit", series.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: fit failed: "));
    assert!(stderr.contains("E1004: training series is empty"));
}

#[test]
fn tapping_prints_rate_and_records_best() {
    let dir = temp_dir("tapping");
    let session = dir.join("play.json");
    let board = dir.join("nps.json");
    let _ = fs::remove_file(&board);
    // the player falls 25 ms further behind on every note
    fs::write(&session, session_json("deadbeef", 40, 100.0, |i| 25.0 * i as f64)).unwrap();

    let output = run(&[
        "tapping",
        session.to_str().unwrap(),
        "--board",
        board.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(stdout, "Min average player tapping rate: 8.00 nps (125.00 ms)\n");

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&board).unwrap()).unwrap();
    assert_eq!(v["deadbeef"], serde_json::json!(8.0));
}

#[test]
fn simulate_writes_series() {
    let dir = temp_dir("simulate");
    let out_path = dir.join("sim.json");
    let _ = fs::remove_file(&out_path);

    let output = run(&[
        "simulate",
        "--seed",
        "7",
        "--rounds",
        "2",
        "-o",
        out_path.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    assert!(stdout.starts_with("r = "));

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert!(v["distr_t"].as_array().unwrap().len() > 150);
}
