use hitoffset_engine::{fit_gradient_descent, DescentOptions};
use hitoffset_runner::FitWorker;
use hitoffset_schema::{RhythmModel, TrainingSeries};
use std::time::Duration;

fn synthetic(model: RhythmModel) -> TrainingSeries {
    let distr_t: Vec<f64> = (50..=400).step_by(10).map(|t| t as f64).collect();
    let mean_h = distr_t.iter().map(|t| model.predict(*t)).collect();
    TrainingSeries {
        distr_t,
        mean_h,
        var_h: Vec::new(),
    }
}

#[test]
fn test_worker_fits_submitted_series() {
    let options = DescentOptions::default();
    let worker = FitWorker::new(options);
    let series = synthetic(RhythmModel { r: -0.05, t_min: 150.0, y: 3.0 });

    let generation = worker.submit(series.clone());
    assert_eq!(generation, 1);

    let outcome = worker.wait(Duration::from_secs(30)).expect("fit should finish");
    assert_eq!(outcome.generation, 1);

    let expected = fit_gradient_descent(&series, &options).unwrap();
    assert_eq!(outcome.result.unwrap(), expected);
    assert!(worker.progress().is_finite());
}

#[test]
fn test_newer_submission_wins() {
    let options = DescentOptions {
        iterations: 5000,
        ..DescentOptions::default()
    };
    let worker = FitWorker::new(options);

    let first = synthetic(RhythmModel { r: -0.05, t_min: 150.0, y: 3.0 });
    let second = synthetic(RhythmModel { r: -0.1, t_min: 120.0, y: 1.0 });

    worker.submit(first);
    let generation = worker.submit(second.clone());
    assert_eq!(generation, 2);

    let outcome = worker.wait(Duration::from_secs(60)).expect("fit should finish");
    assert_eq!(outcome.generation, 2);
    assert_eq!(outcome.result.unwrap(), fit_gradient_descent(&second, &options).unwrap());

    // nothing stale is ever handed out
    assert_eq!(worker.latest().map(|o| o.generation), Some(2));
}

#[test]
fn test_worker_reports_engine_errors() {
    let worker = FitWorker::new(DescentOptions::default());
    worker.submit(TrainingSeries::default());

    let outcome = worker.wait(Duration::from_secs(30)).expect("fit should finish");
    let err = outcome.result.unwrap_err();
    assert_eq!(err.code, "E1004");
    assert!(!err.is_cancelled());
}

#[test]
fn test_latest_is_empty_before_any_fit() {
    let worker = FitWorker::new(DescentOptions::default());
    assert!(worker.latest().is_none());
    assert!(worker.progress().is_nan());
    assert!(worker.wait(Duration::from_millis(10)).is_none());
}
