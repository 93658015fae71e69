use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use atomic_float::AtomicF64;
use crossbeam_channel::{unbounded, Receiver, Sender};
use hitoffset_engine::{fit_gradient_descent_with, AnalysisResult, DescentFit, DescentOptions};
use hitoffset_schema::TrainingSeries;
use log::{debug, warn};
use parking_lot::Mutex;

enum FitCommand {
    Fit { generation: u64, series: TrainingSeries },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub generation: u64,
    pub result: AnalysisResult<DescentFit>,
}

struct Shared {
    generation: AtomicU64,
    cancel: AtomicBool,
    progress: AtomicF64,
    latest: Mutex<Option<FitOutcome>>,
}

/// Runs descent fits on a background thread. Submitting a new series cancels the fit in
/// flight; only the outcome of the newest submission is ever handed out.
pub struct FitWorker {
    command_tx: Sender<FitCommand>,
    done_rx: Receiver<u64>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl FitWorker {
    pub fn new(options: DescentOptions) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            cancel: AtomicBool::new(false),
            progress: AtomicF64::new(f64::NAN),
            latest: Mutex::new(None),
        });

        let worker_shared = shared.clone();
        let handle = thread::spawn(move || run(options, command_rx, done_tx, worker_shared));

        Self {
            command_tx,
            done_rx,
            shared,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, series: TrainingSeries) -> u64 {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.cancel.store(true, Ordering::Release);
        if self.command_tx.send(FitCommand::Fit { generation, series }).is_err() {
            warn!("fit worker is gone; generation {generation} will not run");
        }
        generation
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    pub fn latest(&self) -> Option<FitOutcome> {
        let current = self.generation();
        self.shared
            .latest
            .lock()
            .as_ref()
            .filter(|o| o.generation == current)
            .cloned()
    }

    pub fn wait(&self, timeout: Duration) -> Option<FitOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(outcome) = self.latest() {
                return Some(outcome);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if self.done_rx.recv_timeout(remaining).is_err() {
                return self.latest();
            }
        }
    }

    /// Total error seen at the last descent iteration, NaN before the first one.
    pub fn progress(&self) -> f64 {
        self.shared.progress.load(Ordering::Acquire)
    }
}

impl Drop for FitWorker {
    fn drop(&mut self) {
        self.shared.cancel.store(true, Ordering::Release);
        let _ = self.command_tx.send(FitCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("fit worker panicked");
            }
        }
    }
}

fn run(options: DescentOptions, command_rx: Receiver<FitCommand>, done_tx: Sender<u64>, shared: Arc<Shared>) {
    while let Ok(command) = command_rx.recv() {
        let FitCommand::Fit { mut generation, mut series } = command else {
            return;
        };

        // Skip straight to the newest queued request.
        while let Ok(next) = command_rx.try_recv() {
            match next {
                FitCommand::Fit {
                    generation: g,
                    series: s,
                } => {
                    generation = g;
                    series = s;
                }
                FitCommand::Shutdown => return,
            }
        }

        shared.cancel.store(false, Ordering::Release);
        let result = fit_gradient_descent_with(&series, &options, |_, error| {
            shared.progress.store(error, Ordering::Release);
            let stale = shared.generation.load(Ordering::Acquire) != generation;
            if stale || shared.cancel.load(Ordering::Acquire) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        if matches!(&result, Err(e) if e.is_cancelled()) {
            debug!("fit generation {generation} cancelled");
            continue;
        }

        *shared.latest.lock() = Some(FitOutcome { generation, result });
        let _ = done_tx.send(generation);
    }
}
