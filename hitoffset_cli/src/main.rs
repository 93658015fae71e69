use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use hitoffset_engine::{
    analyze_session, correlate_session, estimate_tapping_rate, fit_gradient_descent, fit_two_point, lag_buckets,
    AnalysisConfig, VerticalAnchor,
};
use hitoffset_runner::{load_series_json_from_path, load_session_json_from_path, NpsBoard, SeriesStore};
use hitoffset_schema::{ModelFit, TappingRate};
use log::info;
use rand::{rngs::StdRng, SeedableRng};

mod simulate;

#[derive(Debug, Parser)]
#[command(name = "hitoffset")]
#[command(about = "Hit offset timing analysis CLI", long_about = None)]
struct Cli {
    /// Log at info level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FitMethod {
    Descent,
    TwoPoint,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Correlate a play and print the offset statistics per note interval.
    Analyze {
        session: PathBuf,
        /// Training series file the peaks are appended to.
        #[arg(long)]
        series: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Fit the rhythm model to an accumulated training series.
    Fit {
        series: PathBuf,
        #[arg(long, value_enum, default_value_t = FitMethod::Descent)]
        method: FitMethod,
        /// Anchor `y` on the average of the settled points (two-point only).
        #[arg(long)]
        settled_mean: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Estimate the player's sustainable tapping rate from a play.
    Tapping {
        session: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Leaderboard file keeping the best rate per play hash.
        #[arg(long)]
        board: Option<PathBuf>,
        /// Play hash; defaults to the session id.
        #[arg(long)]
        hash: Option<String>,
    },
    /// Generate synthetic plays and write the resulting training series.
    Simulate {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 162.63)]
        t_min: f64,
        #[arg(long, default_value_t = 25.0)]
        sigma: f64,
        #[arg(long, default_value_t = 100)]
        rounds: usize,
        #[arg(long, default_value_t = 10_000)]
        notes: usize,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze {
            session,
            series,
            config,
        } => {
            let config = load_config(config)?;
            let play = load_session_json_from_path(&session)?;
            let analysis =
                analyze_session(&play, &config).with_context(|| format!("analysis failed: {}", session.display()))?;

            println!("peak_interval\tmean_offset\tstddev_offset\tcount");
            for s in &analysis.stats {
                println!(
                    "{:.1}\t{:.3}\t{:.3}\t{}",
                    s.peak_interval, s.mean_offset, s.stddev_offset, s.sample_count
                );
            }
            if !analysis.anomalies.is_empty() {
                info!("{} column(s) had misaligned hits", analysis.anomalies.len());
            }

            if let Some(path) = series {
                let mut store = SeriesStore::open(&path)?;
                store.append(&analysis.stats);
                store.save()?;
            }
        }
        Command::Fit {
            series,
            method,
            settled_mean,
            config,
        } => {
            let config = load_config(config)?;
            let points = load_series_json_from_path(&series)?;
            info!("fitting {} points with {method:?}", points.len());

            let fit = match method {
                FitMethod::Descent => fit_gradient_descent(&points, &config.descent).map(|d| d.fit),
                FitMethod::TwoPoint => {
                    let anchor = if settled_mean {
                        VerticalAnchor::settled()
                    } else {
                        VerticalAnchor::Zero
                    };
                    fit_two_point(&points, anchor)
                }
            }
            .with_context(|| format!("fit failed: {}", series.display()))?;

            println!("{}", fit_summary(&fit));
        }
        Command::Tapping {
            session,
            config,
            board,
            hash,
        } => {
            let config = load_config(config)?;
            let play = load_session_json_from_path(&session)?;
            let correlation =
                correlate_session(&play).with_context(|| format!("analysis failed: {}", session.display()))?;

            let buckets = lag_buckets(&correlation.records, &config.tapping);
            info!("{} interval bucket(s) with enough samples", buckets.len());
            let rate = estimate_tapping_rate(&buckets, &config.tapping)
                .with_context(|| format!("tapping estimate failed: {}", session.display()))?;
            println!("{}", tapping_summary(&rate));

            if let Some(path) = board {
                let hash = hash
                    .or(play.id)
                    .context("no play hash: pass --hash or give the session an id")?;
                let mut nps_board = NpsBoard::load(&path)?;
                if nps_board.record(&hash, &rate) {
                    info!("new best for {hash}: {:.2} nps", rate.nps);
                }
                nps_board.save(&path)?;
            }
        }
        Command::Simulate {
            seed,
            t_min,
            sigma,
            rounds,
            notes,
            output,
        } => {
            let mut rng = StdRng::seed_from_u64(seed);
            let params = simulate::SimParams {
                t_min,
                sigma,
                rounds,
                notes,
            };
            let points = simulate::simulate_series(&mut rng, &params, &AnalysisConfig::default().window)
                .context("simulation failed")?;

            let json = serde_json::to_string_pretty(&points).context("failed to serialize series")?;
            fs::write(&output, json).with_context(|| format!("failed to write: {}", output.display()))?;
            info!("wrote {} points to {}", points.len(), output.display());

            let fit = fit_two_point(&points, VerticalAnchor::settled()).context("fit failed: simulated series")?;
            println!("{}", fit_summary(&fit));
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Info);
    }
    let _ = builder.try_init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let bytes = fs::read(&path).with_context(|| format!("failed to read config: {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse config json: {}", path.display()))
}

fn fit_summary(fit: &ModelFit) -> String {
    let m = &fit.model;
    format!(
        "r = {:.2}   t_min = {:.2} ms ({:.2} bpm)  y = {:.2} ms  err = {:.4}",
        m.r,
        m.t_min,
        m.t_min_bpm(),
        m.y,
        fit.error
    )
}

fn tapping_summary(rate: &TappingRate) -> String {
    let interval = rate.interval_ms();
    if rate.is_definite {
        format!("Min average player tapping rate: {:.2} nps ({interval:.2} ms)", rate.nps)
    } else {
        format!("Min average player tapping rate: > {:.2} nps (< {interval:.2} ms)", rate.nps)
    }
}
