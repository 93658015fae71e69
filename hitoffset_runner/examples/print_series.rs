use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
struct Args {
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let series = hitoffset_runner::load_series_json_from_path(args.path)?;
    println!("points={}", series.len());
    for (t, m) in series.points() {
        println!("{t:.1}\t{m:.3}");
    }
    Ok(())
}
