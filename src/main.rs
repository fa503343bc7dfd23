use anyhow::Result;
use clap::Parser;
use kmlblocks::process_kml_file;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Extract information from a certain type of KML file, and save it into CSV files."
)]
struct Args {
    /// path to kml file (typically called 'doc.kml')
    #[arg(long = "kml_path", visible_alias = "kml-path")]
    kml_path: PathBuf,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) parse args ───────────────────────────────────────────────
    let args = Args::parse();
    info!(path = %args.kml_path.display(), "startup");

    // ─── 3) load, consolidate, write ─────────────────────────────────
    let outputs = process_kml_file(&args.kml_path)?;
    info!(
        town = %outputs.town,
        raw = %outputs.raw_path.display(),
        by_block = %outputs.consolidated_path.display(),
        "all done"
    );
    Ok(())
}
