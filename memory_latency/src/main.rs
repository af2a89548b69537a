use clap::Parser;
use memory_latency::{run_sweep, LatencySample, SweepConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Measures the access latency for random and sequential memory access patterns.
///
/// Prints one line per array size: `size,random_ns,sequential_ns`.
#[derive(Parser, Debug)]
#[command(name = "memory_latency")]
#[command(version)]
struct Args {
    /// Maximum size in bytes of the array to measure (exclusive)
    max_size: u64,

    /// Factor of the geometric series of array sizes
    factor: f64,

    /// Number of accesses each measurement is averaged on
    repeat: u64,

    /// Write the rows to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit a header row first
    #[arg(long)]
    header: bool,

    /// Back the arrays with huge pages (MAP_HUGETLB)
    #[arg(long)]
    huge_pages: bool,
}

fn run(args: Args) -> memory_latency::Result<()> {
    let mut config = SweepConfig::new(args.max_size, args.factor, args.repeat)?;
    config.huge_pages = args.huge_pages;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    if args.header {
        writeln!(out, "{}", LatencySample::CSV_HEADER)?;
    }
    let count = run_sweep(&config, |sample| Ok(sample.write_csv(&mut out)?))?;
    out.flush()?;
    log::info!("Measured {} array sizes", count);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
