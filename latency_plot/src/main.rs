use cache_info::CacheHierarchy;
use clap::Parser;
use latency_plot::thresholds::parse_size;
use latency_plot::{plot, PlotConfig, Scale};
use std::path::PathBuf;
use std::process::ExitCode;

/// Plot memory latency benchmark results annotated with cache size thresholds
#[derive(Parser, Debug)]
#[command(name = "latency_plot")]
#[command(version)]
struct Cli {
    /// Benchmark CSV: size,random_ns,sequential_ns
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Chart to write; the extension picks the format (png, svg, tex, pdf)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON configuration file, overridden by the flags below
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    x_scale: Option<Scale>,

    #[arg(long, value_enum)]
    y_scale: Option<Scale>,

    /// L1 cache size (e.g. 128KiB)
    #[arg(long, value_parser = parse_size)]
    l1_size: Option<u64>,

    /// L2 cache size (e.g. 1MiB)
    #[arg(long, value_parser = parse_size)]
    l2_size: Option<u64>,

    /// L3 cache size (e.g. 6MiB)
    #[arg(long, value_parser = parse_size)]
    l3_size: Option<u64>,

    #[arg(long, value_parser = parse_size)]
    word_size: Option<u64>,

    #[arg(long, value_parser = parse_size)]
    page_size: Option<u64>,

    /// Take the L1/L2/L3 sizes from this machine's CPUID
    #[arg(long)]
    detect_caches: bool,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    fn into_config(self) -> latency_plot::Result<PlotConfig> {
        let mut config = match &self.config {
            Some(path) => PlotConfig::from_json_file(path)?,
            None => PlotConfig::default(),
        };

        if self.detect_caches {
            let hierarchy = CacheHierarchy::detect();
            if hierarchy.is_empty() {
                log::warn!("No cache information available, keeping configured sizes");
            } else {
                log::info!("Detected caches: {:?}", hierarchy);
            }
            config.constants = config.constants.with_hierarchy(&hierarchy);
        }

        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(output) = self.output {
            config.output_path = Some(output);
        }
        if let Some(scale) = self.x_scale {
            config.x_scale = scale;
        }
        if let Some(scale) = self.y_scale {
            config.y_scale = scale;
        }
        let c = &mut config.constants;
        for (flag, target) in [
            (self.l1_size, &mut c.l1_size),
            (self.l2_size, &mut c.l2_size),
            (self.l3_size, &mut c.l3_size),
            (self.word_size, &mut c.word_size),
            (self.page_size, &mut c.page_size),
        ] {
            if let Some(value) = flag {
                *target = value;
            }
        }
        if let Some(title) = self.title {
            config.title = title;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = Cli::parse().into_config().and_then(|config| plot(&config));
    match result {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latency_plot::thresholds::MIB;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "latency_plot",
            "bench.csv",
            "--y-scale",
            "log",
            "--l3-size",
            "8MiB",
            "-o",
            "bench.svg",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.input_path, PathBuf::from("bench.csv"));
        assert_eq!(config.output_path(), PathBuf::from("bench.svg"));
        assert_eq!(config.y_scale, Scale::Log);
        assert_eq!(config.x_scale, Scale::Log);
        assert_eq!(config.constants.l3_size, 8 * MIB);
        assert_eq!(config.constants.l1_size, 128 * 1024);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.json");
        std::fs::write(&path, r#"{ "l2_size": 2097152, "x_scale": "linear", "title": "box" }"#)
            .unwrap();
        let cli = Cli::parse_from([
            "latency_plot",
            "--config",
            path.to_str().unwrap(),
            "--title",
            "laptop",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.constants.l2_size, 2 * MIB);
        assert_eq!(config.x_scale, Scale::Linear);
        assert_eq!(config.title, "laptop");
    }

    #[test]
    fn malformed_size_flag_is_rejected() {
        assert!(Cli::try_parse_from(["latency_plot", "--l1-size", "lots"]).is_err());
    }
}
