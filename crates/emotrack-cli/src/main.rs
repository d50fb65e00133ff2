use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use emotrack_core::{AnalyticsConfig, Session};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod replay;
mod watch;

#[derive(Parser)]
#[command(name = "emotrack", about = "Emotion and attentiveness tracking over face detector output")]
struct Cli {
    /// TOML config file; EMOTRACK_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Built-in tuning used when no config file is given
    #[arg(long, value_enum, global = true, default_value_t = Preset::Default)]
    preset: Preset,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    Default,
    Responsive,
    Steady,
}

impl Preset {
    fn config(self) -> AnalyticsConfig {
        match self {
            Preset::Default => AnalyticsConfig::default(),
            Preset::Responsive => AnalyticsConfig::responsive(),
            Preset::Steady => AnalyticsConfig::steady(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded detector stream (JSON lines) and report on it
    Replay {
        /// Input file, or "-" for stdin
        input: String,
        /// What to print
        #[arg(long, value_enum, default_value_t = replay::Emit::Summary)]
        emit: replay::Emit,
        /// Spacing assumed for frames without a timestamp
        #[arg(long, default_value_t = 33)]
        frame_interval_ms: i64,
        /// Calibrate after this many frames
        #[arg(long)]
        calibrate_at: Option<u64>,
        /// Timeline window for --emit timeline
        #[arg(long, default_value_t = 60)]
        window_secs: u64,
    },
    /// Track a live detector stream on stdin
    Watch {
        /// Summary interval
        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,
        /// Also print every frame result
        #[arg(long)]
        frames: bool,
        /// Do not emit palette changes
        #[arg(long)]
        no_theme: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref(), cli.preset.config())
        .context("failed to load configuration")?;
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Commands::Replay {
            input,
            emit,
            frame_interval_ms,
            calibrate_at,
            window_secs,
        } => {
            let reader: Box<dyn BufRead> = if input == "-" {
                Box::new(io::stdin().lock())
            } else {
                let file = std::fs::File::open(&input)
                    .with_context(|| format!("failed to open {input}"))?;
                Box::new(BufReader::new(file))
            };
            let opts = replay::ReplayOptions {
                frame_interval_ms,
                calibrate_at,
                window_secs,
                emit,
            };
            replay::run(config, reader, &mut io::stdout().lock(), &opts)?;
        }
        Commands::Watch {
            tick_ms,
            frames,
            no_theme,
        } => {
            let handle = engine::spawn_engine(Session::new(config)?)?;
            let opts = watch::WatchOptions {
                tick: Duration::from_millis(tick_ms.max(1)),
                emit_frames: frames,
                theme: !no_theme,
            };
            watch::run(handle, io::stdout(), opts).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
