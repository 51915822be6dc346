use std::path::{Path, PathBuf};

use beatlane_core::{
    autoplay, generate_chart, replay, AppConfig, AudioBuffer, Chart, FinalResult, ReplayLog,
    DEFAULT_TICK_INTERVAL,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> beatlane_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chart {
            input,
            output,
            seed,
        } => run_chart(&config, &input, output.as_deref(), seed),
        Commands::Autoplay {
            input,
            seed,
            offset_ms,
            save_replay,
        } => run_autoplay(&config, &input, seed, offset_ms, save_replay.as_deref()),
        Commands::Replay { chart, replay } => run_replay(&config, &chart, &replay),
    }
}

fn load_config(path: Option<&Path>) -> beatlane_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn build_chart(config: &AppConfig, input: &Path, seed: u64) -> beatlane_core::Result<Chart> {
    let audio = AudioBuffer::from_wav(input)?;
    tracing::info!(
        ?input,
        sample_rate = audio.sample_rate,
        seconds = audio.duration(),
        "decoded audio"
    );
    generate_chart(&audio, &config.detector, seed)
}

fn run_chart(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    seed: u64,
) -> beatlane_core::Result<()> {
    let chart = build_chart(config, input, seed)?;
    tracing::info!(notes = chart.len(), seed, "chart generated");

    match output {
        Some(output) => {
            std::fs::write(output, chart.to_json()?)?;
            tracing::info!(?output, "chart written");
        }
        None => {
            for note in chart.notes() {
                println!("{:>9.3}s  lane {}", note.time, note.lane);
            }
        }
    }
    Ok(())
}

fn run_autoplay(
    config: &AppConfig,
    input: &Path,
    seed: u64,
    offset_ms: f64,
    save_replay: Option<&Path>,
) -> beatlane_core::Result<()> {
    let chart = build_chart(config, input, seed)?;
    let (result, mut log) = autoplay(&chart, config, offset_ms / 1000.0, DEFAULT_TICK_INTERVAL)?;
    log.seed = Some(seed);
    print_result(&result);

    if let Some(path) = save_replay {
        std::fs::write(path, log.to_json()?)?;
        tracing::info!(?path, presses = log.presses.len(), "replay written");
    }
    Ok(())
}

fn run_replay(config: &AppConfig, chart: &Path, log: &Path) -> beatlane_core::Result<()> {
    let chart = Chart::from_json(&std::fs::read_to_string(chart)?)?;
    let log = ReplayLog::from_json(&std::fs::read_to_string(log)?)?;
    tracing::info!(notes = chart.len(), presses = log.presses.len(), "replaying");

    let score = replay(&chart, &config.judge, &log);
    print_result(&FinalResult::from(score));
    Ok(())
}

fn print_result(result: &FinalResult) {
    let score = &result.score;
    println!("rank       {}", result.rank);
    println!("accuracy   {:.1}%", result.accuracy);
    println!("score      {}", score.score);
    println!("max combo  {}", score.max_combo);
    println!(
        "perfect {}  good {}  miss {}",
        score.perfect, score.good, score.miss
    );
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm charts from any recording", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a chart from a WAV file.
    Chart {
        /// Path to the WAV file to analyse.
        input: PathBuf,
        /// Where to write the chart as JSON. Prints the notes when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Seed for lane assignment.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },
    /// Generate a chart and play it back with simulated input.
    Autoplay {
        /// Path to the WAV file to analyse.
        input: PathBuf,
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        /// Shift every simulated press by this many milliseconds.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        offset_ms: f64,
        /// Write the simulated presses as a replay log.
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Re-judge a recorded replay against a saved chart.
    Replay {
        /// Chart JSON written by `chart --output`.
        chart: PathBuf,
        /// Replay log JSON.
        replay: PathBuf,
    },
}
