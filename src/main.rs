use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use procpulse::config::{Config, load_config, load_config_from_path};
use procpulse::report::{JsonFrame, render_text};
use procpulse::{MonitorView, Sampler, SortKey, SysinfoSource};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "procpulse",
    about = "Sample system rates, rolling history and the process table"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// System summary interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Process snapshot interval in milliseconds
    #[arg(long)]
    process_interval_ms: Option<u64>,

    /// Number of history points kept
    #[arg(long)]
    history: Option<usize>,

    /// Process order: cpu, memory
    #[arg(long)]
    sort: Option<String>,

    /// Number of processes printed per cycle
    #[arg(long)]
    top: Option<usize>,

    /// Print one JSON object per cycle instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Stop after this many cycles (0 runs until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    iterations: u64,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let config = load_config_for_cli(&cli);
    config.validate()?;

    run(config, cli.iterations).await
}

async fn run(config: Config, iterations: u64) -> Result<()> {
    let sort = config.display.sort_key();
    let json = config.display.output == "json";
    let top = config.display.top;

    let handle = Sampler::new(SysinfoSource::new(), &config.sampler).spawn();
    let view = handle.view();
    let mut cycles = view.subscribe();
    let mut printed = 0u64;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                let sequence = *cycles.borrow_and_update();
                debug!(sequence, "printing cycle");
                print_frame(&view, sort, top, json)?;
                printed += 1;
                if iterations > 0 && printed >= iterations {
                    break;
                }
            }
        }
    }

    let completed = handle.shutdown().await?;
    info!(completed, "sampler shut down");
    Ok(())
}

fn print_frame(view: &MonitorView, sort: SortKey, top: usize, json: bool) -> Result<()> {
    let sample = view.latest_system_sample();
    let history = view.history_points();
    let snapshot = view.reorder(&view.latest_process_snapshot(), sort);

    if json {
        println!("{}", JsonFrame::new(&sample, &history, &snapshot, top).to_line()?);
    } else {
        println!(
            "{}\n",
            render_text(&sample, &history, view.history_capacity(), &snapshot, top)
        );
    }
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("procpulse=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(ms) = cli.interval_ms {
        config.sampler.summary_interval_ms = ms;
    }
    if let Some(ms) = cli.process_interval_ms {
        config.sampler.process_interval_ms = ms;
    }
    if let Some(capacity) = cli.history {
        config.sampler.history_capacity = capacity;
    }
    if let Some(ref sort) = cli.sort {
        config.display.default_sort = sort.clone();
    }
    if let Some(top) = cli.top {
        config.display.top = top;
    }
    if cli.json {
        config.display.output = "json".to_string();
    }

    config
}
