use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

mod aggregate;
mod calendar;
mod charts;
mod heatmap;
mod loader;
mod models;
mod report;
mod style;

use loader::Columns;
use models::MessageRecord;
use style::RenderConfig;

#[derive(Parser)]
#[command(name = "chat-activity-charts")]
#[command(about = "Charts and statistics from a chat-log export", long_about = None)]
struct Cli {
    /// CSV export with one row per message
    #[arg(long, global = true, default_value = "data/msg.csv")]
    input: PathBuf,
    #[arg(long, global = true, default_value = "StrTime")]
    time_column: String,
    #[arg(long, global = true, default_value = "NickName")]
    sender_column: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct RenderArgs {
    #[arg(long, default_value = "figs")]
    out_dir: PathBuf,
    /// Font file used for every label
    #[arg(long, env = "CHAT_CHARTS_FONT", default_value = style::DEFAULT_FONT_PATH)]
    font: PathBuf,
    /// Comma-separated sender colours, e.g. "#FF6B6B,#4ECDC4"
    #[arg(long, value_delimiter = ',')]
    palette: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print message statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Draw the overall and per-year message share pies
    Ratio {
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Draw the hour-of-day charts
    Hourly {
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Draw one calendar heatmap per year
    Heatmap {
        #[command(flatten)]
        render: RenderArgs,
        /// Quantile of daily counts used as the top of the colour scale
        #[arg(long, default_value_t = 0.95)]
        percentile: f64,
    },
    /// Draw every chart, then print statistics
    All {
        #[command(flatten)]
        render: RenderArgs,
        #[arg(long, default_value_t = 0.95)]
        percentile: f64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let columns = Columns {
        time: cli.time_column.clone(),
        sender: cli.sender_column.clone(),
    };
    let messages = loader::load_messages(&cli.input, &columns)?;

    match cli.command {
        Commands::Stats { json } => print_stats(&messages, json)?,
        Commands::Ratio { render } => {
            let config = prepare(&render)?;
            draw_ratio(&messages, &render.out_dir, &config)?;
        }
        Commands::Hourly { render } => {
            let config = prepare(&render)?;
            draw_hourly(&messages, &render.out_dir, &config)?;
        }
        Commands::Heatmap { render, percentile } => {
            let config = prepare(&render)?;
            draw_heatmaps(&messages, percentile, &render.out_dir, &config)?;
        }
        Commands::All { render, percentile } => {
            let config = prepare(&render)?;
            draw_ratio(&messages, &render.out_dir, &config)?;
            draw_heatmaps(&messages, percentile, &render.out_dir, &config)?;
            draw_hourly(&messages, &render.out_dir, &config)?;
            print_stats(&messages, false)?;
        }
    }

    Ok(())
}

fn prepare(render: &RenderArgs) -> anyhow::Result<RenderConfig> {
    std::fs::create_dir_all(&render.out_dir)
        .with_context(|| format!("failed to create {}", render.out_dir.display()))?;
    let font = style::resolve_font(&render.font, style::FALLBACK_FONT_PATHS)?;
    let mut config = RenderConfig::with_font(&font);
    if !render.palette.is_empty() {
        config.palette = render
            .palette
            .iter()
            .map(|hex| style::hex_color(hex))
            .collect::<anyhow::Result<_>>()?;
    }
    Ok(config)
}

fn print_stats(messages: &[MessageRecord], json: bool) -> anyhow::Result<()> {
    let stats = report::collect_stats(messages)?;
    if json {
        println!("{}", report::build_json(&stats)?);
    } else {
        print!("{}", report::build_report(&stats));
    }
    Ok(())
}

fn draw_ratio(messages: &[MessageRecord], out_dir: &Path, config: &RenderConfig) -> anyhow::Result<()> {
    let senders = aggregate::sender_counts(messages);
    charts::render_sender_pie(&senders, &out_dir.join("chat_ratio.png"), config)?;

    let yearly = aggregate::yearly_sender_counts(messages);
    charts::render_yearly_pies(&yearly, &out_dir.join("yearly_sender_ratio.png"), config)?;
    Ok(())
}

fn draw_hourly(messages: &[MessageRecord], out_dir: &Path, config: &RenderConfig) -> anyhow::Result<()> {
    let hours = aggregate::hourly_counts(messages);
    charts::render_hourly(&hours, &out_dir.join("hourly_distribution.png"), config)?;

    let by_sender = aggregate::hourly_by_sender(messages);
    charts::render_hourly_comparison(&by_sender, &out_dir.join("hourly_comparison.png"), config)?;
    Ok(())
}

fn draw_heatmaps(
    messages: &[MessageRecord],
    percentile: f64,
    out_dir: &Path,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let daily = aggregate::daily_counts(messages)?;
    let plan = heatmap::plan_heatmaps(&daily, percentile, &aggregate::years(&daily))?;
    heatmap::render_heatmaps(
        &plan.calendars,
        plan.vmax,
        &out_dir.join("yearly_heatmaps.png"),
        config,
    )
}
