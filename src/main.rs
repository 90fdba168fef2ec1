use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use contango::{config::Settings, dashboard, page::render_html, pipeline::Pipeline};

#[derive(Debug, Parser)]
#[command(name = "contango", version, about = "VIX futures term-structure dashboard")]
struct Cli {
    /// Override FUTURES_TABLE_INDEX
    #[arg(long, global = true)]
    table_index: Option<usize>,

    /// Override SPOT_HISTORY_PATH
    #[arg(long, global = true)]
    history: Option<String>,

    /// Keep a trailing zero-priced contract (DROP_UNTRADED_FRONT=false)
    #[arg(long, global = true)]
    keep_untraded_front: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scrape once and write the dashboard page
    Render {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Scrape once and print the normalized quote table as JSON
    Quotes,
    /// Serve the dashboard, re-scraping on every page load
    Serve {
        /// Override DASHBOARD_PORT
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(i) = cli.table_index {
        settings.futures_table_index = i;
    }
    if let Some(h) = cli.history {
        settings.spot_history_path = Some(h);
    }
    if cli.keep_untraded_front {
        settings.drop_untraded_front = false;
    }

    log::info!(
        "app.start futures_url={} table_index={} spot_url={} history={}",
        settings.futures_url,
        settings.futures_table_index,
        settings.spot_url.as_deref().unwrap_or("-"),
        settings.spot_history_path.as_deref().unwrap_or("-")
    );

    match cli.command {
        Command::Render { out } => {
            let html = blocking(settings, |p| {
                let dash = p.run()?;
                Ok(render_html(&dash.page)?)
            })
            .await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, html)
                        .with_context(|| format!("write {}", path.display()))?;
                    log::info!("render.written path={}", path.display());
                }
                None => println!("{html}"),
            }
        }
        Command::Quotes => {
            let json = blocking(settings, |p| {
                let table = p.fetch_quotes()?;
                Ok(serde_json::to_string_pretty(&table)?)
            })
            .await?;
            println!("{json}");
        }
        Command::Serve { port } => {
            if let Some(p) = port {
                settings.dashboard_port = p;
                settings.validate()?;
            }
            dashboard::serve_dashboard(settings).await?;
        }
    }
    Ok(())
}

/// Run `f` against a fresh pipeline on tokio's blocking pool.
async fn blocking<T, F>(settings: Settings, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Pipeline) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::new(settings)?;
        f(&pipeline)
    })
    .await
    .context("pipeline task")?
}
