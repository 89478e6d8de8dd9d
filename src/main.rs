mod app;
mod chain;
mod config;
mod dashboard;
mod error;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::{App, Popup};
use chain::api::DashboardApi;
use chain::governor::GovernorClient;
use config::AppConfig;
use dashboard::loader::DashboardLoader;
use dashboard::Address;

#[derive(Parser, Debug)]
#[command(name = "daoboard")]
#[command(version)]
#[command(about = "A terminal dashboard for the DAOs, auctions and live proposals of a wallet")]
struct Args {
    /// Wallet address to load (overrides the saved account)
    #[arg(short, long)]
    address: Option<Address>,

    /// Base URL of the dashboard API
    #[arg(long)]
    api_url: Option<String>,

    /// Print the dashboard once as JSON and exit
    #[arg(short, long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json)?;

    let config = AppConfig::load()?;
    let address = args.address.clone().or_else(|| config.address.clone());

    // CLI overrides apply to this run only, never to the saved file
    let api_url = args.api_url.clone().unwrap_or_else(|| config.api_base_url.clone());
    let loader = DashboardLoader::new(DashboardApi::new(api_url), GovernorClient::new(config.rpc_urls()));

    if args.json {
        return print_dashboard(&loader, address).await;
    }

    run_tui(config, loader, address).await
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("daoboard=info"))
}

/// Log to stderr in JSON mode, otherwise to a file so the TUI stays intact
fn init_logging(to_stderr: bool) -> Result<()> {
    if to_stderr {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(env_filter())
            .init();
        return Ok(());
    }

    let path = log_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(env_filter())
        .init();
    Ok(())
}

fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("daoboard")
        .join("daoboard.log")
}

async fn print_dashboard(
    loader: &DashboardLoader<DashboardApi, GovernorClient>,
    address: Option<Address>,
) -> Result<()> {
    let Some(address) = address else {
        anyhow::bail!("No address given; pass --address or connect one in the TUI first");
    };

    let daos = loader.assemble(&address).await?;
    println!("{}", serde_json::to_string_pretty(&daos)?);
    Ok(())
}

async fn run_tui(
    config: AppConfig,
    loader: DashboardLoader<DashboardApi, GovernorClient>,
    address: Option<Address>,
) -> Result<()> {
    tracing::info!("Starting daoboard");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(config, loader, address);

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.status_message = Some(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Apply finished loads, scheduled refreshes
        if let Err(e) = app.tick().await {
            tracing::warn!("Tick failed: {}", e);
        }
    }
}
