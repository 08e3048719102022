mod api;
mod config;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use wird_calendar::{AladhanClient, PrayerTimeResolver};
use wird_channels::{TelegramChannel, TelegramInbound};
use wird_config::{
    config_dir, config_file_path, load_and_prepare, write_config, ValidationReport, WirdConfig,
};
use wird_core::{CommandSink, Location, SubscriberId, TimeOfDay};
use wird_logging::init_logger;
use wird_media::FsContentResolver;
use wird_scheduler::{Clock, DeliveryEngine, SystemClock, TriggerRegistry, WirdService};
use wird_store::SqliteSubscriberStore;

use api::AppState;
use terminal_output::{note_error, note_success, note_warn, render_table};

#[derive(Parser)]
#[command(name = "wird")]
#[command(about = "Wird: Qur'an and azkar reminders for Telegram")]
#[command(version)]
struct Cli {
    /// Config file (default: $WIRD_CONFIG_DIR/config.yaml or ~/.wird/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: scheduled reminders, Telegram polling, admin API
    Serve,
    /// Fire one trigger now and exit
    Trigger {
        /// Trigger name, e.g. `morning_azkar` or `daily_wird_12345`
        name: String,
    },
    /// Show a subscriber's rotating delivery settings
    Preview { subscriber_id: SubscriberId },
    /// Print today's prayer times and the derived trigger times
    PrayerTimes {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    if let Commands::Init { force } = cli.command {
        return init(&path, force).await;
    }

    let (config, report) = load_and_prepare(&path).await?;
    let _guard = init_logger(
        config.logging.dir.as_deref().unwrap_or("logs"),
        config.logging.level.as_deref().unwrap_or("info"),
    );
    // load_and_prepare logged before the subscriber existed
    log_report(&report);

    match cli.command {
        Commands::Serve => serve(config, &report).await,
        Commands::Trigger { name } => trigger(config, &report, &name).await,
        Commands::Preview { subscriber_id } => preview(config, subscriber_id).await,
        Commands::PrayerTimes { city, country } => prayer_times(config, city, country).await,
        Commands::Init { .. } => Ok(()),
    }
}

fn log_report(report: &ValidationReport) {
    for warning in &report.warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        error!(path = %error.path, message = %error.message, "Config error");
    }
}

fn require_valid(report: &ValidationReport) -> Result<()> {
    if report.is_valid() {
        return Ok(());
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    bail!("configuration has {} error(s)", report.errors.len())
}

fn calendar(config: &WirdConfig) -> Result<Arc<PrayerTimeResolver>> {
    let timeout = Duration::from_secs(config.calendar.timeout_secs);
    let source = AladhanClient::new(config.calendar.base_url.clone(), timeout)?;
    Ok(Arc::new(PrayerTimeResolver::new(Arc::new(source), timeout)))
}

/// Wire the engine. The channel is only used for sending when a trigger fires.
fn build_service(config: &WirdConfig, channel: &TelegramChannel) -> Result<WirdService> {
    let store = SqliteSubscriberStore::open(&config.storage.db_path)
        .with_context(|| format!("Failed to open database {}", config.storage.db_path))?;
    let content = FsContentResolver::new(&config.content.images_dir, &config.content.pdf_dir);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let engine = DeliveryEngine::new(
        Arc::new(store),
        Arc::new(content),
        Arc::new(channel.clone()),
        calendar(config)?,
        clock.clone(),
        config::engine_settings(config),
    );
    Ok(WirdService::new(TriggerRegistry::new(clock), Arc::new(engine)))
}

async fn serve(config: WirdConfig, report: &ValidationReport) -> Result<()> {
    require_valid(report)?;
    let channel = TelegramChannel::new(config::bot_token(&config)?);
    let service = build_service(&config, &channel)?;

    info!(
        db = %config.storage.db_path,
        location = %config::default_location(&config),
        utc_offset = config.schedule.utc_offset_hours,
        "Starting Wird reminder engine"
    );
    let mut rng = StdRng::from_entropy();
    service.start(&mut rng).await?;

    if config.api.enabled {
        let app = api::build_router(Arc::new(AppState {
            service: service.clone(),
        }))
        .layer(TraceLayer::new_for_http());
        let listener = TcpListener::bind(&config.api.bind)
            .await
            .with_context(|| format!("Failed to bind admin API on {}", config.api.bind))?;
        info!(addr = %config.api.bind, "Admin API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Admin API stopped");
            }
        });
    }

    let sink: Arc<dyn CommandSink> = Arc::new(service.clone());
    TelegramInbound::new(&channel, sink).run().await?;

    info!("Shutting down");
    service.shutdown();
    Ok(())
}

async fn trigger(config: WirdConfig, report: &ValidationReport, name: &str) -> Result<()> {
    require_valid(report)?;
    let channel = TelegramChannel::new(config::bot_token(&config)?);
    let service = build_service(&config, &channel)?;

    // Registration derives the same names the server would use.
    let mut rng = StdRng::from_entropy();
    service.start(&mut rng).await?;
    let result = service.trigger_now(name).await;
    let known: Vec<String> = service.triggers().into_iter().map(|t| t.name).collect();
    service.shutdown();

    match result {
        Ok(()) => {
            note_success(&format!("Fired {name}"));
            Ok(())
        }
        Err(e) => {
            note_warn(&format!("Known triggers: {}", known.join(", ")));
            Err(e.into())
        }
    }
}

async fn preview(config: WirdConfig, id: SubscriberId) -> Result<()> {
    // Reads the store only; nothing is sent.
    let channel = TelegramChannel::new(config.telegram.bot_token.clone().unwrap_or_default());
    let service = build_service(&config, &channel)?;
    let preview = service.get_delivery_preview(id).await?;
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

async fn prayer_times(
    config: WirdConfig,
    city: Option<String>,
    country: Option<String>,
) -> Result<()> {
    let default = config::default_location(&config);
    let location = Location::new(
        city.unwrap_or(default.city),
        country.unwrap_or(default.country),
    );
    let calendar = calendar(&config)?;
    let offset = config.schedule.prayer_offset_minutes;

    let rows: Vec<Vec<String>> = calendar
        .resolve(&location)
        .await
        .into_iter()
        .map(|(prayer, raw)| {
            let adjusted = raw
                .parse::<TimeOfDay>()
                .map(|t| t.adjust(offset).to_string())
                .unwrap_or_else(|_| "invalid".to_string());
            vec![prayer.name().to_string(), raw, adjusted]
        })
        .collect();

    let trigger_header = format!("Trigger ({offset:+}m)");
    println!("{location} (UTC{:+})", config.schedule.utc_offset_hours);
    print!(
        "{}",
        render_table(&["Prayer", "Source", trigger_header.as_str()], &rows)
    );

    match calendar.today().await {
        Some(date) => {
            println!("\nHijri: {} {} {}", date.day, date.month_name, date.year);
            if let Some((_, label)) = calendar.today_occasion().await {
                println!("Occasion: {label}");
            }
        }
        None => note_warn("Hijri calendar unavailable"),
    }
    Ok(())
}

async fn init(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        note_warn(&format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
        return Ok(());
    }
    let mut config = wird_config::defaults::apply_all_defaults_with(WirdConfig::default(), None);
    config.telegram.bot_token = Some("${BOT_TOKEN}".to_string());
    write_config(&config, path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
