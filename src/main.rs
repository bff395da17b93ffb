use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use session_telemetry::adapter::{BotAdapter, SimulatedBot};
use session_telemetry::heartbeat::{self, HeartbeatExit};
use session_telemetry::{
    HttpTransport, NotificationType, SessionController, TelemetryConfig, Transport,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "telemetry")]
#[command(about = "Reports a bot session to a remote coordination server")]
#[command(version)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SESSION_TELEMETRY_GIT_SHA"), ")"))]
struct Cli {
    /// Config file (defaults to ~/.session-telemetry/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Developer token (overrides config and SESSION_TELEMETRY_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Operator name reported to the server
    #[arg(long, global = true, default_value = "operator")]
    operator: String,

    /// Bot name reported to the server
    #[arg(long, global = true, default_value = "simulated-bot")]
    bot_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated bot session with a live heartbeat
    Run {
        /// Status text sent on every heartbeat
        #[arg(long, default_value = "Running")]
        status: String,

        /// Display name the bot is logged in under
        #[arg(long)]
        login: Option<String>,

        /// Stop after this many heartbeats (runs until stopped otherwise)
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Send a one-shot notification
    Notify {
        #[arg(long)]
        title: String,

        #[arg(long)]
        message: String,

        /// general, error, warning, information or success
        #[arg(long, default_value = "general")]
        kind: NotificationType,
    },
    /// Tell the server the bot was paused locally
    Pause,
    /// Tell the server the bot was resumed locally
    Resume,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = TelemetryConfig::resolve(cli.config.as_deref())?;
    if let Some(token) = cli.token {
        config.token = Some(token);
    }
    let token = config
        .token
        .clone()
        .context("No token configured: pass --token or set SESSION_TELEMETRY_TOKEN")?;

    let bot = Arc::new(SimulatedBot::new(config.client, cli.operator, cli.bot_name));
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(Some(config.request_timeout())));

    let controller = {
        let config = config.clone();
        let bot: Arc<dyn BotAdapter> = bot.clone();
        tokio::task::spawn_blocking(move || {
            SessionController::new(&config, token, transport, bot)
        })
        .await
        .context("Session setup task failed")?
    };
    let controller = Arc::new(controller);

    match cli.command {
        Commands::Run {
            status,
            login,
            ticks,
        } => run_session(&config, controller, bot, status, login, ticks).await,
        Commands::Notify {
            title,
            message,
            kind,
        } => {
            let reply = blocking(move || controller.send_notification(&title, &message, kind)).await?;
            report_reply("Notification", reply);
            Ok(())
        }
        Commands::Pause => {
            let reply = blocking(move || controller.on_pause()).await?;
            report_reply("Pause", reply);
            Ok(())
        }
        Commands::Resume => {
            let reply = blocking(move || controller.on_resume()).await?;
            report_reply("Resume", reply);
            Ok(())
        }
    }
}

async fn run_session(
    config: &TelemetryConfig,
    controller: Arc<SessionController>,
    bot: Arc<SimulatedBot>,
    status: String,
    login: Option<String>,
    max_ticks: Option<u64>,
) -> Result<()> {
    let started = Instant::now();
    let ticks = Arc::new(AtomicU64::new(0));

    let should_stop = {
        let bot = bot.clone();
        let ticks = ticks.clone();
        move || bot.is_stopped() || max_ticks.is_some_and(|max| ticks.load(Ordering::SeqCst) >= max)
    };

    let on_tick = move || {
        let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
        controller.add_custom_metric("ticks", tick);
        let runtime = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let experience = i64::try_from(tick.saturating_mul(25)).unwrap_or(i64::MAX);
        controller.update(&status, experience, runtime, login.as_deref());
    };

    let handle = heartbeat::spawn(config.heartbeat_interval(), should_stop, on_tick);

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing current heartbeat");
            canceller.cancel();
        }
    });

    let report = handle.join().await?;
    match report.exit {
        HeartbeatExit::Stopped if bot.is_stopped() => tracing::info!(
            ticks = report.ticks,
            reason = %bot.stop_reason().unwrap_or_default(),
            "Bot stopped"
        ),
        HeartbeatExit::Failed => anyhow::bail!("Heartbeat failed after {} ticks", report.ticks),
        exit => tracing::info!(ticks = report.ticks, ?exit, "Session finished"),
    }
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Blocking request task failed")
}

fn report_reply(action: &str, reply: Option<String>) {
    match reply {
        Some(line) => println!("{} sent, server replied: {}", action, line),
        None => println!("{} not delivered, see log for details", action),
    }
}
