//! # Rollcall — weekly attendance poll bot
//!
//! Posts a yes/no poll to one Telegram group every week, records the votes
//! and sends a morning reminder naming who is coming and who has not answered.
//!
//! Usage:
//!   rollcall                         # Serve (webhook or long polling + scheduler)
//!   rollcall send-poll               # Publish the poll now
//!   rollcall remind                  # Send the reminder now
//!   rollcall status                  # Print counts and answers from the data file
//!   rollcall check-config            # Validate config and show upcoming triggers

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use rollcall_channels::TelegramChannel;
use rollcall_core::config::{RollcallConfig, TransportMode};
use rollcall_core::traits::{PollStore, Transport};
use rollcall_gateway::AppState;
use rollcall_poll::{PollService, ReminderOutcome, SendOutcome};
use rollcall_scheduler::{JobKind, JsonFileStore, SchedulerEngine, spawn_scheduler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "⛪ Rollcall — weekly attendance poll bot for Telegram groups"
)]
struct Cli {
    /// Config file (default: ~/.rollcall/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: HTTP gateway, update intake and scheduler
    Serve,
    /// Publish the poll immediately (ignores the same-day guard)
    SendPoll,
    /// Send the reminder immediately
    Remind,
    /// Print the current answers
    Status,
    /// Validate the configuration and print the next trigger times
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "rollcall=debug,tower_http=debug"
    } else {
        "rollcall=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::SendPoll => {
            let service = build_service(&config, connected_channel(&config).await?)?;
            match service.send_poll(true).await? {
                SendOutcome::Sent(handle) => println!("✅ Poll sent (id {})", handle.poll_id),
                SendOutcome::AlreadySent => println!("⏭️ Poll already sent today"),
            }
            Ok(())
        }
        Commands::Remind => {
            let service = build_service(&config, connected_channel(&config).await?)?;
            match service.generate_reminder().await {
                ReminderOutcome::Sent { affirmative, missing } => {
                    println!("✅ Reminder sent ({affirmative} coming, {missing} missing)");
                    Ok(())
                }
                ReminderOutcome::Failed(reason) => anyhow::bail!("reminder failed: {reason}"),
            }
        }
        Commands::Status => {
            // Read-only: no Bot API calls are made.
            let channel = TelegramChannel::new((&config.telegram).into())?;
            let service = build_service(&config, channel)?;
            println!("{}\n\n{}", service.status_text(), service.answers_text());
            Ok(())
        }
        Commands::CheckConfig => {
            let engine = SchedulerEngine::from_config(&config.schedule)?;
            println!("✅ Config OK");
            println!("   Chat:      {}", config.telegram.chat_id);
            println!("   Mode:      {:?}", config.telegram.mode);
            println!("   Data file: {}", config.data_file().display());
            if config.telegram.mode == TransportMode::Webhook {
                println!("   Webhook:   {}", config.webhook_url());
            }
            println!("   Timezone:  {}", engine.timezone());
            for job in engine.list_jobs() {
                let next = job
                    .next_run
                    .map(|t| t.with_timezone(&engine.timezone()).to_string())
                    .unwrap_or_else(|| "never".into());
                println!("   {:<20} {:<14} next: {next}", job.name, job.schedule.expression());
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<RollcallConfig> {
    let mut config = match path {
        Some(p) => RollcallConfig::load_from(p)?,
        None => RollcallConfig::load()?,
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

async fn connected_channel(config: &RollcallConfig) -> Result<TelegramChannel> {
    let mut channel = TelegramChannel::new((&config.telegram).into())?;
    channel.connect().await?;
    Ok(channel)
}

fn build_service(config: &RollcallConfig, channel: TelegramChannel) -> Result<PollService> {
    let store: Arc<dyn PollStore> = Arc::new(JsonFileStore::new(config.data_file()));
    let transport: Arc<dyn Transport> = Arc::new(channel);
    Ok(PollService::new(store, transport, config)?)
}

async fn run_job(service: &PollService, kind: JobKind) {
    match kind {
        JobKind::SendPoll => match service.send_poll(false).await {
            Ok(SendOutcome::Sent(_)) => {}
            Ok(SendOutcome::AlreadySent) => tracing::debug!("Scheduled send skipped"),
            Err(e) => tracing::error!("❌ Scheduled poll send failed: {e}"),
        },
        JobKind::Reminder => {
            service.generate_reminder().await;
        }
    }
}

async fn serve(config: RollcallConfig) -> Result<()> {
    let channel = connected_channel(&config).await?;
    let bot_username = channel.bot_username().map(str::to_string);

    let updates = match config.telegram.mode {
        TransportMode::Webhook => {
            let url = config.webhook_url();
            channel
                .set_webhook(&url, Some(config.telegram.webhook_secret.as_str()))
                .await?;
            tracing::info!("🔗 Webhook registered: {url}");
            None
        }
        TransportMode::Polling => {
            channel.delete_webhook().await?;
            Some(channel.clone().start_polling())
        }
    };

    let service = Arc::new(build_service(&config, channel)?);
    tracing::info!(
        "📋 Serving chat {} (data file: {})",
        config.telegram.chat_id,
        config.data_file().display()
    );

    let engine = SchedulerEngine::from_config(&config.schedule)?;
    let scheduled = service.clone();
    tokio::spawn(spawn_scheduler(
        engine,
        config.schedule.check_interval_secs,
        move |kind| {
            let service = scheduled.clone();
            async move { run_job(&service, kind).await }
        },
    ));

    let state = AppState::new(
        service.clone(),
        bot_username,
        Some(config.telegram.webhook_secret.clone()),
    );
    let server = rollcall_gateway::start(&config.gateway, state);

    let intake = async {
        match updates {
            Some(mut stream) => {
                while let Some(event) = stream.next().await {
                    service.handle_event(event).await;
                }
                tracing::warn!("⚠️ Telegram update stream ended");
            }
            // Webhook mode: updates arrive through the gateway.
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => result,
        _ = intake => Ok(()),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("👋 Shutting down");
            Ok(())
        }
    }
}
