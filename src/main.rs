use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;

use review_outreach::channels::cli::CLI_SENDER;
use review_outreach::channels::{CliChannel, Notifier, TwilioNotifier};
use review_outreach::config::{AppConfig, CheckpointBackend};
use review_outreach::drafting::{AnthropicSummarizer, StatsSummarizer, Summarizer, TemplateDrafter};
use review_outreach::reviews::{GoogleBusinessClient, MockReviewSource, ReviewSource};
use review_outreach::routes::app_routes;
use review_outreach::scheduler;
use review_outreach::store::{CheckpointStore, LibSqlCheckpointStore, MemoryCheckpointStore};
use review_outreach::workflow::{
    ConfirmationStore, RandomCodeGenerator, WorkflowDeps, WorkflowEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("⭐ Review Outreach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   HTTP: http://0.0.0.0:{}", config.port);

    // ── Review source ─────────────────────────────────────────────────────
    let google = match (&config.google, config.use_mock_data) {
        (Some(google_config), false) => Some(Arc::new(
            GoogleBusinessClient::new(google_config.clone())
                .context("failed to build Google client")?,
        )),
        _ => None,
    };
    let source: Arc<dyn ReviewSource> = match &google {
        Some(client) => {
            eprintln!("   Reviews: Google Business Profile");
            eprintln!("   OAuth: http://localhost:{}/auth", config.port);
            client.clone()
        }
        None => {
            if !config.use_mock_data {
                tracing::warn!("GOOGLE_CLIENT_ID not set; serving mock reviews");
            }
            eprintln!("   Reviews: mock data");
            Arc::new(MockReviewSource::new())
        }
    };

    // ── Summaries and drafts ──────────────────────────────────────────────
    let summarizer: Arc<dyn Summarizer> = match &config.anthropic {
        Some(anthropic) => {
            eprintln!("   Summaries: {}", anthropic.model);
            Arc::new(
                AnthropicSummarizer::new(anthropic.clone())
                    .context("failed to build Anthropic summarizer")?,
            )
        }
        None => {
            eprintln!("   Summaries: offline stats (ANTHROPIC_API_KEY not set)");
            Arc::new(StatsSummarizer::new())
        }
    };

    // ── Notifications ─────────────────────────────────────────────────────
    let cli = Arc::new(CliChannel::new());
    let notifier: Arc<dyn Notifier> = match &config.twilio {
        Some(twilio) => {
            eprintln!("   SMS: Twilio → {}", twilio.to_number);
            Arc::new(TwilioNotifier::new(twilio.clone()))
        }
        None => {
            eprintln!("   SMS: disabled, notifications print to stdout");
            cli.clone()
        }
    };

    // ── Checkpoint ────────────────────────────────────────────────────────
    let checkpoints: Arc<dyn CheckpointStore> = match &config.checkpoint {
        CheckpointBackend::Memory => {
            eprintln!("   Checkpoint: in memory");
            Arc::new(MemoryCheckpointStore::new())
        }
        CheckpointBackend::File(path) => {
            eprintln!("   Checkpoint: {}", path.display());
            Arc::new(
                LibSqlCheckpointStore::new_local(path)
                    .await
                    .context("failed to open checkpoint database")?,
            )
        }
    };

    // ── Engine ────────────────────────────────────────────────────────────
    let mut allowed_senders = config.allowed_senders.clone();
    if config.cli {
        allowed_senders.push(CLI_SENDER.to_string());
    }
    if allowed_senders.is_empty() {
        tracing::warn!("No allowed SMS senders configured; inbound commands will be ignored");
    }

    let engine = Arc::new(
        WorkflowEngine::with_confirmations(
            WorkflowDeps {
                source,
                summarizer,
                drafter: Arc::new(TemplateDrafter::new()),
                notifier,
                checkpoints,
            },
            ConfirmationStore::with_generator(Box::new(RandomCodeGenerator), config.max_pending),
        )
        .with_allowed_senders(allowed_senders),
    );

    let _ticker = scheduler::spawn_daily_ticker(Arc::clone(&engine), config.schedule.clone());
    eprintln!("   Daily run: scheduled ({})", config.schedule.timezone());

    if config.cli {
        eprintln!("   CLI: type REPLY1, SKIP1, YES<code>, NO<code>\n");
        let mut lines = cli.start();
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            while let Some(msg) = lines.next().await {
                engine.on_inbound_message(&msg.content, &msg.sender).await;
            }
            tracing::info!("stdin closed");
        });
    }

    let app = app_routes(engine, google);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
