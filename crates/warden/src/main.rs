use std::sync::Arc;

use teloxide::Bot;
use tokio::sync::mpsc;
use tracing::info;

use warden_core::{
    audit::AuditLogger,
    config::Config,
    engine::ModerationEngine,
    transport::{
        port::TransportPort,
        throttled::{ThrottleConfig, ThrottledTransport},
    },
};
use warden_telegram::TelegramTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_core::logging::init("warden");

    let cfg = Arc::new(Config::load()?);
    let bot = Bot::new(cfg.bot_token.clone());

    let telegram: Arc<dyn TransportPort> = Arc::new(TelegramTransport::connect(bot.clone()).await?);
    let transport: Arc<dyn TransportPort> = Arc::new(ThrottledTransport::new(
        telegram,
        ThrottleConfig {
            global_min_interval: cfg.throttle_global,
            per_chat_min_interval: cfg.throttle_per_chat,
        },
    ));

    let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
    info!(audit_log = %audit.path().display(), "starting moderation engine");

    let engine = ModerationEngine::new(cfg, transport, audit);

    let (tx, rx) = mpsc::channel(256);
    let engine_task = tokio::spawn(async move { engine.run(rx).await });

    warden_telegram::listener::run_polling(bot, tx).await?;

    engine_task.await?;
    Ok(())
}
