use std::{net::SocketAddr, sync::Arc};

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    update_listeners::webhooks,
};

use url::Url;

use pmbot_core::{
    config::Config,
    kv::KvStore,
    messaging::port::MessagingPort,
    moderation::ModerationWorkflow,
    relay::RelayRouter,
    verification::{VerificationEngine, VerificationSettings},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub verification: Arc<VerificationEngine>,
    pub relay: Arc<RelayRouter>,
    pub moderation: Arc<ModerationWorkflow>,
}

/// Build the bot, wire the services, and run the dispatcher until shutdown.
///
/// `WEBHOOK_URL` picks the transport: set, the webhook is registered with
/// Telegram (secret token enforced on every delivery) and an axum listener
/// serves it; unset, the bot long-polls.
pub async fn run(cfg: Config, kv: Arc<dyn KvStore>) -> anyhow::Result<()> {
    let cfg = Arc::new(cfg);
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!("pmbot started: @{}", me.username());
    }
    tracing::info!(admins = cfg.admin_ids.len(), captcha = cfg.captcha_enabled);

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let verification = Arc::new(VerificationEngine::new(
        kv.clone(),
        messenger.clone(),
        VerificationSettings::from_config(&cfg),
    ));
    let relay = Arc::new(RelayRouter::new(
        kv.clone(),
        messenger.clone(),
        cfg.relay_index_ttl,
    ));
    let moderation = Arc::new(ModerationWorkflow::new(
        kv,
        messenger.clone(),
        cfg.captcha_max_attempts,
    ));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        messenger,
        verification,
        relay,
        moderation,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .build();

    match &cfg.webhook_url {
        Some(raw_url) => {
            let url = Url::parse(raw_url)
                .map_err(|e| anyhow::anyhow!("invalid WEBHOOK_URL {raw_url}: {e}"))?;
            let addr = SocketAddr::from(([0, 0, 0, 0], cfg.webhook_port));

            let mut options = webhooks::Options::new(addr, url);
            if let Some(secret) = &cfg.webhook_secret {
                options = options.secret_token(secret.clone());
            }

            tracing::info!(%addr, "serving webhook");
            let listener = webhooks::axum(bot, options)
                .await
                .map_err(|e| anyhow::anyhow!("failed to register webhook: {e}"))?;

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("update listener error"),
                )
                .await;
        }
        None => {
            tracing::info!("long polling for updates");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
