use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use classbot_core::classroom::ClassroomClient;
use classbot_core::config::Config;

use crate::bot::{BotContext, dispatch_message};
use crate::telegram::{TelegramClient, TelegramSettings};

mod bot;
mod commands;
mod handlers;
mod telegram;

pub async fn run() -> Result<()> {
    let config = Config::load().map_err(|err| anyhow!("Failed to load classbot config: {err}"))?;
    let settings = TelegramSettings::from_config(&config)?;
    let config_path = classbot_core::config::paths::config_path();
    if config_path.exists() {
        tracing::info!("Config file: {}", config_path.display());
    }
    run_bot(&config, settings).await
}

async fn run_bot(config: &Config, settings: TelegramSettings) -> Result<()> {
    let client = TelegramClient::new(settings.bot_token);
    let context = Arc::new(BotContext::new(
        client.clone(),
        config.auth_config(),
        ClassroomClient::new(),
        settings.allowlist_user_ids,
    ));

    let mut offset: Option<i64> = None;
    let poll_timeout = Duration::from_secs(30);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(
        "classbot started. Allowlist: {} user(s). Polling for updates...",
        context.allowlist_user_ids().len()
    );

    loop {
        let current_offset = offset;
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down Telegram bot.");
                break;
            }
            updates = client.get_updates(current_offset, poll_timeout) => {
                let updates = match updates {
                    Ok(updates) => updates,
                    Err(err) => {
                        tracing::warn!("Telegram polling error: {err}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(message) = update.message {
                        dispatch_message(&context, message);
                    }
                }
            }
        }
    }

    Ok(())
}
