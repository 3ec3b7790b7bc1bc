use std::collections::HashSet;

use classbot_core::classroom::ClassroomClient;
use classbot_core::config::AuthConfig;

use crate::telegram::TelegramClient;

pub(crate) struct BotContext {
    client: TelegramClient,
    auth_config: AuthConfig,
    classroom: ClassroomClient,
    allowlist_user_ids: HashSet<i64>,
}

impl BotContext {
    pub(crate) fn new(
        client: TelegramClient,
        auth_config: AuthConfig,
        classroom: ClassroomClient,
        allowlist_user_ids: HashSet<i64>,
    ) -> Self {
        Self {
            client,
            auth_config,
            classroom,
            allowlist_user_ids,
        }
    }

    pub(crate) fn client(&self) -> &TelegramClient {
        &self.client
    }

    pub(crate) fn auth_config(&self) -> &AuthConfig {
        &self.auth_config
    }

    pub(crate) fn classroom(&self) -> &ClassroomClient {
        &self.classroom
    }

    pub(crate) fn allowlist_user_ids(&self) -> &HashSet<i64> {
        &self.allowlist_user_ids
    }
}
