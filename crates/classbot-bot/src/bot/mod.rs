pub(crate) mod context;

use std::sync::Arc;

pub(crate) use context::BotContext;

use crate::handlers::message::handle_message;
use crate::telegram::Message;

/// Each update runs as one independent task; there is no queueing or mutual
/// exclusion between commands. Two concurrent commands that both miss the
/// saved credential can both start a consent flow and race on the write
/// (last writer wins) — a known limitation for a single-operator bot.
pub(crate) fn dispatch_message(context: &Arc<BotContext>, message: Message) {
    let context = Arc::clone(context);
    tokio::spawn(async move {
        if let Err(err) = handle_message(context.as_ref(), message).await {
            tracing::error!("Message handling error: {err}");
        }
    });
}
