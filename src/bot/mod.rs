use std::sync::Arc;

use tracing::info;

use crate::bot::{chat_event::chat_event::InboundEvent, commands::commands::BotResult, handler::handler::handle_event, state::def::AppState};

pub mod state;
pub mod chat_event;
pub mod dispatcher;
pub mod commands;
pub mod platforms;
pub mod permissions;
pub mod db;
pub mod guild;
pub mod handler;
pub mod ratelimit;
pub mod replies;
pub mod runtime;
pub mod scheduler;

/// Handles every inbound event on its own task until the transport hangs up.
pub async fn run_event_loop(state: Arc<AppState>, mut rx: tokio::sync::mpsc::UnboundedReceiver<InboundEvent>) -> BotResult<()> {
    while let Some(event) = rx.recv().await {
        if state.should_quit() {
            break;
        }
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_event(state, event).await {
                tracing::error!("Event error: {e:?}");
            }
        });
    }

    info!("Event loop stopped");
    Ok(())
}
