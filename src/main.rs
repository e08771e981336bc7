use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use confidant::config::AppConfig;
use confidant::core::conversation::ConversationService;
use confidant::core::llm::GoogleProvider;
use confidant::database::Database;
use confidant::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = confidant::core::logging::init();
    info!("Confidant v{} starting", confidant::VERSION);

    let config = AppConfig::load().context("failed to load configuration")?;
    if config.llm.api_key.is_empty() {
        anyhow::bail!("no LLM API key configured (set CONFIDANT_LLM__API_KEY)");
    }

    let db = Database::new(&config.data_dir())
        .await
        .context("failed to open database")?;

    let provider = Arc::new(GoogleProvider::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
    ));

    let service = Arc::new(ConversationService::new(
        db.clone(),
        provider,
        config.chat_settings(),
    ));

    let addr = config.bind_addr().context("invalid bind address")?;
    server::serve(addr, AppState::new(db, service))
        .await
        .context("server error")?;

    Ok(())
}
