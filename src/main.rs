use std::sync::Arc;

use membergate::app::App;
use membergate::broadcast::BroadcastCoordinator;
use membergate::config::Config;
use membergate::gateway::{MessagingGateway, TelegramGateway};
use membergate::onboarding::{OnboardingFlow, SessionStore, spawn_idle_sweep};
use membergate::store::{AirtableStore, ContactStore};

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

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Required: MEMBERGATE_BOT_TOKEN, AIRTABLE_API_KEY,");
        eprintln!("            AIRTABLE_BASE_ID, AIRTABLE_TABLE_NAME");
        std::process::exit(1);
    });

    eprintln!("🚪 Membergate v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Table: {}/{}", config.airtable_base_id, config.airtable_table_name);
    eprintln!("   Channel: {}", config.channel_link);
    eprintln!(
        "   Operators: {}",
        if config.operators.is_empty() {
            "none (broadcasts disabled)".to_string()
        } else {
            config
                .operators
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
    );

    let store: Arc<dyn ContactStore> = Arc::new(AirtableStore::new(
        config.airtable_api_key,
        config.airtable_base_id.clone(),
        config.airtable_table_name.clone(),
    ));

    let telegram = TelegramGateway::new(config.bot_token);
    let events = telegram.start();
    let gateway: Arc<dyn MessagingGateway> = Arc::new(telegram);

    let sessions = Arc::new(SessionStore::new(config.session_idle_timeout));
    let _sweep_handle = spawn_idle_sweep(Arc::clone(&sessions));

    let flow = Arc::new(OnboardingFlow::new(
        Arc::clone(&gateway),
        Arc::clone(&store),
        sessions,
        config.channel_link.clone(),
    ));

    let coordinator = Arc::new(BroadcastCoordinator::new(
        Arc::clone(&gateway),
        store,
        config.operators.clone(),
    ));

    let app = App::new(gateway, flow, coordinator);
    app.run(events).await;

    Ok(())
}
