use std::sync::Arc;

use notes_backend::config::{create_cors_layer, StorageBackend};
use notes_backend::store::{MemoryStore, NoteStore, PgStore, UserStore};
use notes_backend::{router, AppData, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    config.log_configuration();

    let (users, notes): (Arc<dyn UserStore>, Arc<dyn NoteStore>) = match config.storage {
        StorageBackend::Postgres => {
            let store = Arc::new(PgStore::connect(&config.database_url).await?);
            store.init_schema().await?;
            log::info!("Connected to database");
            let users: Arc<dyn UserStore> = store.clone();
            let notes: Arc<dyn NoteStore> = store;
            (users, notes)
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            let users: Arc<dyn UserStore> = store.clone();
            let notes: Arc<dyn NoteStore> = store;
            (users, notes)
        }
    };

    let app_state = AppData::new(users, notes, &config)?;
    let app = router(app_state, create_cors_layer(&config.cors_origins));

    log::info!("Notes server starting on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
