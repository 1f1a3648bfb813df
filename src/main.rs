use std::sync::Arc;

use tokio::sync::Mutex;

use zmime::handlers::{router, AppState};
use zmime::{create_tables, BlogStore, ConfigStore, OAuthProvider, PoolBuilder, SetupWizard};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("🚀 Starting ZMime CMS");

    let db_path = std::env::var("ZMIME_DB").unwrap_or_else(|_| "zmime.sqlite3".to_string());
    let pool = PoolBuilder::new().path(&db_path).open().await?;
    create_tables(&pool).await?;
    println!("✅ Database initialized at {db_path}");

    let config_store = ConfigStore::new(pool);
    let config = config_store.load().await?;
    if config.is_setup_complete() {
        println!("✅ Setup complete, blog: {}", config.blog_title());
    } else {
        println!("🔧 Setup not finished yet, visit /setup to get started");
    }

    let http = reqwest::Client::new();
    let state = AppState {
        store: Arc::new(BlogStore::from_config(&config, http.clone())),
        config: config_store,
        wizard: Arc::new(Mutex::new(SetupWizard::new())),
        supabase_oauth: Arc::new(OAuthProvider::supabase_from_env()),
        netlify_oauth: Arc::new(OAuthProvider::netlify_from_env()),
        http,
        blog_title: config.blog_title().to_string(),
        blog_description: config.blog_description().to_string(),
    };

    let bind = std::env::var("ZMIME_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    println!("🌐 Listening on http://{bind}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
