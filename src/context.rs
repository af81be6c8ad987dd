/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    location::{DayResolver, GeocodeClient},
    mailer::Mailer,
    votes::{Aggregator, VoteMachine, VoteStore},
    weather::WeatherClient,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub vote_store: Arc<VoteStore>,
    pub vote_machine: Arc<VoteMachine>,
    pub aggregator: Arc<Aggregator>,
    pub day_resolver: Arc<DayResolver>,
    pub weather: Arc<WeatherClient>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize database
        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        // Initialize account manager
        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));

        // Initialize voting services
        let vote_store = Arc::new(VoteStore::new(db.clone()));
        let vote_machine = Arc::new(VoteMachine::new(Arc::clone(&vote_store)));
        let aggregator = Arc::new(Aggregator::new(Arc::clone(&vote_store)));

        // Initialize outbound clients
        let geocoder = GeocodeClient::new(&config.geocoding)?;
        let day_resolver = Arc::new(DayResolver::new(geocoder));
        let weather = Arc::new(WeatherClient::new(&config.weather)?);

        // Initialize mailer
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            db,
            account_manager,
            vote_store,
            vote_machine,
            aggregator,
            day_resolver,
            weather,
            mailer,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Public base URL for links in outbound email
    pub fn service_url(&self) -> String {
        match &self.config.service.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "http://{}:{}",
                self.config.service.hostname, self.config.service.port
            ),
        }
    }
}
