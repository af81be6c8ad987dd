/// Configuration management for the TopTen Weather service
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub weather: WeatherConfig,
    pub geocoding: GeocodingConfig,
    pub email: Option<EmailConfig>,
    pub reminder: ReminderConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public base URL used in emailed links (defaults to http://hostname:port)
    pub public_url: Option<String>,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Weather provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_url: String,
    pub api_key: String,
}

/// Geocoding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub api_url: String,
    /// Nominatim rejects requests without a User-Agent
    pub user_agent: String,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Vote reminder job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("TOPTEN_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("TOPTEN_PORT")
            .unwrap_or_else(|_| "8100".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("TOPTEN_PUBLIC_URL").ok();
        let version = env::var("TOPTEN_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("TOPTEN_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("TOPTEN_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("votes.sqlite"));

        let jwt_secret = env::var("TOPTEN_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;

        let weather_api_url = env::var("TOPTEN_WEATHER_API_URL")
            .unwrap_or_else(|_| "https://api.weatherapi.com/v1".to_string());
        let weather_api_key = env::var("TOPTEN_WEATHER_API_KEY")
            .map_err(|_| AppError::Validation("Weather API key required".to_string()))?;

        let geocoding_api_url = env::var("TOPTEN_GEOCODING_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());
        let geocoding_user_agent = env::var("TOPTEN_GEOCODING_USER_AGENT")
            .unwrap_or_else(|_| format!("topten-weather/{}", version));

        let email = if let Ok(smtp_url) = env::var("TOPTEN_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("TOPTEN_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let reminder_enabled = env::var("TOPTEN_REMINDER_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let reminder_interval = env::var("TOPTEN_REMINDER_INTERVAL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            auth: AuthConfig { jwt_secret },
            weather: WeatherConfig {
                api_url: weather_api_url,
                api_key: weather_api_key,
            },
            geocoding: GeocodingConfig {
                api_url: geocoding_api_url,
                user_agent: geocoding_user_agent,
            },
            email,
            reminder: ReminderConfig {
                enabled: reminder_enabled,
                interval_secs: reminder_interval,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.weather.api_key.is_empty() {
            return Err(AppError::Validation(
                "Weather API key cannot be empty".to_string(),
            ));
        }

        if self.reminder.interval_secs == 0 {
            return Err(AppError::Validation(
                "Reminder interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
