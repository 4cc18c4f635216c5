use std::env;
use std::sync::Arc;

use auth::PasswordHasher;
use auth::TokenCodec;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::identity::errors::SettingsError;
use crate::identity::models::AuthSettings;
use crate::identity::ports::CredentialStore;
use crate::identity::ports::ResetTokenStore;
use crate::identity::ports::RevocationLedger;
use crate::identity::service::AuthService;

/// Minimum length of the token signing secret, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub tokens: TokensConfig,
    pub password_reset: PasswordResetConfig,
    #[serde(default)]
    pub password_hashing: PasswordHashingConfig,
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokensConfig {
    pub secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordResetConfig {
    pub ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordHashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MaintenanceConfig {
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TOKENS__SECRET, MAINTENANCE__SWEEP_INTERVAL_SECONDS, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: TOKENS__ACCESS_TTL_SECONDS=300 overrides tokens.access_ttl_seconds
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }

    /// Validated token and reset lifetimes.
    pub fn auth_settings(&self) -> Result<AuthSettings, SettingsError> {
        AuthSettings::new(
            chrono::Duration::seconds(self.tokens.access_ttl_seconds),
            chrono::Duration::seconds(self.tokens.refresh_ttl_seconds),
            chrono::Duration::minutes(self.password_reset.ttl_minutes),
        )
    }

    pub fn token_codec(&self) -> Result<TokenCodec, SettingsError> {
        let secret = self.tokens.secret.as_bytes();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(SettingsError::SecretTooShort {
                min: MIN_SECRET_BYTES,
                actual: secret.len(),
            });
        }

        Ok(TokenCodec::new(secret))
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher, SettingsError> {
        let hashing = &self.password_hashing;
        PasswordHasher::with_params(hashing.memory_kib, hashing.iterations, hashing.parallelism)
            .map_err(|e| SettingsError::PasswordHashing(e.to_string()))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.maintenance.sweep_interval_seconds)
    }

    /// Wire an authentication service over the given stores using this
    /// configuration's secret, hashing parameters and lifetimes.
    pub fn build_service<CS, RL, RS>(
        &self,
        credentials: Arc<CS>,
        ledger: Arc<RL>,
        reset_tokens: Arc<RS>,
    ) -> Result<AuthService<CS, RL, RS>, SettingsError>
    where
        CS: CredentialStore,
        RL: RevocationLedger,
        RS: ResetTokenStore,
    {
        let settings = self.auth_settings()?;
        let codec = self.token_codec()?;
        let hasher = self.password_hasher()?;

        tracing::info!(
            access_ttl_seconds = settings.access_ttl().num_seconds(),
            refresh_ttl_seconds = settings.refresh_ttl().num_seconds(),
            reset_ttl_minutes = settings.reset_ttl().num_minutes(),
            "Authentication service configured"
        );

        Ok(AuthService::new(
            credentials,
            ledger,
            reset_tokens,
            codec,
            hasher,
            settings,
        ))
    }
}
