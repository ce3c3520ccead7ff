//! Application configuration management.
//!
//! Sources are layered: `config/default.toml`, then `config/{RUN_MODE}.toml`,
//! then `RENTFLOW__`-prefixed environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Payment routing and validation settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Escrow release policy.
    #[serde(default)]
    pub escrow: EscrowConfig,
    /// Reminder and escalation policy.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Job runner schedule and retry policy.
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Payment gateway credentials.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// SMTP settings for the email channel.
    #[serde(default)]
    pub email: EmailConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
///
/// When `url` is absent the server falls back to the in-memory ledger store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Payment routing and validation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum tolerated difference between a paid amount and the monthly rent.
    #[serde(default = "default_amount_epsilon")]
    pub amount_epsilon: Decimal,
    /// ISO 4217 code used for wallets and gateway charges.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Smallest withdrawal a landlord may request.
    #[serde(default = "default_min_withdrawal")]
    pub min_withdrawal: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            amount_epsilon: default_amount_epsilon(),
            currency: default_currency(),
            min_withdrawal: default_min_withdrawal(),
        }
    }
}

fn default_amount_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_min_withdrawal() -> Decimal {
    Decimal::new(1000, 0)
}

/// Escrow release policy.
#[derive(Debug, Clone, Deserialize)]
pub struct EscrowConfig {
    /// Months of accumulation after which a bucket is released.
    #[serde(default = "default_release_months")]
    pub release_months: u32,
    /// Release a bucket once its contract has expired (plus grace).
    #[serde(default = "default_true")]
    pub release_on_expiry: bool,
    /// Days after contract expiry before the bucket is released.
    #[serde(default = "default_escrow_grace_days")]
    pub grace_period_days: u32,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            release_months: default_release_months(),
            release_on_expiry: true,
            grace_period_days: default_escrow_grace_days(),
        }
    }
}

fn default_release_months() -> u32 {
    12
}

fn default_escrow_grace_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

/// Reminder and escalation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Days before the due date for the early reminder.
    #[serde(default = "default_early_reminder_days")]
    pub early_reminder_days: u32,
    /// Days past the due date before a payment counts as overdue.
    #[serde(default)]
    pub overdue_grace_days: u32,
    /// Days-overdue values on which an escalation is sent.
    #[serde(default = "default_overdue_offsets")]
    pub overdue_offsets: Vec<u32>,
    /// Window, in days, for the contract expiry warning.
    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            early_reminder_days: default_early_reminder_days(),
            overdue_grace_days: 0,
            overdue_offsets: default_overdue_offsets(),
            expiry_warning_days: default_expiry_warning_days(),
        }
    }
}

fn default_early_reminder_days() -> u32 {
    3
}

fn default_overdue_offsets() -> Vec<u32> {
    vec![1, 3, 7, 14]
}

fn default_expiry_warning_days() -> u32 {
    30
}

/// Job runner schedule and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Whether the server starts the scheduled jobs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// UTC wall-clock time (`HH:MM`) at which daily jobs fire.
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
    /// Weekday on which weekly jobs fire (`mon`, `tue`, ...).
    #[serde(default = "default_weekly_on")]
    pub weekly_on: String,
    /// Attempts per job run before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay in milliseconds.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Upper bound for a single retry delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_at: default_daily_at(),
            weekly_on: default_weekly_on(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_daily_at() -> String {
    "00:00".to_string()
}

fn default_weekly_on() -> String {
    "mon".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway API base URL.
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    /// Secret key used for API calls and webhook signatures.
    #[serde(default)]
    pub secret_key: String,
    /// URL the gateway redirects the payer to after checkout.
    pub callback_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            secret_key: String::new(),
            callback_url: None,
            timeout_secs: default_gateway_timeout(),
        }
    }
}

fn default_gateway_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_gateway_timeout() -> u64 {
    30
}

/// SMTP configuration for the email notification channel.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_email() -> String {
    "noreply@rentflow.local".to_string()
}

fn default_from_name() -> String {
    "Rentflow".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("RENTFLOW")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("notifications.overdue_offsets")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
