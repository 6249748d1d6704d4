use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_MAIL_FROM: &str = "Flight Booking <no-reply@flight-booking.local>";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Session cookies are only sent over HTTPS when set
    pub cookie_secure: bool,

    // Outgoing mail; console delivery when no SMTP host is configured
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,

    // Admin account created at startup
    pub admin: Option<AdminCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_source(&config)
    }

    fn from_source(config: &config::Config) -> Result<Self, config::ConfigError> {
        let smtp = match optional::<String>(config, "smtp_host")? {
            Some(host) => Some(SmtpConfig {
                host,
                port: optional(config, "smtp_port")?.unwrap_or(DEFAULT_SMTP_PORT),
                username: optional(config, "smtp_username")?,
                password: optional::<String>(config, "smtp_password")?.map(Secret::new),
            }),
            None => None,
        };

        let admin = match (
            optional::<String>(config, "admin_email")?,
            optional::<String>(config, "admin_password")?,
        ) {
            (Some(email), Some(password)) => Some(AdminCredentials {
                email,
                password: Secret::new(password),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: config.get("database_url")?,
            host: optional(config, "host")?.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: config.get("port")?,

            cookie_secure: optional(config, "cookie_secure")?.unwrap_or(true),

            smtp,
            mail_from: optional(config, "mail_from")?
                .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),

            admin,
        })
    }
}

/// `None` for a missing key; malformed values are still an error
fn optional<T: DeserializeOwned>(
    config: &config::Config,
    key: &str,
) -> Result<Option<T>, config::ConfigError> {
    match config.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
