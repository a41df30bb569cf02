use crate::email_client::TransportMode;
use config::{
    builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, Value,
};
use derive_getters::Getters;
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time::Duration;

pub const DEFAULT_TARGET_EMAIL: &str = "shreyash@certiswift.in";
pub const FALLBACK_FROM_EMAIL: &str = "noreply@portfolio.local";

/// Retrive the configuration for the application.
///
/// Values are read from an optional `configuration.yaml` and then from the
/// environment, where `SMTP_HOST` is looked up as `smtp_host` and so on.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    build_settings(
        Config::builder()
            .add_source(File::new("configuration.yaml", FileFormat::Yaml).required(false))
            .add_source(Environment::default().ignore_empty(true)),
    )
}

/// Build settings from the given keys alone, on top of the defaults.
/// Keys are named like the lower-cased environment variables, e.g. `smtp_port`.
pub fn settings_from<K, V>(
    overrides: impl IntoIterator<Item = (K, V)>,
) -> Result<Settings, ConfigError>
where
    K: AsRef<str>,
    V: Into<Value>,
{
    let builder = overrides
        .into_iter()
        .try_fold(Config::builder(), |builder, (key, value)| {
            builder.set_override(key, value)
        })?;
    build_settings(builder)
}

fn build_settings(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    builder
        .build()?
        .try_deserialize::<RawSettings>()
        .map(Settings::from)
}

#[derive(Debug, Clone, Getters)]
pub struct Settings {
    application: ApplicationSettings,
    database: DatabaseSettings,
    smtp: SmtpSettings,
}

#[derive(Debug, Clone, Getters)]
pub struct ApplicationSettings {
    host: String,
    port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Getters)]
pub struct DatabaseSettings {
    url: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone, Getters)]
pub struct SmtpSettings {
    host: Option<String>,
    port: u16,
    user: Option<String>,
    password: Option<Secret<String>>,
    timeout: Duration,
    target_email: String,
    from_email: String,
}

impl SmtpSettings {
    /// Host, user and password must all be present for a send to be attempted.
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.user.is_some() && self.password.is_some()
    }

    pub fn mode(&self) -> TransportMode {
        TransportMode::from_port(self.port)
    }

    /// The credentials used to authenticate against the SMTP server, if any.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                Some((user.clone(), password.expose_secret().clone()))
            }
            _ => None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application: ApplicationSettings {
                host: "0.0.0.0".to_string(),
                port: default_port(),
            },
            database: DatabaseSettings::default(),
            smtp: SmtpSettings {
                host: None,
                port: default_smtp_port(),
                user: None,
                password: None,
                timeout: Duration::from_secs(default_smtp_timeout_secs()),
                target_email: DEFAULT_TARGET_EMAIL.to_string(),
                from_email: FALLBACK_FROM_EMAIL.to_string(),
            },
        }
    }
}

/// Flat view of the configuration sources, keyed like the environment.
#[derive(Debug, serde::Deserialize)]
struct RawSettings {
    host: Option<String>,
    #[serde(default = "default_port", deserialize_with = "deserialize_number_from_string")]
    port: u16,
    database_url: Option<String>,
    database_name: Option<String>,
    smtp_host: Option<String>,
    #[serde(
        default = "default_smtp_port",
        deserialize_with = "deserialize_number_from_string"
    )]
    smtp_port: u16,
    smtp_user: Option<String>,
    smtp_pass: Option<Secret<String>>,
    #[serde(
        default = "default_smtp_timeout_secs",
        deserialize_with = "deserialize_number_from_string"
    )]
    smtp_timeout_secs: u64,
    target_email: Option<String>,
    from_email: Option<String>,
}

fn default_port() -> u16 {
    8000
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout_secs() -> u64 {
    10
}

/// Empty values are treated the same as missing ones.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let smtp_user = non_empty(raw.smtp_user);
        let smtp_pass = raw
            .smtp_pass
            .filter(|p| !p.expose_secret().is_empty());
        let from_email = non_empty(raw.from_email)
            .or_else(|| smtp_user.clone())
            .unwrap_or_else(|| FALLBACK_FROM_EMAIL.to_string());

        Self {
            application: ApplicationSettings {
                host: non_empty(raw.host).unwrap_or_else(|| "0.0.0.0".to_string()),
                port: raw.port,
            },
            database: DatabaseSettings {
                url: non_empty(raw.database_url),
                name: non_empty(raw.database_name),
            },
            smtp: SmtpSettings {
                host: non_empty(raw.smtp_host),
                port: raw.smtp_port,
                user: smtp_user,
                password: smtp_pass,
                timeout: Duration::from_secs(raw.smtp_timeout_secs),
                target_email: non_empty(raw.target_email)
                    .unwrap_or_else(|| DEFAULT_TARGET_EMAIL.to_string()),
                from_email,
            },
        }
    }
}
