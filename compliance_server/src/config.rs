use std::{env, io::Write};

use log::*;
use rand::{distributions::Alphanumeric, Rng};
use scp_common::{parse_boolean_flag, Secret};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_SCE_HOST: &str = "127.0.0.1";
const DEFAULT_SCE_PORT: u16 = 8480;
const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:9480";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Bearer secret for the `/cron` endpoints. The scheduler presents this on every sweep call.
    pub cron_secret: Secret<String>,
    /// Connection details for the payment-operations service that executes refunds, recoveries
    /// and collateral transfers.
    pub provider: ProviderConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather
    /// than the connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SCE_HOST.to_string(),
            port: DEFAULT_SCE_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            cron_secret: Secret::new(random_secret()),
            provider: ProviderConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SCE_HOST").ok().unwrap_or_else(|| DEFAULT_SCE_HOST.into());
        let port = env::var("SCE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SCE_PORT. {e} Using the default, {DEFAULT_SCE_PORT}, instead."
                    );
                    DEFAULT_SCE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SCE_PORT);
        let database_url = env::var("SCE_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SCE_DATABASE_URL is not set. Please set it to the URL for the compliance database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let cron_secret = env::var("SCE_CRON_SECRET").map(Secret::new).unwrap_or_else(|_| {
            warn!(
                "🚨️ SCE_CRON_SECRET is not set. A random value is used for this session, so the scheduler will not \
                 be able to trigger any sweeps until it is configured."
            );
            Secret::new(random_secret())
        });
        let provider = ProviderConfig::from_env_or_default();
        let use_x_forwarded_for = parse_boolean_flag(env::var("SCE_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SCE_USE_FORWARDED").ok(), false);
        Self { host, port, database_url, auth, cron_secret, provider, use_x_forwarded_for, use_forwarded }
    }
}

//-------------------------------------------------  ProviderConfig  ---------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct ProviderConfig {
    /// Base URL of the payment-operations service.
    pub base_url: String,
    pub access_token: Secret<String>,
}

impl ProviderConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("SCE_PROVIDER_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SCE_PROVIDER_URL is not set. Using the default, {DEFAULT_PROVIDER_URL}.");
            DEFAULT_PROVIDER_URL.into()
        });
        let access_token = env::var("SCE_PROVIDER_ACCESS_TOKEN").map(Secret::new).unwrap_or_else(|_| {
            error!(
                "🪛️ SCE_PROVIDER_ACCESS_TOKEN is not set. Refunds and recoveries will be rejected by the \
                 payment-operations service until it is configured."
            );
            Secret::default()
        });
        Self { base_url, access_token }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
/// The shared secret the API gateway uses to sign the identity headers it forwards with each
/// request. The gateway and this server must hold the same value.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub gateway_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The gateway signing secret has not been set. I'm using a random value for this session. DO NOT \
             operate on production like this, since no gateway will be able to authenticate requests. 🚨️🚨️🚨️"
        );
        let secret = random_secret();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "gateway_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The gateway secret for this session was written to {}. If this is a production \
                         instance, you are doing it wrong! Set the SCE_GATEWAY_SECRET environment variable instead. \
                         🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the gateway secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the gateway secret.");
            },
        }
        Self { gateway_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("SCE_GATEWAY_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [SCE_GATEWAY_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "SCE_GATEWAY_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { gateway_secret: Secret::new(secret) })
    }
}

fn random_secret() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}
