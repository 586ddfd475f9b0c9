use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
    pub credential_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub ice_servers: Vec<IceServerConfig>,
    pub ice_ttl_seconds: u32,
    /// How long a rejected call session lingers before returning to idle.
    pub call_reject_reset_ms: u64,
    pub s3: S3Config,
}

impl Config {
    fn parse_urls(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    fn default_stun_urls() -> Vec<String> {
        vec![
            "stun:stun.l.google.com:19302".to_string(),
            "stun:stun1.l.google.com:19302".to_string(),
        ]
    }

    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| Self::parse_urls(&v))
            .unwrap_or_else(|_| vec!["http://localhost:5173".to_string()]);

        // WebRTC ICE/TURN configuration
        let stun_urls_env =
            env::var("RTC_STUN_URLS").unwrap_or_else(|_| Self::default_stun_urls().join(","));
        let stun_urls = Self::parse_urls(&stun_urls_env);

        let turn_urls = env::var("RTC_TURN_URLS")
            .ok()
            .map(|value| Self::parse_urls(&value))
            .unwrap_or_default();
        let turn_username = env::var("RTC_TURN_USERNAME").ok();
        let turn_password = env::var("RTC_TURN_PASSWORD").ok();
        let credential_type = env::var("RTC_TURN_CREDENTIAL_TYPE").ok();

        let mut ice_servers: Vec<IceServerConfig> = Vec::new();
        if !stun_urls.is_empty() {
            ice_servers.push(IceServerConfig {
                urls: stun_urls,
                username: None,
                credential: None,
                credential_type: None,
            });
        }
        if !turn_urls.is_empty() {
            ice_servers.push(IceServerConfig {
                urls: turn_urls,
                username: turn_username,
                credential: turn_password.clone(),
                credential_type: match (&turn_password, &credential_type) {
                    (Some(_), Some(t)) => Some(t.clone()),
                    (Some(_), None) => Some("password".to_string()),
                    _ => None,
                },
            });
        }

        let ice_ttl_seconds = env::var("ICE_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let call_reject_reset_ms = env::var("CALL_REJECT_RESET_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);

        // S3 configuration for the media asset store
        let s3 = S3Config {
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "chat-media".to_string()),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("S3_ENDPOINT").ok(),
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
        };

        Ok(Self {
            database_url,
            port,
            cors_origins,
            ice_servers,
            ice_ttl_seconds,
            call_reject_reset_ms,
            s3,
        })
    }
}
