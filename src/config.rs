//! Probe configuration. The base URL and user id ship with the defaults the
//! probe was written against; the bearer token is a credential and must come
//! from the environment.

use thiserror::Error;

pub const BASE_URL_ENV: &str = "ROTATE_PROBE_BASE_URL";
pub const API_KEY_ENV: &str = "ROTATE_PROBE_API_KEY";
pub const USER_ID_ENV: &str = "ROTATE_PROBE_USER_ID";

pub const DEFAULT_BASE_URL: &str = "http://14.103.237.160:29876";
pub const DEFAULT_USER_ID: &str = "Bubble_Lis";

pub const UPLOAD_ROTATE_PATH: &str = "/rorschach/analyze/upload_rotate";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; export the analysis service bearer token")]
    MissingApiKey(&'static str),
}

#[derive(Clone, Debug)]
pub struct ProbeConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_id: String,
}

impl ProbeConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            user_id: user_id.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingApiKey(API_KEY_ENV))?;
        let user_id = std::env::var(USER_ID_ENV).unwrap_or_else(|_| DEFAULT_USER_ID.to_string());
        Ok(Self::new(base_url, api_key, user_id))
    }

    pub fn upload_rotate_url(&self) -> String {
        format!("{}{}", self.base_url, UPLOAD_ROTATE_PATH)
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}
