use serde::Deserialize;

/// Rules a candidate password has to satisfy.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub special_chars: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 14,
            special_chars: "!@#$%^&*()_+-=[]{}|;:,.<>?".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub access_token_ttl_minutes: i64,
    pub reset_token_ttl_hours: i64,
    pub password: PasswordPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub project_name: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            secret_key: std::env::var("SECRET_KEY")?,
            access_token_ttl_minutes: std::env::var("ACCESS_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            reset_token_ttl_hours: std::env::var("RESET_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
            password: PasswordPolicy::default(),
        };
        Ok(Self {
            database_url,
            project_name: std::env::var("PROJECT_NAME").unwrap_or_else(|_| "Portao".into()),
            auth,
        })
    }
}
