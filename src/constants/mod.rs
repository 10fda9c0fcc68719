use std::str::FromStr;

use crate::modules::connection::suggestion::SuggestionWeights;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;

#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error("{0} must be set in .env file or environment variable")]
    Missing(&'static str),
    #[error("{0} has an invalid value")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct Env {
    pub jwt_secret: String,
    pub access_token_expiration: u64,
    pub database_url: String,
    pub database_max_connections: u32,
    pub frontend_urls: Vec<String>,
    pub ip: String,
    pub port: u16,
    pub suggestion_pool_size: i64,
    pub suggestion_weights: SuggestionWeights,
}

fn required(key: &'static str) -> Result<String, EnvError> {
    std::env::var(key).map_err(|_| EnvError::Missing(key))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, EnvError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| EnvError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

impl Env {
    pub fn load() -> Result<Self, EnvError> {
        let jwt_secret = required("SECRET_KEY")?;
        let access_token_expiration = parse_or("ACCESS_TOKEN_EXPIRATION", 900u64)?;

        let database_url = required("DATABASE_URL")?;
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let frontend_urls = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("PORT", 8080u16)?;

        let suggestion_pool_size = parse_or("SUGGESTION_POOL_SIZE", 500i64)?;
        if suggestion_pool_size < 1 {
            return Err(EnvError::Invalid("SUGGESTION_POOL_SIZE"));
        }

        let defaults = SuggestionWeights::default();
        let suggestion_weights = SuggestionWeights {
            mutual: parse_or("SUGGESTION_WEIGHT_MUTUAL", defaults.mutual)?,
            university: parse_or("SUGGESTION_WEIGHT_UNIVERSITY", defaults.university)?,
            major: parse_or("SUGGESTION_WEIGHT_MAJOR", defaults.major)?,
            interest: parse_or("SUGGESTION_WEIGHT_INTEREST", defaults.interest)?,
        };

        Ok(Env {
            jwt_secret,
            access_token_expiration,
            database_url,
            database_max_connections,
            frontend_urls,
            ip,
            port,
            suggestion_pool_size,
            suggestion_weights,
        })
    }
}
