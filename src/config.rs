//! Process configuration, loaded from environment variables at startup.
//!
//! Every setting has a development default so a bare `cargo run` against a
//! local MongoDB works. The JWT secret default is for development only and
//! is logged loudly when used.

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

const DEV_SECRET: &str = "your-secret-key-here";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub database: String,
    pub jwt_secret: String,
    pub cors_origin: String,
    pub model_dir: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "5000"),
            mongo_uri: try_load("MONGODB_URI", "mongodb://localhost:27017"),
            database: try_load("MONGODB_DATABASE", "heart_disease_db"),
            jwt_secret: load_secret(),
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:5173"),
            model_dir: try_load::<PathBuf>("MODEL_DIR", "model"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn load_secret() -> String {
    env::var("SECRET_KEY").unwrap_or_else(|_| {
        warn!("SECRET_KEY not set, using development default; do not deploy like this");
        DEV_SECRET.to_string()
    })
}
