use std::{
    env,
    fmt::{self, Display},
    str::FromStr,
};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const DB_PATH_VAR: &str = "LATEPLATE_DB";
pub const JWT_SECRET_VAR: &str = "LATEPLATE_JWT_SECRET";
pub const SEED_VAR: &str = "LATEPLATE_SEED";

pub const DEFAULT_DB_PATH: &str = "lateplate.db";

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    /// HS256 secret bearer tokens are signed with
    pub jwt_secret: Option<String>,
    /// Default k-means seed for requests that carry none
    pub seed: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup(DB_PATH_VAR).unwrap_or_else(|| {
            info!("{DB_PATH_VAR} not set, using default: {DEFAULT_DB_PATH}");
            DEFAULT_DB_PATH.to_string()
        });

        let jwt_secret = lookup(JWT_SECRET_VAR).filter(|s| !s.is_empty());
        if jwt_secret.is_none() {
            warn!("{JWT_SECRET_VAR} not set, clustering requests will be rejected");
        }

        Ok(Self {
            db_path,
            jwt_secret,
            seed: try_parse(&lookup, SEED_VAR)?,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("seed", &self.seed)
            .finish()
    }
}

fn try_parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                warn!("Invalid {key} value: {e}");
                anyhow::anyhow!("{e}")
            })
        })
        .transpose()
        .with_context(|| format!("Environment misconfigured: {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.db_path, "lateplate.db");
        assert_eq!(config.jwt_secret, None);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup_from(&[
            (DB_PATH_VAR, "/tmp/plates.db"),
            (JWT_SECRET_VAR, "s3cret "),
            (SEED_VAR, "42"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, "/tmp/plates.db");
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret "));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_empty_secret_counts_as_unset() {
        let config = Config::from_lookup(lookup_from(&[(JWT_SECRET_VAR, "")])).unwrap();
        assert_eq!(config.jwt_secret, None);
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = Config::from_lookup(lookup_from(&[(JWT_SECRET_VAR, "hunter2")])).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_bad_seed_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[(SEED_VAR, "forty-two")])).unwrap_err();
        assert!(err.to_string().contains(SEED_VAR));
    }
}
