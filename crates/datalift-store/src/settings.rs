//! Object store connection settings
//!
//! Values given explicitly (from the config file) win; anything missing is
//! read from `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY`, `MINIO_SECRET_KEY`,
//! `MINIO_REGION` and `MINIO_USE_SSL`.

use std::fmt;

use datalift_core::StorageError;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Partially specified settings, as read from configuration.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub secure: Option<bool>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// `host:port` or a full URL
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Use https when `endpoint` carries no scheme
    pub secure: bool,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .field("secure", &self.secure)
            .finish()
    }
}

impl StoreSettings {
    pub fn resolve(options: &StoreOptions) -> Result<Self, StorageError> {
        Self::resolve_with(options, |name| std::env::var(name).ok())
    }

    fn resolve_with(
        options: &StoreOptions,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StorageError> {
        let pick = |value: &Option<String>, var: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
        };
        let required = |value: &Option<String>, var: &str| {
            pick(value, var).ok_or_else(|| {
                StorageError::Config(format!("{var} is not set and no value is configured"))
            })
        };

        let secure = match options.secure {
            Some(secure) => secure,
            None => env("MINIO_USE_SSL").is_some_and(|v| parse_bool(&v)),
        };

        Ok(Self {
            endpoint: required(&options.endpoint, "MINIO_ENDPOINT")?,
            access_key: required(&options.access_key, "MINIO_ACCESS_KEY")?,
            secret_key: required(&options.secret_key, "MINIO_SECRET_KEY")?,
            region: pick(&options.region, "MINIO_REGION")
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            secure,
        })
    }

    /// Endpoint with a scheme, as the S3 client expects it.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            return self.endpoint.clone();
        }
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn env_fallback() {
        let env = env_of(&[
            ("MINIO_ENDPOINT", "localhost:9000"),
            ("MINIO_ACCESS_KEY", "minio"),
            ("MINIO_SECRET_KEY", "minio123"),
            ("MINIO_USE_SSL", "false"),
        ]);
        let s = StoreSettings::resolve_with(&StoreOptions::default(), env).unwrap();
        assert_eq!(s.endpoint, "localhost:9000");
        assert_eq!(s.region, DEFAULT_REGION);
        assert!(!s.secure);
        assert_eq!(s.endpoint_url(), "http://localhost:9000");
    }

    #[test]
    fn explicit_values_win() {
        let options = StoreOptions {
            endpoint: Some("minio.internal:9000".into()),
            access_key: Some("ak".into()),
            secret_key: Some("sk".into()),
            region: Some("eu-west-1".into()),
            secure: Some(true),
        };
        let env = env_of(&[("MINIO_ENDPOINT", "ignored:1"), ("MINIO_USE_SSL", "false")]);
        let s = StoreSettings::resolve_with(&options, env).unwrap();
        assert_eq!(s.endpoint_url(), "https://minio.internal:9000");
        assert_eq!(s.region, "eu-west-1");
    }

    #[test]
    fn missing_endpoint_is_config_error() {
        let err = StoreSettings::resolve_with(&StoreOptions::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, StorageError::Config(ref m) if m.contains("MINIO_ENDPOINT")));
    }

    #[test]
    fn blank_value_falls_back_to_env() {
        let options = StoreOptions {
            endpoint: Some("  ".into()),
            ..Default::default()
        };
        let env = env_of(&[
            ("MINIO_ENDPOINT", "from-env:9000"),
            ("MINIO_ACCESS_KEY", "a"),
            ("MINIO_SECRET_KEY", "b"),
        ]);
        let s = StoreSettings::resolve_with(&options, env).unwrap();
        assert_eq!(s.endpoint, "from-env:9000");
    }

    #[test]
    fn endpoint_with_scheme_kept() {
        let s = StoreSettings {
            endpoint: "https://s3.example.com".into(),
            access_key: "a".into(),
            secret_key: "b".into(),
            region: DEFAULT_REGION.into(),
            secure: false,
        };
        assert_eq!(s.endpoint_url(), "https://s3.example.com");
    }

    #[test]
    fn debug_redacts_secret() {
        let s = StoreSettings {
            endpoint: "e".into(),
            access_key: "a".into(),
            secret_key: "hunter2".into(),
            region: "r".into(),
            secure: false,
        };
        assert!(!format!("{s:?}").contains("hunter2"));
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
