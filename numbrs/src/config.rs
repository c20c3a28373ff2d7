use numbers_router::config::Config as NumbersRouterConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub numbers_router: NumbersRouterConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use numbers_router::config::ExecutionMode;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn numbers_router_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://public@sentry.example.com/1
            numbers_router:
                listener:
                    host: 0.0.0.0
                    port: 9000
                upstream:
                    timeout_ms: 750
                    execution_mode: sequential
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(
            config.common.logging.expect("logging config").sentry_dsn,
            "https://public@sentry.example.com/1"
        );

        let router = config.numbers_router;
        assert_eq!(router.listener.port, 9000);
        // Untouched sections keep their defaults
        assert_eq!(router.admin_listener.port, 8081);
        assert_eq!(router.upstream.timeout_ms, 750);
        assert_eq!(router.upstream.execution_mode, ExecutionMode::Sequential);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let tmp = write_tmp_file("{}");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_errors() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/numbrs.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));

        let tmp = write_tmp_file("numbers_router: {upstream: {timeout_ms: soon}}");
        let err = Config::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
