use config::{ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Layers a config file and `TIP_`-prefixed environment variables over the
/// type's `Default`. Environment variables win over the file, the file wins
/// over the defaults. The file is optional.
pub fn parse<C>(config_file: &str) -> Result<C, ConfigError>
where
    C: DeserializeOwned + Serialize + Default,
{
    config::Config::builder()
        .add_source(config::Config::try_from(&C::default())?)
        .add_source(File::with_name(config_file).required(false))
        .add_source(Environment::with_prefix("TIP").try_parsing(true))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    #[serde(default)]
    struct TestConfig {
        name: String,
        port: u16,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                name: "default".to_string(),
                port: 8080,
            }
        }
    }

    fn clear_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with("TIP_") {
                std::env::remove_var(key);
            }
        }
    }

    #[serial]
    #[test]
    fn test_parse_defaults() {
        clear_env();

        let config: TestConfig = super::parse("does-not-exist").expect("failed to parse config");
        assert_eq!(config, TestConfig::default());
    }

    #[serial]
    #[test]
    fn test_parse_file() {
        clear_env();

        let tmp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let config_file = tmp_dir.path().join("config.toml");

        std::fs::write(&config_file, "name = \"from-file\"\n").expect("failed to write config file");

        let config: TestConfig =
            super::parse(config_file.to_str().expect("failed to get str")).expect("failed to parse config");
        assert_eq!(config.name, "from-file");
        assert_eq!(config.port, 8080);
    }

    #[serial]
    #[test]
    fn test_parse_env_overrides_file() {
        clear_env();

        let tmp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let config_file = tmp_dir.path().join("config.toml");

        std::fs::write(&config_file, "name = \"from-file\"\nport = 9000\n")
            .expect("failed to write config file");

        std::env::set_var("TIP_NAME", "from-env");

        let config: TestConfig =
            super::parse(config_file.to_str().expect("failed to get str")).expect("failed to parse config");
        assert_eq!(config.name, "from-env");
        assert_eq!(config.port, 9000);

        clear_env();
    }
}
