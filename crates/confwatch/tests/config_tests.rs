//! Tests for loading `ClientConfig` from the environment, `.env` files and CLI flags.
//!
//! Every test that touches the process environment is `#[serial]`.

use std::path::Path;
use std::time::Duration;

use confwatch::config::vars;
use confwatch::{ClientConfig, ConfigError, LogLevel, MemoryRemote, WatchClient};
use serial_test::serial;

const ALL_VARS: [&str; 9] = [
    vars::APP_ID,
    vars::SERVERS,
    vars::NAMESPACE,
    vars::LOG_DIR,
    vars::CACHE_DIR,
    vars::LOG_LEVEL,
    vars::TIMEOUT_MS,
    vars::NO_CACHE,
    vars::EVENT_BUFFER,
];

fn clear_env() {
    for name in ALL_VARS {
        unsafe {
            std::env::remove_var(name);
        }
    }
}

fn set_required_env() {
    unsafe {
        std::env::set_var(vars::APP_ID, "billing");
        std::env::set_var(vars::SERVERS, "http://10.0.0.1:8848,https://10.0.0.2/cfg");
        std::env::set_var(vars::NAMESPACE, "prod");
        std::env::set_var(vars::LOG_DIR, "/var/log/confwatch");
        std::env::set_var(vars::CACHE_DIR, "/var/cache/confwatch");
    }
}

// ============================================================================
// Environment
// ============================================================================

#[test]
#[serial]
fn test_from_env_required_only() {
    clear_env();
    set_required_env();

    let config = ClientConfig::from_env().expect("valid environment");
    assert_eq!(config.app_id(), "billing");
    assert_eq!(config.namespace(), "prod");
    assert_eq!(config.servers().len(), 2);
    assert_eq!(config.servers()[1].port, 443);
    assert_eq!(config.servers()[1].context_path, "/cfg");
    assert_eq!(config.log_dir(), Path::new("/var/log/confwatch"));
    assert_eq!(config.timeout(), Duration::from_millis(5000));
    assert_eq!(config.event_buffer(), 10);

    clear_env();
}

#[test]
#[serial]
fn test_from_env_optional_settings() {
    clear_env();
    set_required_env();
    unsafe {
        std::env::set_var(vars::LOG_LEVEL, "debug");
        std::env::set_var(vars::TIMEOUT_MS, "250");
        std::env::set_var(vars::NO_CACHE, "yes");
        std::env::set_var(vars::EVENT_BUFFER, "3");
    }

    let config = ClientConfig::from_env().expect("valid environment");
    assert_eq!(config.log_level(), LogLevel::Debug);
    assert_eq!(config.timeout(), Duration::from_millis(250));
    assert!(!config.load_cache_at_start());
    assert_eq!(config.event_buffer(), 3);

    clear_env();
}

#[test]
#[serial]
fn test_from_env_missing_app_id() {
    clear_env();
    set_required_env();
    unsafe {
        std::env::remove_var(vars::APP_ID);
    }

    assert!(matches!(
        ClientConfig::from_env(),
        Err(ConfigError::MissingAppId)
    ));

    clear_env();
}

#[test]
#[serial]
fn test_from_env_reports_missing_setting_with_help() {
    use miette::Diagnostic;

    clear_env();
    set_required_env();
    unsafe {
        std::env::remove_var(vars::CACHE_DIR);
    }

    let err = ClientConfig::from_env().expect_err("cache dir is required");
    let help = err.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains(vars::CACHE_DIR));

    clear_env();
}

#[test]
#[serial]
fn test_from_env_zero_buffer_rejected() {
    clear_env();
    set_required_env();
    unsafe {
        std::env::set_var(vars::EVENT_BUFFER, "0");
    }

    assert!(matches!(
        ClientConfig::from_env(),
        Err(ConfigError::InvalidValue { .. })
    ));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_config_creates_no_client() {
    clear_env();
    unsafe {
        std::env::set_var(vars::APP_ID, "billing");
    }

    // from_env fails, and a hand-built config with the same gap fails in new().
    assert!(ClientConfig::from_env().is_err());
    let result = WatchClient::new(
        ClientConfig::default().with_app_id("billing"),
        MemoryRemote::new(),
    );
    assert!(result.is_err());

    clear_env();
}

// ============================================================================
// Dotenv
// ============================================================================

#[cfg(feature = "dotenv")]
mod dotenv {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_env_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write env file");
        file
    }

    #[test]
    #[serial]
    fn test_dotenv_supplies_missing_vars() {
        clear_env();
        let file = write_env_file(
            "APP_ID=from-file\n\
             CONFWATCH_SERVERS=http://127.0.0.1:8848\n\
             CONFWATCH_NAMESPACE=dev\n\
             CONFWATCH_LOG_DIR=/tmp/log\n\
             CONFWATCH_CACHE_DIR=/tmp/cache\n",
        );

        let config = ClientConfig::from_env_with_dotenv(file.path()).expect("valid file");
        assert_eq!(config.app_id(), "from-file");
        assert_eq!(config.namespace(), "dev");

        // The process environment is left untouched.
        assert!(std::env::var(vars::APP_ID).is_err());
    }

    #[test]
    #[serial]
    fn test_environment_wins_over_dotenv() {
        clear_env();
        unsafe {
            std::env::set_var(vars::NAMESPACE, "from-env");
        }
        let file = write_env_file(
            "APP_ID=billing\n\
             CONFWATCH_SERVERS=http://127.0.0.1:8848\n\
             CONFWATCH_NAMESPACE=from-file\n\
             CONFWATCH_LOG_DIR=/tmp/log\n\
             CONFWATCH_CACHE_DIR=/tmp/cache\n",
        );

        let config = ClientConfig::from_env_with_dotenv(file.path()).expect("valid file");
        assert_eq!(config.namespace(), "from-env");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_dotenv_file() {
        clear_env();
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ClientConfig::from_env_with_dotenv(dir.path().join("absent.env"))
            .expect_err("file does not exist");
        assert!(matches!(err, ConfigError::Dotenv { .. }));
        assert!(err.to_string().contains("absent.env"));
    }
}

// ============================================================================
// CLI
// ============================================================================

#[cfg(feature = "clap")]
mod cli {
    use super::*;
    use clap::Parser;
    use confwatch::ClientArgs;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        confwatch: ClientArgs,
    }

    #[test]
    #[serial]
    fn test_flags_build_config() {
        clear_env();
        let cli = Cli::try_parse_from([
            "app",
            "--app-id",
            "billing",
            "--confwatch-servers",
            "http://10.0.0.1:8848",
            "--confwatch-namespace",
            "prod",
            "--confwatch-log-dir",
            "/tmp/log",
            "--confwatch-cache-dir",
            "/tmp/cache",
            "--confwatch-timeout",
            "100",
            "--confwatch-nocache",
        ])
        .expect("valid flags");

        let config = cli.confwatch.into_config().expect("valid config");
        assert_eq!(config.app_id(), "billing");
        assert_eq!(config.timeout(), Duration::from_millis(100));
        assert!(!config.load_cache_at_start());
        assert_eq!(config.event_buffer(), 10);
    }

    #[test]
    #[serial]
    fn test_flags_fall_back_to_env() {
        clear_env();
        set_required_env();

        let cli = Cli::try_parse_from(["app", "--confwatch-namespace", "staging"])
            .expect("valid flags");
        let config = cli.confwatch.into_config().expect("valid config");
        assert_eq!(config.app_id(), "billing");
        assert_eq!(config.namespace(), "staging");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_flags_missing_required() {
        clear_env();
        let cli = Cli::try_parse_from(["app", "--app-id", "billing"]).expect("valid flags");
        assert!(cli.confwatch.into_config().is_err());
    }
}
