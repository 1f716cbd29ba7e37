use std::time::Duration;

use anyhow::Result;

use super::Config;
use super::ConfigKey;
use crate::application::cli;
use crate::domain::models::ControllerError;
use crate::domain::models::SessionKind;

#[test]
fn it_serializes_to_valid_toml() -> Result<()> {
    let res = Config::serialize_default(cli::build());
    let doc = res.parse::<toml_edit::Document>()?;

    assert_eq!(doc["api-url"].as_str(), Some("http://127.0.0.1:8000"));
    assert_eq!(doc["request-timeout"].as_integer(), Some(30000));
    assert_eq!(doc["metrics-interval"].as_integer(), Some(5000));
    assert_eq!(doc["typing-delay"].as_integer(), Some(0));
    assert_eq!(doc["session-type"].as_str(), Some("chat"));
    assert!(doc.get("session-id").is_none());
    assert!(doc.get("config-file").is_none());
    assert!(res.contains("# Which sessions to list and continue. [possible values: chat, agent]"));

    return Ok(());
}

#[test]
fn it_matches_the_example_config() -> Result<()> {
    let example = std::fs::read_to_string("./config.example.toml")?;
    assert_eq!(example.trim(), Config::serialize_default(cli::build()).trim());

    return Ok(());
}

#[test]
fn it_uses_kebab_case_keys() {
    insta::assert_snapshot!(ConfigKey::ApiURL.to_string(), @"api-url");
    insta::assert_snapshot!(ConfigKey::SessionID.to_string(), @"session-id");
    insta::assert_snapshot!(ConfigKey::MetricsInterval.to_string(), @"metrics-interval");
}

// Config is process global, so every load runs in this one test.
#[tokio::test]
async fn it_loads_config_from_files_and_flags() -> Result<()> {
    let matches = cli::build().try_get_matches_from(vec![
        "agentd",
        "chat",
        "-c",
        "./config.example.toml",
    ])?;
    Config::load(cli::build(), vec![&matches]).await?;
    assert_eq!(Config::get(ConfigKey::RequestTimeout), "30000");
    assert_eq!(Config::session_kind()?, SessionKind::Chat);
    assert_eq!(
        Config::get_duration(ConfigKey::MetricsInterval)?,
        Duration::from_millis(5000)
    );

    let matches = cli::build().try_get_matches_from(vec![
        "agentd",
        "--typing-delay",
        "40",
        "chat",
        "-c",
        "./config.example.toml",
        "--session-type",
        "agent",
        "--id",
        "ab12cd34-ef56",
    ])?;
    let (_, chat_matches) = matches
        .subcommand()
        .ok_or_else(|| return anyhow::anyhow!("missing subcommand"))?;
    Config::load(cli::build(), vec![&matches, chat_matches]).await?;
    assert_eq!(
        Config::get_duration(ConfigKey::TypingDelay)?,
        Duration::from_millis(40)
    );
    assert_eq!(Config::session_kind()?, SessionKind::Agent);
    assert_eq!(Config::get(ConfigKey::SessionID), "ab12cd34-ef56");

    Config::set(ConfigKey::TypingDelay, "soon");
    assert_eq!(
        Config::get_duration(ConfigKey::TypingDelay),
        Err(ControllerError::Config(
            "typing-delay must be a number of milliseconds, got 'soon'".to_string()
        ))
    );

    Config::set(ConfigKey::RequestTimeout, "0");
    assert_eq!(
        Config::get_duration(ConfigKey::RequestTimeout),
        Err(ControllerError::Config(
            "request-timeout must be greater than 0".to_string()
        ))
    );
    Config::set(ConfigKey::TypingDelay, "0");
    assert_eq!(Config::get_duration(ConfigKey::TypingDelay)?, Duration::ZERO);

    let matches = cli::build().try_get_matches_from(vec![
        "agentd",
        "--metrics-interval",
        "0",
        "metrics",
        "-c",
        "./config.example.toml",
    ])?;
    let res = Config::load(cli::build(), vec![&matches]).await;
    insta::assert_snapshot!(
        res.err().map(|e| return e.to_string()).unwrap_or_default(),
        @"Configuration error: metrics-interval must be greater than 0"
    );

    let matches =
        cli::build().try_get_matches_from(vec!["agentd", "chat", "-c", "./test/zero-interval-config.toml"])?;
    let res = Config::load(cli::build(), vec![&matches]).await;
    assert!(res.is_err());

    let matches =
        cli::build().try_get_matches_from(vec!["agentd", "chat", "-c", "./test/bad-config.toml"])?;
    let res = Config::load(cli::build(), vec![&matches]).await;
    assert!(res.is_err());

    return Ok(());
}
