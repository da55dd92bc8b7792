use crate::contact::ContactConfig;
use crate::dialog_info::DEFAULT_EXPIRES;
use crate::useragent::AccountOption;
use anyhow::Error;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(version = crate::version::get_version_info())]
pub struct Cli {
    #[clap(long, default_value = "rustblf.toml")]
    pub conf: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List contacts that would be monitored and the account used for it
    Check,
    /// Decode a stored NOTIFY body and print the resulting dialog state
    Parse {
        path: String,
    },
    /// Print the retry intervals used after failures and terminations
    Backoff,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    #[serde(default)]
    pub ua: UseragentConfig,
    #[serde(default)]
    pub dialog_info: DialogInfoConfig,
    #[serde(default)]
    pub accounts: Vec<AccountOption>,
    #[serde(default)]
    pub contacts: Vec<ContactConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UseragentConfig {
    pub addr: String,
    pub udp_port: u16,
    pub useragent: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(default)]
pub struct DialogInfoConfig {
    /// Requested subscription lifetime in seconds
    pub expires: u32,
    /// Delay before the first SUBSCRIBE of every contact, in seconds
    pub initial_delay: u64,
}

impl Default for DialogInfoConfig {
    fn default() -> Self {
        Self {
            expires: DEFAULT_EXPIRES,
            initial_delay: 1,
        }
    }
}

impl Default for UseragentConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            udp_port: 25060,
            useragent: Some(crate::version::get_useragent()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            ua: UseragentConfig::default(),
            dialog_info: DialogInfoConfig::default(),
            accounts: vec![],
            contacts: vec![],
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
log_level = "debug"

[dialog_info]
expires = 300

[[accounts]]
server = "pbx.example.net"
username = "100"
credential = {{ username = "100", password = "secret" }}

[[contacts]]
name = "11"
uri = "sip:11@pbx.example.net"
params = {{ dlginfo = "p2p" }}

[[contacts]]
name = "12"
uri = "sip:12@pbx.example.net"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.dialog_info.expires, 300);
        assert_eq!(config.dialog_info.initial_delay, 1);
        assert_eq!(config.ua.udp_port, 25060);
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].aor(), "100@pbx.example.net");
        assert_eq!(config.contacts.len(), 2);
        assert_eq!(
            config.contacts[0].params.get("dlginfo").map(|s| s.as_str()),
            Some("p2p")
        );
        assert!(config.contacts[1].params.is_empty());
    }

    #[test]
    fn test_missing_config_file() {
        assert!(Config::load("/nonexistent/rustblf.toml").is_err());
    }
}
