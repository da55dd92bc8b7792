use crate::config::UseragentConfig;
use crate::dialog_info::{AccountProvider, LocalAccount};
use anyhow::{anyhow, Result};
use rsipstack::dialog::authenticate::Credential;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct UserCredential {
    pub username: String,
    pub password: String,
    pub realm: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AccountOption {
    pub server: String,
    pub username: String,
    pub display_name: Option<String>,
    pub disabled: Option<bool>,
    pub outbound_proxy: Option<String>,
    pub credential: Option<UserCredential>,
}

impl Into<Credential> for UserCredential {
    fn into(self) -> Credential {
        Credential {
            username: self.username,
            password: self.password,
            realm: self.realm,
        }
    }
}

fn with_sip_scheme(value: &str) -> String {
    if value.starts_with("sip:") || value.starts_with("sips:") {
        value.to_string()
    } else {
        format!("sip:{}", value)
    }
}

impl AccountOption {
    pub fn aor(&self) -> String {
        let host = self
            .server
            .trim_start_matches("sips:")
            .trim_start_matches("sip:");
        format!("{}@{}", self.username, host)
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.unwrap_or(false)
    }

    pub fn aor_uri(&self) -> Result<rsip::Uri> {
        rsip::Uri::try_from(with_sip_scheme(&self.aor()))
            .map_err(|e| anyhow!("failed to parse aor: {} {}", self.aor(), e))
    }

    pub fn outbound_uri(&self) -> Result<Option<rsip::Uri>> {
        match &self.outbound_proxy {
            Some(proxy) => rsip::Uri::try_from(with_sip_scheme(proxy))
                .map(Some)
                .map_err(|e| anyhow!("failed to parse outbound proxy: {} {}", proxy, e)),
            None => Ok(None),
        }
    }
}

/// Local accounts the subscriber may send SUBSCRIBEs from. Like a phone
/// with several lines, the first enabled account is used.
pub struct UserAgent {
    pub config: UseragentConfig,
    pub accounts: Vec<AccountOption>,
}

impl UserAgent {
    pub fn new(config: UseragentConfig, accounts: Vec<AccountOption>) -> Self {
        Self { config, accounts }
    }

    fn contact_uri(&self, option: &AccountOption) -> Result<rsip::Uri> {
        let contact = format!(
            "sip:{}@{}:{}",
            option.username, self.config.addr, self.config.udp_port
        );
        rsip::Uri::try_from(contact.as_str())
            .map_err(|e| anyhow!("failed to parse contact: {} {}", contact, e))
    }

    fn local_account(&self, option: &AccountOption) -> Result<LocalAccount> {
        Ok(LocalAccount {
            aor: option.aor_uri()?,
            contact: self.contact_uri(option)?,
            outbound_proxy: option.outbound_uri()?,
            credential: option.credential.clone(),
            user_agent: self.config.useragent.clone(),
        })
    }
}

impl AccountProvider for UserAgent {
    fn find_account(&self) -> Option<LocalAccount> {
        let option = self.accounts.iter().find(|a| a.is_enabled())?;
        match self.local_account(option) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!(user = option.aor(), "unusable account: {:?}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, disabled: Option<bool>) -> AccountOption {
        AccountOption {
            server: "sip:pbx.example.net".to_string(),
            username: username.to_string(),
            display_name: None,
            disabled,
            outbound_proxy: None,
            credential: Some(UserCredential {
                username: username.to_string(),
                password: "secret".to_string(),
                realm: None,
            }),
        }
    }

    #[test]
    fn test_first_enabled_account_is_used() {
        let ua = UserAgent::new(
            UseragentConfig::default(),
            vec![account("100", Some(true)), account("101", None)],
        );
        let found = ua.find_account().unwrap();
        assert_eq!(found.aor.to_string(), "sip:101@pbx.example.net");
        assert!(found.contact.to_string().starts_with("sip:101@"));
        assert!(found.outbound_proxy.is_none());
        assert_eq!(found.credential.unwrap().username, "101");
    }

    #[test]
    fn test_no_account() {
        let ua = UserAgent::new(UseragentConfig::default(), vec![]);
        assert!(ua.find_account().is_none());
        let ua = UserAgent::new(UseragentConfig::default(), vec![account("100", Some(true))]);
        assert!(ua.find_account().is_none());
    }

    #[test]
    fn test_outbound_proxy_gets_scheme() {
        let mut option = account("100", None);
        option.outbound_proxy = Some("proxy.example.net:5070".to_string());
        let uri = option.outbound_uri().unwrap().unwrap();
        assert_eq!(uri.to_string(), "sip:proxy.example.net:5070");
    }
}
