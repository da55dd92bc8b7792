use crate::dialog_info::{DialogState, DialogStatus};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Parameter that opts a contact into dialog-info monitoring.
pub const DLGINFO_PARAM: &str = "dlginfo";
pub const DLGINFO_P2P: &str = "p2p";

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ContactConfig {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ContactAddress {
    pub uri: rsip::Uri,
    pub params: HashMap<String, String>,
}

impl ContactAddress {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// SUBSCRIBE request target.
    pub fn outbound(&self) -> &rsip::Uri {
        &self.uri
    }
}

#[derive(Debug)]
pub struct Contact {
    pub name: String,
    pub address: ContactAddress,
}

pub type ContactRef = Arc<Contact>;

impl Contact {
    pub fn wants_dialog_info(&self) -> bool {
        self.address
            .param(DLGINFO_PARAM)
            .map(|v| v.eq_ignore_ascii_case(DLGINFO_P2P))
            .unwrap_or(false)
    }
}

impl TryFrom<&ContactConfig> for Contact {
    type Error = anyhow::Error;

    fn try_from(config: &ContactConfig) -> Result<Self> {
        let uri = rsip::Uri::try_from(config.uri.as_str())
            .map_err(|e| anyhow!("invalid contact uri: {} {}", config.uri, e))?;
        // `;dlginfo=p2p` may be written on the uri itself, the params table wins
        let mut params = uri_params(&uri);
        params.extend(config.params.clone());
        Ok(Contact {
            name: config.name.clone(),
            address: ContactAddress { uri, params },
        })
    }
}

fn uri_params(uri: &rsip::Uri) -> HashMap<String, String> {
    uri.params
        .iter()
        .filter_map(|param| {
            let param = param.to_string();
            let param = param.trim_start_matches(';');
            match param.split_once('=') {
                Some((name, value)) => Some((name.trim().to_string(), value.trim().to_string())),
                None if !param.is_empty() => Some((param.trim().to_string(), String::new())),
                None => None,
            }
        })
        .collect()
}

/// Contact list as seen by the dialog-info subscriber.
pub trait ContactStore: Send + Sync {
    fn contacts(&self) -> Vec<ContactRef>;
    fn set_dialog_state(&self, contact: &ContactRef, state: DialogState);
}

pub struct MemoryContactStore {
    contacts: Vec<ContactRef>,
    states: Mutex<HashMap<String, DialogState>>,
}

impl MemoryContactStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: contacts.into_iter().map(Arc::new).collect(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Dialog states are keyed by contact name, so names must be unique.
    pub fn from_config(configs: &[ContactConfig]) -> Result<Self> {
        let mut names = std::collections::HashSet::new();
        for config in configs {
            if !names.insert(config.name.as_str()) {
                return Err(anyhow!("duplicate contact name: {}", config.name));
            }
        }
        let contacts = configs
            .iter()
            .map(Contact::try_from)
            .collect::<Result<Vec<_>>>()?;
        info!("loaded {} contacts", contacts.len());
        Ok(Self::new(contacts))
    }

    pub fn dialog_state(&self, name: &str) -> Option<DialogState> {
        self.states.lock().ok()?.get(name).cloned()
    }

    /// Lamp state of a contact plus the number on the other end of its call.
    pub fn blf_state(&self, name: &str) -> (DialogStatus, String) {
        match self.dialog_state(name) {
            Some(state) => (state.status, state.remote_identity),
            None => (DialogStatus::Unknown, String::new()),
        }
    }
}

impl ContactStore for MemoryContactStore {
    fn contacts(&self) -> Vec<ContactRef> {
        self.contacts.clone()
    }

    fn set_dialog_state(&self, contact: &ContactRef, state: DialogState) {
        debug!(
            contact = contact.name,
            status = %state.status,
            remote = state.remote_identity,
            "dialog state updated"
        );
        match self.states.lock() {
            Ok(mut states) => {
                states.insert(contact.name.clone(), state);
            }
            Err(e) => {
                warn!(contact = contact.name, "dialog state dropped: {}", e);
            }
        }
    }
}
