use serde::{Deserialize, Serialize};

pub mod backoff;
mod notify;
pub mod status;
pub mod subscriber;
pub mod subscription;
pub mod transport;
pub mod xml;


pub use subscriber::{DialogInfoSubscriber, DialogInfoSubscriberBuilder};
pub use subscription::{DialogInfoSubscription, SubscriptionState};
pub use transport::{
    AccountProvider, CloseReason, LocalAccount, SubscribeOption, SubscribeTransport,
    SubscriberEvent, SubscriberEventSender, SubscriptionHandle, SubscriptionId,
    TerminationReason,
};

/// Event package name carried in the `Event` header of every SUBSCRIBE.
pub const EVENT_PACKAGE: &str = "dialog";
pub const DIALOG_INFO_CONTENT_TYPE: &str = "application/dialog-info+xml";
pub const DEFAULT_EXPIRES: u32 = 600;
/// Identity and display name are capped at this many characters.
pub const MAX_IDENTITY_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogStatus {
    #[default]
    Unknown,
    Early,
    Confirmed,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogDirection {
    #[default]
    Unknown,
    Initiator,
    Recipient,
}

/// What gets pushed to the contact store after every NOTIFY or close.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DialogState {
    pub status: DialogStatus,
    pub direction: DialogDirection,
    pub remote_identity: String,
    pub remote_identity_display: String,
}

impl DialogState {
    pub fn unknown() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for DialogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DialogStatus::Unknown => "unknown",
            DialogStatus::Early => "early",
            DialogStatus::Confirmed => "confirmed",
            DialogStatus::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Cuts `value` down to `MAX_IDENTITY_LEN` characters on a char boundary.
pub(crate) fn truncate_identity(value: &str) -> String {
    match value.char_indices().nth(MAX_IDENTITY_LEN) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
