use crate::useragent::UserCredential;
use anyhow::Result;
use rsipstack::dialog::authenticate::Credential;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

/// Key of one subscription entity inside the subscriber registry.
pub type SubscriptionId = u64;

/// `reason` parameter of a `Subscription-State: terminated` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    Deactivated,
    Probation,
    Rejected,
    Timeout,
    GiveUp,
    NoResource,
    Other(String),
}

impl TerminationReason {
    pub fn name(&self) -> &str {
        match self {
            TerminationReason::Deactivated => "deactivated",
            TerminationReason::Probation => "probation",
            TerminationReason::Rejected => "rejected",
            TerminationReason::Timeout => "timeout",
            TerminationReason::GiveUp => "giveup",
            TerminationReason::NoResource => "noresource",
            TerminationReason::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for TerminationReason {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "deactivated" => TerminationReason::Deactivated,
            "probation" => TerminationReason::Probation,
            "rejected" => TerminationReason::Rejected,
            "timeout" => TerminationReason::Timeout,
            "giveup" => TerminationReason::GiveUp,
            "noresource" => TerminationReason::NoResource,
            _ => TerminationReason::Other(value.trim().to_string()),
        }
    }
}

/// Why a subscription went away. Exactly one of the three is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Notifier ended the subscription with a `Subscription-State` reason.
    Terminated {
        reason: TerminationReason,
        retry_after: Option<u32>,
    },
    /// SUBSCRIBE or refresh answered with a final error response.
    Response { status_code: u16, reason: String },
    /// Transport level failure, no response at all.
    Error(String),
}

/// The local identity a SUBSCRIBE is sent from.
#[derive(Debug, Clone)]
pub struct LocalAccount {
    pub aor: rsip::Uri,
    pub contact: rsip::Uri,
    pub outbound_proxy: Option<rsip::Uri>,
    pub credential: Option<UserCredential>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubscribeOption {
    pub target: rsip::Uri,
    pub from: rsip::Uri,
    pub event: String,
    pub accept: String,
    pub expires: u32,
    pub contact: rsip::Uri,
    pub routes: Vec<rsip::Uri>,
    pub credential: Option<UserCredential>,
    pub user_agent: Option<String>,
}

impl SubscribeOption {
    /// Credential used to answer 401/407 challenges.
    pub fn credential(&self) -> Option<Credential> {
        self.credential.clone().map(|c| c.into())
    }
}

/// Owns the transport side of one subscription. Dropping it cancels the
/// token the transport watches, after which no event is sent for it.
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub dialog_id: String,
    cancel_token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn new(dialog_id: impl Into<String>, cancel_token: CancellationToken) -> Self {
        Self {
            dialog_id: dialog_id.into(),
            cancel_token,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[derive(Debug)]
pub enum SubscriberEvent {
    /// One-shot alarm of an entity fired; `seq` identifies the arming.
    Alarm { id: SubscriptionId, seq: u64 },
    Notify {
        id: SubscriptionId,
        request: rsip::Request,
    },
    Closed {
        id: SubscriptionId,
        reason: CloseReason,
    },
}

pub type SubscriberEventSender = UnboundedSender<SubscriberEvent>;
pub type SubscriberEventReceiver = UnboundedReceiver<SubscriberEvent>;

/// SIP side of the subscriber. Implementations must not block: `subscribe`
/// only submits the request and reports NOTIFYs and closes later through
/// `sender`.
#[cfg_attr(test, mockall::automock)]
pub trait SubscribeTransport: Send + Sync {
    fn subscribe(
        &self,
        id: SubscriptionId,
        option: SubscribeOption,
        sender: SubscriberEventSender,
    ) -> Result<SubscriptionHandle>;

    fn reply(&self, request: &rsip::Request, status: rsip::StatusCode, headers: Vec<rsip::Header>);
}

#[cfg_attr(test, mockall::automock)]
pub trait AccountProvider: Send + Sync {
    fn find_account(&self) -> Option<LocalAccount>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_reason_names() {
        assert_eq!(TerminationReason::from("noresource"), TerminationReason::NoResource);
        assert_eq!(TerminationReason::from(" GiveUp "), TerminationReason::GiveUp);
        assert_eq!(
            TerminationReason::from("invariant"),
            TerminationReason::Other("invariant".to_string())
        );
        assert_eq!(TerminationReason::Timeout.name(), "timeout");
    }

    #[test]
    fn test_handle_drop_cancels_token() {
        let token = CancellationToken::new();
        let handle = SubscriptionHandle::new("call-1", token.clone());
        assert!(!handle.is_cancelled());
        drop(handle);
        assert!(token.is_cancelled());
    }
}
