use super::backoff::{wait_fail, wait_term};
use super::subscriber::SubscriberContext;
use super::transport::{CloseReason, SubscribeOption, SubscriberEvent, SubscriptionHandle, SubscriptionId};
use super::{DialogState, DialogStatus, DIALOG_INFO_CONTENT_TYPE, EVENT_PACKAGE};
use crate::contact::ContactRef;
use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Subscribing,
    Active,
    Closing,
}

/// At most one pending one-shot timer. Every arming bumps `seq`, so an
/// alarm event that was already queued when the timer got re-armed is
/// recognised as stale and dropped.
#[derive(Default)]
struct Alarm {
    seq: u64,
    token: Option<CancellationToken>,
    wait: Option<Duration>,
}

impl Alarm {
    fn arm(&mut self, id: SubscriptionId, wait: Duration, ctx: &SubscriberContext) {
        self.cancel();
        self.seq += 1;
        let seq = self.seq;
        let token = ctx.token.child_token();
        let sender = ctx.sender.clone();
        self.token = Some(token.clone());
        self.wait = Some(wait);

        tokio::spawn(async move {
            select! {
                _ = token.cancelled() => {}
                _ = sleep(wait) => {
                    sender.send(SubscriberEvent::Alarm { id, seq }).ok();
                }
            }
        });
    }

    fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    fn fire(&mut self, seq: u64) -> bool {
        if self.token.is_some() && seq == self.seq {
            self.token = None;
            true
        } else {
            false
        }
    }
}

/// Monitoring lifecycle of one contact:
/// `Idle -> Subscribing -> Active -> Closing -> Idle`.
pub struct DialogInfoSubscription {
    pub id: SubscriptionId,
    pub contact: ContactRef,
    pub status: DialogStatus,
    pub failure_count: u32,
    pub state: SubscriptionState,
    pub(super) handle: Option<SubscriptionHandle>,
    alarm: Alarm,
}

impl DialogInfoSubscription {
    pub(super) fn new(id: SubscriptionId, contact: ContactRef, ctx: &SubscriberContext) -> Self {
        let mut subscription = Self {
            id,
            contact,
            status: DialogStatus::Unknown,
            failure_count: 0,
            state: SubscriptionState::Idle,
            handle: None,
            alarm: Alarm::default(),
        };
        subscription
            .alarm
            .arm(id, Duration::from_secs(ctx.config.initial_delay), ctx);
        subscription
    }

    pub fn has_pending_alarm(&self) -> bool {
        self.alarm.token.is_some()
    }

    /// Interval used for the most recent arming of the alarm.
    pub fn retry_wait(&self) -> Option<Duration> {
        self.alarm.wait
    }

    pub fn is_subscribed(&self) -> bool {
        self.handle.is_some()
    }

    pub(super) fn on_alarm(&mut self, seq: u64, ctx: &SubscriberContext) {
        if !self.alarm.fire(seq) {
            debug!(contact = self.contact.name, seq, "stale dialog-info alarm");
            return;
        }
        self.state = SubscriptionState::Subscribing;
        match self.subscribe(ctx) {
            Ok(handle) => {
                debug!(
                    contact = self.contact.name,
                    dialog_id = handle.dialog_id,
                    "dialog-info subscribe sent"
                );
                self.handle = Some(handle);
                self.state = SubscriptionState::Active;
            }
            Err(e) => {
                self.failure_count = self.failure_count.saturating_add(1);
                let wait = wait_fail(self.failure_count);
                warn!(
                    contact = self.contact.name,
                    failure_count = self.failure_count,
                    wait,
                    "dialog-info subscribe failed: {:?}",
                    e
                );
                self.state = SubscriptionState::Idle;
                self.alarm.arm(self.id, Duration::from_secs(wait as u64), ctx);
            }
        }
    }

    fn subscribe(&self, ctx: &SubscriberContext) -> Result<SubscriptionHandle> {
        let account = ctx
            .accounts
            .find_account()
            .ok_or_else(|| anyhow!("dialog-info: no account found"))?;

        let option = SubscribeOption {
            target: self.contact.address.outbound().clone(),
            from: account.aor,
            event: EVENT_PACKAGE.to_string(),
            accept: DIALOG_INFO_CONTENT_TYPE.to_string(),
            expires: ctx.config.expires,
            contact: account.contact,
            routes: account.outbound_proxy.into_iter().collect(),
            credential: account.credential,
            user_agent: account.user_agent,
        };
        ctx.transport
            .subscribe(self.id, option, ctx.sender.clone())
            .map_err(|e| anyhow!("dialog-info: subscribe failed: {}", e))
    }

    pub(super) fn on_close(&mut self, reason: CloseReason, ctx: &SubscriberContext) {
        if self.handle.is_none() {
            debug!(contact = self.contact.name, ?reason, "close for inactive subscription");
            return;
        }
        self.state = SubscriptionState::Closing;
        self.handle = None;

        let wait = match &reason {
            CloseReason::Terminated {
                reason,
                retry_after,
            } => {
                info!(contact = self.contact.name, reason = reason.name(), "dialog-info subscriber closed");
                wait_term(reason, *retry_after)
            }
            CloseReason::Response {
                status_code,
                reason,
            } => {
                info!(contact = self.contact.name, status_code, reason, "dialog-info subscriber closed");
                self.failure_count = self.failure_count.saturating_add(1);
                wait_fail(self.failure_count)
            }
            CloseReason::Error(e) => {
                info!(contact = self.contact.name, error = e, "dialog-info subscriber closed");
                self.failure_count = self.failure_count.saturating_add(1);
                wait_fail(self.failure_count)
            }
        };
        info!(
            contact = self.contact.name,
            wait,
            failure_count = self.failure_count,
            "dialog-info will retry in {} secs",
            wait
        );
        self.alarm.arm(self.id, Duration::from_secs(wait as u64), ctx);
        self.state = SubscriptionState::Idle;

        self.status = DialogStatus::Unknown;
        ctx.store.set_dialog_state(&self.contact, DialogState::unknown());
    }
}

impl Drop for DialogInfoSubscription {
    fn drop(&mut self) {
        self.alarm.cancel();
    }
}
