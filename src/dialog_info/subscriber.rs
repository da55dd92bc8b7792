use super::subscription::DialogInfoSubscription;
use super::transport::{
    AccountProvider, SubscribeTransport, SubscriberEvent, SubscriberEventReceiver,
    SubscriberEventSender, SubscriptionId,
};
use crate::config::DialogInfoConfig;
use crate::contact::ContactStore;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Collaborators every subscription entity needs while handling an event.
pub(crate) struct SubscriberContext {
    pub config: DialogInfoConfig,
    pub store: Arc<dyn ContactStore>,
    pub accounts: Arc<dyn AccountProvider>,
    pub transport: Arc<dyn SubscribeTransport>,
    pub sender: SubscriberEventSender,
    pub token: CancellationToken,
}

pub struct DialogInfoSubscriberBuilder {
    pub config: Option<DialogInfoConfig>,
    pub cancel_token: Option<CancellationToken>,
    pub store: Option<Arc<dyn ContactStore>>,
    pub accounts: Option<Arc<dyn AccountProvider>>,
    pub transport: Option<Arc<dyn SubscribeTransport>>,
}

/// Owns every dialog-info subscription and processes their events one at a
/// time, so entity state never needs a lock.
pub struct DialogInfoSubscriber {
    ctx: SubscriberContext,
    receiver: SubscriberEventReceiver,
    subscriptions: HashMap<SubscriptionId, DialogInfoSubscription>,
    next_id: SubscriptionId,
}

impl DialogInfoSubscriberBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            cancel_token: None,
            store: None,
            accounts: None,
            transport: None,
        }
    }

    pub fn with_config(mut self, config: Option<DialogInfoConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn with_contact_store(mut self, store: Arc<dyn ContactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountProvider>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn SubscribeTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(mut self) -> Result<DialogInfoSubscriber> {
        let store = self
            .store
            .take()
            .ok_or_else(|| anyhow!("dialog-info: contact store is required"))?;
        let accounts = self
            .accounts
            .take()
            .ok_or_else(|| anyhow!("dialog-info: account provider is required"))?;
        let transport = self
            .transport
            .take()
            .ok_or_else(|| anyhow!("dialog-info: transport is required"))?;
        let token = self
            .cancel_token
            .take()
            .unwrap_or_else(|| CancellationToken::new());
        let (sender, receiver) = unbounded_channel();

        Ok(DialogInfoSubscriber {
            ctx: SubscriberContext {
                config: self.config.take().unwrap_or_default(),
                store,
                accounts,
                transport,
                sender,
                token,
            },
            receiver,
            subscriptions: HashMap::new(),
            next_id: 1,
        })
    }
}

impl DialogInfoSubscriber {
    /// Creates one subscription per contact carrying `dlginfo=p2p`. The
    /// contact list is enumerated only here.
    ///
    /// # Panics
    ///
    /// Every subscription arms its first alarm on the current tokio runtime,
    /// so this must be called from within one.
    pub fn init(&mut self) -> usize {
        for contact in self.ctx.store.contacts() {
            if !contact.wants_dialog_info() {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            let subscription = DialogInfoSubscription::new(id, contact, &self.ctx);
            self.subscriptions.insert(id, subscription);
        }
        info!(
            "Subscribing dialog-info to {} contacts",
            self.subscriptions.len()
        );
        self.subscriptions.len()
    }

    /// Drops every subscription, cancelling alarms and releasing handles.
    pub fn shutdown(&mut self) {
        let count = self.subscriptions.len();
        for (_, subscription) in self.subscriptions.drain() {
            debug!(contact = subscription.contact.name, "dialog-info subscription released");
        }
        info!(count, "dialog-info subscriber closed");
    }

    /// Sender the transport uses to deliver NOTIFYs and closes.
    pub fn sender(&self) -> SubscriberEventSender {
        self.ctx.sender.clone()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn subscription(&self, id: SubscriptionId) -> Option<&DialogInfoSubscription> {
        self.subscriptions.get(&id)
    }

    #[cfg(test)]
    pub(super) fn subscription_mut(
        &mut self,
        id: SubscriptionId,
    ) -> Option<&mut DialogInfoSubscription> {
        self.subscriptions.get_mut(&id)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &DialogInfoSubscription> {
        self.subscriptions.values()
    }

    pub fn handle_event(&mut self, event: SubscriberEvent) {
        match event {
            SubscriberEvent::Alarm { id, seq } => match self.subscriptions.get_mut(&id) {
                Some(subscription) => subscription.on_alarm(seq, &self.ctx),
                None => debug!(id, "alarm for unknown subscription"),
            },
            SubscriberEvent::Notify { id, request } => match self.subscriptions.get_mut(&id) {
                Some(subscription) if subscription.is_subscribed() => {
                    subscription.on_notify(request, &self.ctx)
                }
                _ => {
                    warn!(id, "dialog-info: notify without active subscription");
                    self.ctx.transport.reply(
                        &request,
                        rsip::StatusCode::CallTransactionDoesNotExist,
                        vec![],
                    );
                }
            },
            SubscriberEvent::Closed { id, reason } => match self.subscriptions.get_mut(&id) {
                Some(subscription) => subscription.on_close(reason, &self.ctx),
                None => debug!(id, ?reason, "close for unknown subscription"),
            },
        }
    }

    /// Waits for the next event and handles it. Returns `false` once the
    /// channel is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Processes events until the cancel token fires, then shuts down.
    pub async fn serve(mut self) -> Result<()> {
        let token = self.ctx.token.clone();
        loop {
            select! {
                _ = token.cancelled() => {
                    info!("dialog-info subscriber cancelled");
                    break;
                }
                processed = self.process_next() => {
                    if !processed {
                        break;
                    }
                }
            }
        }
        self.shutdown();
        Ok(())
    }
}
