use super::status::resolve;
use super::subscriber::SubscriberContext;
use super::subscription::DialogInfoSubscription;
use super::DIALOG_INFO_CONTENT_TYPE;
use rsip::prelude::UntypedHeader;
use tracing::{debug, warn};

fn content_type(request: &rsip::Request) -> Option<&str> {
    request.headers.iter().find_map(|h| match h {
        rsip::Header::ContentType(ct) => Some(ct.value()),
        _ => None,
    })
}

/// The whole header value must be the dialog-info media type; parameters
/// are not accepted.
fn is_dialog_info(content_type: &str) -> bool {
    content_type
        .trim()
        .eq_ignore_ascii_case(DIALOG_INFO_CONTENT_TYPE)
}

impl DialogInfoSubscription {
    pub(super) fn on_notify(&mut self, request: rsip::Request, ctx: &SubscriberContext) {
        match content_type(&request) {
            Some(ct) if is_dialog_info(ct) => {}
            other => {
                if let Some(ct) = other {
                    warn!(
                        contact = self.contact.name,
                        content_type = ct,
                        "dialog-info: unsupported content-type"
                    );
                }
                ctx.transport.reply(
                    &request,
                    rsip::StatusCode::UnsupportedMediaType,
                    vec![rsip::Header::Accept(DIALOG_INFO_CONTENT_TYPE.into())],
                );
                return;
            }
        }

        self.failure_count = 0;

        let resolved = resolve(&request.body);
        if resolved.parse_error {
            debug!(
                contact = self.contact.name,
                "dialog-info: body only partially decoded"
            );
        }

        ctx.transport.reply(&request, rsip::StatusCode::OK, vec![]);

        debug!(
            contact = self.contact.name,
            status = %resolved.state.status,
            direction = ?resolved.state.direction,
            remote = resolved.state.remote_identity,
            "dialog-info notify"
        );
        self.status = resolved.state.status;
        ctx.store.set_dialog_state(&self.contact, resolved.state);
    }
}
