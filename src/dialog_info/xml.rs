use super::{truncate_identity, DialogDirection, DialogStatus};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// Fields scraped from one `application/dialog-info+xml` body.
///
/// Only the first `<dialog>` and its `<remote><identity>` are looked at.
/// Everything else in the document (`<local>`, `<target>`, `<param>` ...) is
/// skipped, and the scan stops as soon as the remote identity is captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogInfoContext {
    pub in_dialog_info: bool,
    pub in_dialog: bool,
    pub in_remote: bool,
    pub in_identity: bool,
    pub direction: DialogDirection,
    pub status: DialogStatus,
    pub identity: String,
    pub identity_display: String,
    pub error: bool,
}

enum Scan {
    Continue,
    Stop,
}

fn tag_is(name: &[u8], tag: &str) -> bool {
    name.eq_ignore_ascii_case(tag.as_bytes())
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.local_name().as_ref() != name.as_bytes() {
            return None;
        }
        Some(match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
    })
}

impl DialogInfoContext {
    /// Never fails: on malformed input `error` is set and whatever was
    /// collected before the error is returned.
    pub fn extract(body: &[u8]) -> Self {
        let mut ctx = Self::default();
        let mut reader = Reader::from_reader(body);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            let scan = match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    ctx.on_start(e);
                    Scan::Continue
                }
                Ok(Event::Empty(ref e)) => {
                    ctx.on_start(e);
                    ctx.on_end(e.local_name().as_ref())
                }
                Ok(Event::End(ref e)) => ctx.on_end(e.local_name().as_ref()),
                Ok(Event::Text(ref e)) => {
                    if ctx.in_identity {
                        let text = match e.unescape() {
                            Ok(t) => t.into_owned(),
                            Err(_) => String::from_utf8_lossy(e).into_owned(),
                        };
                        ctx.on_text(&text);
                    }
                    Scan::Continue
                }
                Ok(Event::CData(ref e)) => {
                    if ctx.in_identity {
                        ctx.on_text(&String::from_utf8_lossy(e));
                    }
                    Scan::Continue
                }
                Ok(Event::Eof) => Scan::Stop,
                Ok(_) => Scan::Continue,
                Err(e) => {
                    debug!(
                        position = reader.buffer_position(),
                        "dialog-info: xml parse error: {}", e
                    );
                    ctx.error = true;
                    Scan::Stop
                }
            };
            if let Scan::Stop = scan {
                break;
            }
            buf.clear();
        }
        ctx
    }

    fn on_start(&mut self, e: &BytesStart) {
        let local_name = e.local_name();
        let name = local_name.as_ref();

        if !self.in_dialog_info {
            if tag_is(name, "dialog-info") {
                self.in_dialog_info = true;
                // idle extensions are reported without any <dialog> element
                self.status = DialogStatus::Terminated;
            }
            return;
        }
        if !self.in_dialog {
            if tag_is(name, "dialog") {
                self.in_dialog = true;
                match attribute(e, "direction").as_deref() {
                    Some("initiator") => self.direction = DialogDirection::Initiator,
                    Some("recipient") => self.direction = DialogDirection::Recipient,
                    _ => {}
                }
            }
            return;
        }
        if !self.in_remote {
            if tag_is(name, "remote") {
                self.in_remote = true;
            }
            return;
        }
        if !self.in_identity && tag_is(name, "identity") {
            self.in_identity = true;
            if let Some(display) = attribute(e, "display") {
                self.identity_display = truncate_identity(&display);
            }
        }
    }

    fn on_end(&mut self, name: &[u8]) -> Scan {
        if tag_is(name, "dialog-info") {
            self.in_dialog_info = false;
            self.leave_dialog();
            return Scan::Stop;
        }
        if tag_is(name, "dialog") {
            self.leave_dialog();
            return Scan::Stop;
        }
        if tag_is(name, "remote") {
            self.in_remote = false;
            self.in_identity = false;
            return Scan::Stop;
        }
        if self.in_remote && tag_is(name, "identity") {
            self.in_identity = false;
            return Scan::Stop;
        }
        Scan::Continue
    }

    fn on_text(&mut self, text: &str) {
        self.identity = truncate_identity(text);
    }

    fn leave_dialog(&mut self) {
        self.in_dialog = false;
        self.in_remote = false;
        self.in_identity = false;
    }
}
