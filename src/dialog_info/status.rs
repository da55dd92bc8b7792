use super::xml::DialogInfoContext;
use super::{DialogState, DialogStatus};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Checked in this order; the first keyword present anywhere in the body
/// wins, even if a later keyword appears earlier in the text.
static STATE_KEYWORDS: Lazy<Vec<(Regex, DialogStatus)>> = Lazy::new(|| {
    [
        ("early", DialogStatus::Early),
        ("confirmed", DialogStatus::Confirmed),
        ("terminated", DialogStatus::Terminated),
    ]
    .into_iter()
    .filter_map(|(keyword, status)| {
        Regex::new(&regex::escape(keyword))
            .ok()
            .map(|re| (re, status))
    })
    .collect()
});

/// Coarse status guess straight from the raw body, independent of XML
/// structure.
pub fn guess_status(body: &[u8]) -> DialogStatus {
    STATE_KEYWORDS
        .iter()
        .find(|(re, _)| re.is_match(body))
        .map(|(_, status)| *status)
        .unwrap_or(DialogStatus::Unknown)
}

/// Result of decoding one NOTIFY body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDialog {
    pub state: DialogState,
    /// The XML scan hit a parse error; `state` holds what was recovered.
    pub parse_error: bool,
}

/// Keyword guess first, extractor status as fallback. Direction and remote
/// identity always come from the extractor.
pub fn resolve(body: &[u8]) -> ResolvedDialog {
    let ctx = DialogInfoContext::extract(body);
    let status = match guess_status(body) {
        DialogStatus::Unknown => ctx.status,
        guessed => guessed,
    };
    ResolvedDialog {
        state: DialogState {
            status,
            direction: ctx.direction,
            remote_identity: ctx.identity,
            remote_identity_display: ctx.identity_display,
        },
        parse_error: ctx.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog_info::DialogDirection;

    #[test]
    fn test_guess_uses_keyword_order_not_position() {
        let body = b"<state>terminated</state><note>was early</note>";
        assert_eq!(guess_status(body), DialogStatus::Early);
        let body = b"<state>terminated</state><x>confirmed</x>";
        assert_eq!(guess_status(body), DialogStatus::Confirmed);
    }

    #[test]
    fn test_guess_without_keywords() {
        assert_eq!(guess_status(b""), DialogStatus::Unknown);
        assert_eq!(guess_status(&[0xff, 0xfe, 0x00, 0x12]), DialogStatus::Unknown);
    }

    #[test]
    fn test_guess_is_case_sensitive() {
        assert_eq!(guess_status(b"<state>Confirmed</state>"), DialogStatus::Unknown);
    }

    #[test]
    fn test_resolve_garbage_with_keyword() {
        let mut body = vec![0xff, 0x00, b'<'];
        body.extend_from_slice(b"confirmed");
        let resolved = resolve(&body);
        assert_eq!(resolved.state.status, DialogStatus::Confirmed);
        assert_eq!(resolved.state.direction, DialogDirection::Unknown);
    }

    #[test]
    fn test_resolve_falls_back_to_extractor() {
        let resolved = resolve(br#"<dialog-info version="0" state="full"></dialog-info>"#);
        assert_eq!(resolved.state.status, DialogStatus::Terminated);
        assert!(!resolved.parse_error);
    }

    #[test]
    fn test_resolve_unknown_without_dialog_info() {
        let resolved = resolve(b"<presence><tuple/></presence>");
        assert_eq!(resolved.state.status, DialogStatus::Unknown);
    }
}
