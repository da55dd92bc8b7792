use super::transport::TerminationReason;

/// Wait in seconds after the notifier terminated the subscription.
pub fn wait_term(reason: &TerminationReason, retry_after: Option<u32>) -> u32 {
    match reason {
        TerminationReason::Deactivated | TerminationReason::Timeout => 5,
        TerminationReason::Rejected | TerminationReason::NoResource => 3600,
        TerminationReason::Probation
        | TerminationReason::GiveUp
        | TerminationReason::Other(_) => match retry_after {
            Some(retry_after) => retry_after.max(300),
            None => 300,
        },
    }
}

/// Wait in seconds after `failure_count` consecutive failures.
pub fn wait_fail(failure_count: u32) -> u32 {
    match failure_count {
        0 | 1 => 30,
        2 => 300,
        3 => 3600,
        _ => 86400,
    }
}
