use crate::domain::SenderId;

/// Allow-list gate applied before any state machine work.
///
/// Pure function; an empty allow-list rejects everything, so a
/// misconfigured deployment fails closed.
pub fn is_allowed_sender(sender: &SenderId, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return false;
    }
    allowed.iter().any(|a| a == sender.as_str())
}
