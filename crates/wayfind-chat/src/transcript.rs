//! Ordered message log with at most one transient placeholder.
//!
//! Placeholders are addressed by handle, not by "the last entry", so a
//! system notice landing mid-turn (e.g. location resolved) never causes the
//! wrong entry to be withdrawn. Withdrawing a placeholder and appending its
//! successor is a single mutation.

use uuid::Uuid;

use wayfind_core::{ChatMessage, MessageKind};

/// Reference to the transient entry a turn is waiting to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientHandle {
    id: Uuid,
}

/// Where a [`Transcript::replace_transient`] call landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replacement {
    /// Index the placeholder occupied, if it was still present.
    pub removed: Option<usize>,
    /// Index of the appended successor.
    pub appended: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a permanent message. Returns its index.
    pub fn append(&mut self, message: ChatMessage) -> usize {
        debug_assert!(!message.transient, "use begin_transient for placeholders");
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Append a placeholder. Any placeholder still present is withdrawn first.
    ///
    /// Returns the handle and the placeholder's index.
    pub fn begin_transient(&mut self, text: &str) -> (TransientHandle, usize) {
        if let Some(stale) = self.messages.iter().position(|m| m.transient) {
            tracing::warn!(index = stale, "Withdrawing stale transient message");
            self.messages.remove(stale);
        }
        let message = ChatMessage::transient(text);
        let handle = TransientHandle { id: message.id };
        self.messages.push(message);
        (handle, self.messages.len() - 1)
    }

    /// Withdraw the placeholder behind `handle` and append `successor`.
    ///
    /// `successor` may itself be transient (thinking -> searching).
    pub fn replace_transient(
        &mut self,
        handle: TransientHandle,
        successor: ChatMessage,
    ) -> Replacement {
        let removed = self.messages.iter().position(|m| m.id == handle.id);
        if let Some(index) = removed {
            self.messages.remove(index);
        }
        self.messages.push(successor);
        Replacement {
            removed,
            appended: self.messages.len() - 1,
        }
    }

    /// Replace the placeholder behind `handle` with a new placeholder.
    pub fn chain_transient(
        &mut self,
        handle: TransientHandle,
        text: &str,
    ) -> (TransientHandle, Replacement, ChatMessage) {
        let message = ChatMessage::transient(text);
        let next = TransientHandle { id: message.id };
        let replacement = self.replace_transient(handle, message.clone());
        (next, replacement, message)
    }

    /// Withdraw the placeholder behind `handle` without a successor.
    ///
    /// Returns the index it occupied, or `None` if it was already gone.
    pub fn withdraw(&mut self, handle: TransientHandle) -> Option<usize> {
        let index = self.messages.iter().position(|m| m.id == handle.id)?;
        self.messages.remove(index);
        Some(index)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn transient_count(&self) -> usize {
        self.messages.iter().filter(|m| m.transient).count()
    }

    pub fn count_of(&self, kind: MessageKind) -> usize {
        self.messages.iter().filter(|m| m.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_index() {
        let mut t = Transcript::new();
        assert_eq!(t.append(ChatMessage::system("hello")), 0);
        assert_eq!(t.append(ChatMessage::user("hi")), 1);
        assert_eq!(t.count_of(MessageKind::User), 1);
    }

    #[test]
    fn test_replace_tail_transient() {
        let mut t = Transcript::new();
        t.append(ChatMessage::user("pizza"));
        let (handle, index) = t.begin_transient("Thinking...");
        assert_eq!(index, 1);
        assert_eq!(t.transient_count(), 1);

        let r = t.replace_transient(handle, ChatMessage::assistant("Found 3 places!"));
        assert_eq!(r.removed, Some(1));
        assert_eq!(r.appended, 1);
        assert_eq!(t.len(), 2);
        assert_eq!(t.transient_count(), 0);
        assert_eq!(t.last().unwrap().text, "Found 3 places!");
    }

    #[test]
    fn test_replace_transient_not_at_tail() {
        let mut t = Transcript::new();
        t.append(ChatMessage::user("pizza"));
        let (handle, _) = t.begin_transient("Thinking...");
        t.append(ChatMessage::system("Location detected!"));

        let r = t.replace_transient(handle, ChatMessage::assistant("done"));
        assert_eq!(r.removed, Some(1));
        let texts: Vec<&str> = t.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["pizza", "Location detected!", "done"]);
    }

    #[test]
    fn test_chain_transients_never_overlap() {
        let mut t = Transcript::new();
        let (thinking, _) = t.begin_transient("Thinking...");
        let (searching, r, _) = t.chain_transient(thinking, "Searching for: gyms...");
        assert_eq!(t.transient_count(), 1);
        assert_eq!(r.appended, 0);

        t.replace_transient(searching, ChatMessage::assistant("No places found."));
        assert_eq!(t.transient_count(), 0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_begin_transient_withdraws_stale_placeholder() {
        let mut t = Transcript::new();
        t.begin_transient("Thinking...");
        t.begin_transient("Thinking again...");
        assert_eq!(t.transient_count(), 1);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_withdraw_removes_only_its_placeholder() {
        let mut t = Transcript::new();
        t.append(ChatMessage::user("pizza"));
        let (handle, _) = t.begin_transient("Thinking...");
        t.append(ChatMessage::system("Location detected!"));

        assert_eq!(t.withdraw(handle), Some(1));
        assert_eq!(t.transient_count(), 0);
        assert_eq!(t.len(), 2);
        assert_eq!(t.withdraw(handle), None);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_replace_with_missing_handle_still_appends() {
        let mut t = Transcript::new();
        let (handle, _) = t.begin_transient("Thinking...");
        t.replace_transient(handle, ChatMessage::assistant("first"));
        let r = t.replace_transient(handle, ChatMessage::assistant("second"));
        assert_eq!(r.removed, None);
        assert_eq!(t.len(), 2);
    }
}
