use serde::{Deserialize, Serialize};

/// A single entry in a conversation history.
///
/// Histories are append-only ordered sequences of messages; a message is
/// never edited once it has been pushed onto a history. The assistant only
/// produces the `user` and `assistant` roles, but custom roles round-trip
/// through serialization unchanged.
///
/// ```
/// use aqarchat::message::Message;
///
/// let question = Message::user("Do you have villas in New Cairo?");
/// assert!(question.has_role(Message::USER));
///
/// let json = serde_json::to_string(&question).unwrap();
/// let parsed: Message = serde_json::from_str(&json).unwrap();
/// assert_eq!(question, parsed);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Role of the sender (see the constants on [`Message`]).
    pub role: String,
    /// Text content of the message.
    pub content: String,
}

impl Message {
    /// End-user input role.
    pub const USER: &'static str = "user";
    /// Generated reply role.
    pub const ASSISTANT: &'static str = "assistant";

    /// Creates a message with an arbitrary role.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Returns `true` if this message carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Renders the last `window` messages as `Role: content` lines for prompt
/// interpolation, or `fallback` when the history is empty.
pub fn render_recent(history: &[Message], window: usize, fallback: &str) -> String {
    if history.is_empty() {
        return fallback.to_string();
    }
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|msg| {
            let mut role = msg.role.clone();
            if let Some(first) = role.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            format!("{role}: {content}", content = msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(Message::user("hi").role, Message::USER);
        assert_eq!(Message::assistant("hello").role, Message::ASSISTANT);
        assert_eq!(Message::new("system", "x").role, "system");
    }

    #[test]
    fn render_recent_empty_history_uses_fallback() {
        let rendered = render_recent(&[], 4, "No previous messages.");
        assert_eq!(rendered, "No previous messages.");
    }

    #[test]
    fn render_recent_trims_to_window() {
        let history: Vec<Message> = (0..6)
            .map(|i| Message::user(&format!("turn {i}")))
            .collect();
        let rendered = render_recent(&history, 4, "-");
        assert!(!rendered.contains("turn 1"));
        assert!(rendered.contains("turn 2"));
        assert!(rendered.contains("turn 5"));
        assert!(rendered.starts_with("User: "));
    }

    #[test]
    fn serialization_round_trip() {
        let original = Message::assistant("مرحبا");
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
    }
}
