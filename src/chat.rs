use chrono::{DateTime, Utc};

/// Shown in place of the streamed reply when the exchange fails. Whatever
/// partial text already arrived is replaced wholesale.
pub const FALLBACK_REPLY: &str =
    "Sorry, something went wrong on my end. Give it another try in a moment, \
     or reach us through the store links in the sidebar.";

pub const WELCOME_MESSAGE: &str =
    "Welcome to Northstar Supply! I'm the store assistant — ask me anything \
     about our gear, pricing, or delivery.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotStatus {
    #[default]
    Idle,
    Thinking,
    Error,
}

/// Ordered conversation log plus the submission state machine.
///
/// Append-only, except that the content of the single "open" assistant
/// message grows while its reply streams in. Only `Thinking` blocks a new
/// submission; `Error` is not sticky.
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    status: BotStatus,
    open_assistant: Option<MessageId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
            status: BotStatus::Idle,
            open_assistant: None,
        }
    }

    /// Transcript seeded with the assistant's greeting.
    pub fn with_welcome() -> Self {
        let mut transcript = Self::new();
        transcript.append(Role::Assistant, WELCOME_MESSAGE.to_string());
        transcript
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> BotStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status == BotStatus::Thinking
    }

    /// Id of the assistant message currently receiving fragments, if any.
    pub fn open_assistant(&self) -> Option<MessageId> {
        self.open_assistant
    }

    /// Start a new exchange: append the user message followed by an
    /// empty assistant placeholder and switch to `Thinking`.
    ///
    /// Returns `None` without touching anything when the trimmed text is
    /// empty or a reply is already in flight.
    pub fn begin_exchange(&mut self, text: &str) -> Option<MessageId> {
        if text.trim().is_empty() || self.is_busy() {
            return None;
        }

        self.append(Role::User, text.to_string());
        let id = self.append(Role::Assistant, String::new());
        self.open_assistant = Some(id);
        self.status = BotStatus::Thinking;
        Some(id)
    }

    /// Concatenate a streamed fragment onto the open assistant message.
    pub fn push_fragment(&mut self, fragment: &str) {
        if let Some(message) = self.open_message_mut() {
            message.content.push_str(fragment);
        }
    }

    /// The reply stream finished normally.
    pub fn complete(&mut self) {
        self.open_assistant = None;
        self.status = BotStatus::Idle;
    }

    /// The reply stream failed: replace whatever partial content arrived
    /// with the fixed fallback text.
    pub fn fail(&mut self) {
        if let Some(message) = self.open_message_mut() {
            message.content = FALLBACK_REPLY.to_string();
        }
        self.open_assistant = None;
        self.status = BotStatus::Error;
    }

    fn append(&mut self, role: Role, content: String) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            content,
            timestamp: Utc::now(),
        });
        id
    }

    fn open_message_mut(&mut self) -> Option<&mut Message> {
        let id = self.open_assistant?;
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_exchange_appends_user_and_placeholder() {
        let mut transcript = Transcript::new();
        let id = transcript.begin_exchange("do you ship abroad?");

        assert!(id.is_some());
        assert_eq!(transcript.messages().len(), 2);
        assert_eq!(transcript.messages()[0].role, Role::User);
        assert_eq!(transcript.messages()[0].content, "do you ship abroad?");
        assert_eq!(transcript.messages()[1].role, Role::Assistant);
        assert_eq!(transcript.messages()[1].content, "");
        assert_eq!(transcript.status(), BotStatus::Thinking);
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut transcript = Transcript::new();
        transcript.begin_exchange("hello");
        transcript.push_fragment("Hi");
        transcript.push_fragment(" there");
        transcript.push_fragment("!");
        transcript.complete();

        assert_eq!(transcript.messages()[1].content, "Hi there!");
        assert_eq!(transcript.status(), BotStatus::Idle);
        assert!(transcript.open_assistant().is_none());
    }

    #[test]
    fn test_submission_while_thinking_is_rejected() {
        let mut transcript = Transcript::new();
        transcript.begin_exchange("first");
        transcript.push_fragment("partial");

        assert!(transcript.begin_exchange("second").is_none());
        assert_eq!(transcript.messages().len(), 2);
        assert_eq!(transcript.messages()[1].content, "partial");
    }

    #[test]
    fn test_blank_submission_is_rejected() {
        let mut transcript = Transcript::new();
        assert!(transcript.begin_exchange("").is_none());
        assert!(transcript.begin_exchange("   \t\n").is_none());
        assert!(transcript.messages().is_empty());
        assert_eq!(transcript.status(), BotStatus::Idle);
    }

    #[test]
    fn test_failure_overwrites_partial_content() {
        let mut transcript = Transcript::new();
        transcript.begin_exchange("x");
        transcript.push_fragment("half an ans");
        transcript.fail();

        assert_eq!(transcript.messages()[1].content, FALLBACK_REPLY);
        assert_eq!(transcript.status(), BotStatus::Error);
    }

    #[test]
    fn test_failure_before_any_fragment() {
        let mut transcript = Transcript::new();
        transcript.begin_exchange("x");
        transcript.fail();

        assert_eq!(transcript.messages()[1].content, FALLBACK_REPLY);
        assert_eq!(transcript.status(), BotStatus::Error);
    }

    #[test]
    fn test_error_status_does_not_block_next_submission() {
        let mut transcript = Transcript::new();
        transcript.begin_exchange("x");
        transcript.fail();

        let id = transcript.begin_exchange("retry");
        assert!(id.is_some());
        assert_eq!(transcript.status(), BotStatus::Thinking);
        assert_eq!(transcript.messages().len(), 4);
    }

    #[test]
    fn test_welcome_scenario() {
        let mut transcript = Transcript::with_welcome();
        transcript.begin_exchange("hello");
        transcript.push_fragment("Hi");
        transcript.push_fragment(" there");
        transcript.complete();

        let messages = transcript.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, WELCOME_MESSAGE);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hello");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "Hi there");
        assert_eq!(transcript.status(), BotStatus::Idle);
    }

    #[test]
    fn test_message_ids_are_unique_and_increasing() {
        let mut transcript = Transcript::with_welcome();
        transcript.begin_exchange("one");
        transcript.complete();
        transcript.begin_exchange("two");

        let ids: Vec<MessageId> = transcript.messages().iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_back_to_back_submissions_append_one_pair() {
        let mut transcript = Transcript::new();
        let first = transcript.begin_exchange("first");
        let second = transcript.begin_exchange("second");

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(transcript.messages().len(), 2);

        // Once the first resolves, the next submission goes through.
        transcript.push_fragment("done");
        transcript.complete();
        assert!(transcript.begin_exchange("second").is_some());
        assert_eq!(transcript.messages().len(), 4);
    }
}
