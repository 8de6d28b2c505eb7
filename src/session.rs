use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::gemini::{GeminiClient, RemoteServiceError, Turn, TurnRole};

/// Lazy sequence of reply fragments for one submission.
///
/// `Ok` items are text fragments in arrival order. An `Err` item reports the
/// failure that ended the exchange. The sequence ends (returns `None`) when
/// the reply finished normally, or right after an `Err`. Finite, not
/// restartable.
pub struct ReplyStream {
    rx: mpsc::UnboundedReceiver<Result<String, RemoteServiceError>>,
}

impl ReplyStream {
    pub async fn next(&mut self) -> Option<Result<String, RemoteServiceError>> {
        self.rx.recv().await
    }
}

/// One conversation's remote context: the fixed system instruction and the
/// turn history replayed to the endpoint on every call.
pub struct ChatSession {
    system_instruction: String,
    turns: Mutex<Vec<Turn>>,
}

impl ChatSession {
    fn new(system_instruction: String) -> Self {
        Self {
            system_instruction,
            turns: Mutex::new(Vec::new()),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    #[allow(dead_code)]
    pub fn turn_count(&self) -> usize {
        self.turns.lock().expect("session lock poisoned").len()
    }

    fn push_turn(&self, role: TurnRole, text: &str) {
        self.turns.lock().expect("session lock poisoned").push(Turn {
            role,
            text: text.to_string(),
        });
    }

    fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().expect("session lock poisoned").clone()
    }
}

/// Owns the single chat session for the program's lifetime.
pub struct SessionManager {
    client: GeminiClient,
    system_instruction: String,
    session: Option<Arc<ChatSession>>,
}

impl SessionManager {
    pub fn new(client: GeminiClient, system_instruction: String) -> Self {
        Self {
            client,
            system_instruction,
            session: None,
        }
    }

    /// Return the live session, creating it on first use. Repeat calls while
    /// a session exists are side-effect-free.
    pub fn ensure_session(&mut self) -> Arc<ChatSession> {
        let system_instruction = &self.system_instruction;
        Arc::clone(self.session.get_or_insert_with(|| {
            debug!("creating chat session");
            Arc::new(ChatSession::new(system_instruction.clone()))
        }))
    }

    /// Drop the session; the next `ensure_session` recreates it.
    #[allow(dead_code)]
    pub fn reset(&mut self) {
        self.session = None;
    }

    /// Send user text on the session and return the reply fragments as a
    /// lazy stream. The HTTP exchange runs on the runtime; on normal
    /// completion the full reply is recorded as a model turn.
    pub fn submit(&mut self, text: &str) -> ReplyStream {
        let session = self.ensure_session();
        let client = self.client.clone();
        let text = text.to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            session.push_turn(TurnRole::User, &text);
            let turns = session.snapshot();

            let result = client
                .stream_reply(session.system_instruction(), &turns, |fragment| {
                    // A closed receiver means the UI went away; nothing to do.
                    let _ = tx.send(Ok(fragment));
                })
                .await;

            match result {
                Ok(full_reply) => {
                    session.push_turn(TurnRole::Model, &full_reply);
                    // Dropping the sender ends the stream normally.
                }
                Err(error) => {
                    warn!("chat exchange failed: {error}");
                    let _ = tx.send(Err(error));
                }
            }
        });

        ReplyStream { rx }
    }
}
