//! Session state machine
//!
//! [`SessionController`] owns the conversation store, the active-conversation
//! pointer and the single in-flight send. Every transition is synchronous
//! except the gateway call itself, and each one publishes a fresh
//! [`SessionSnapshot`] for the presentation layer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, SessionError, SessionResult};
use crate::gateway::{AskReply, HistoryRecord, SyncGateway};
use crate::state::{Conversation, ConversationId, Credential, Message, MessageId, Origin};
use crate::store::ConversationStore;
use crate::title::derive_title;

/// Assistant text used when the backend replies without an answer
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response from model.";

/// Immutable view of the session handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub conversations: Vec<Conversation>,
    pub active_conversation_id: Option<ConversationId>,
    pub active_messages: Vec<Message>,
    pub pending: bool,
}

/// Ticket for the send currently in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    request_id: u64,
    conversation_id: ConversationId,
    question: String,
}

impl PendingSend {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }
}

/// Working copy of the conversation a send targets; only reaches the store on completion.
#[derive(Debug)]
struct InFlight {
    ticket: PendingSend,
    working: Conversation,
}

pub struct SessionController<G> {
    gateway: Arc<G>,
    credential: Credential,
    store: ConversationStore,
    active_id: Option<ConversationId>,
    active_messages: Vec<Message>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<G: SyncGateway + 'static> SessionController<G> {
    pub fn new(gateway: G, credential: Credential) -> Self {
        Self::with_shared_gateway(Arc::new(gateway), credential)
    }

    pub fn with_shared_gateway(gateway: Arc<G>, credential: Credential) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        Self {
            gateway,
            credential,
            store: ConversationStore::new(),
            active_id: None,
            active_messages: Vec::new(),
            in_flight: None,
            next_request_id: 0,
            snapshots,
        }
    }

    // Read side

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.active_id
    }

    pub fn active_messages(&self) -> &[Message] {
        &self.active_messages
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    /// Title of the active conversation, including one still awaiting its first reply
    pub fn active_title(&self) -> Option<&str> {
        let id = self.active_id?;
        match &self.in_flight {
            Some(flight) if flight.working.id == id => Some(flight.working.title.as_str()),
            _ => self.store.get(id).map(|c| c.title.as_str()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            conversations: self.store.conversations().to_vec(),
            active_conversation_id: self.active_id,
            active_messages: self.active_messages.clone(),
            pending: self.is_pending(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    // Transitions

    pub fn start_new_conversation(&mut self) {
        debug!("starting new conversation");
        self.active_id = None;
        self.active_messages.clear();
        self.publish();
    }

    pub fn select_conversation(&mut self, id: ConversationId) -> SessionResult<()> {
        let known = self.store.contains(id)
            || self.in_flight.as_ref().is_some_and(|flight| flight.working.id == id);
        if !known {
            warn!(%id, "select of unknown conversation ignored");
            return Err(SessionError::NotFound(id));
        }

        debug!(%id, "selecting conversation");
        self.active_id = Some(id);
        self.rederive_active();
        self.publish();
        Ok(())
    }

    /// Replace the store with the user's server-side history.
    ///
    /// On failure nothing is touched and the error goes back to the caller.
    pub async fn hydrate(&mut self) -> SessionResult<usize> {
        if self.is_pending() {
            return Err(SessionError::ConcurrencyViolation);
        }

        let records = match self.gateway.list_conversations(&self.credential).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "failed to load conversation history");
                return Err(err.into());
            }
        };

        // Repeats of the same timestamp and question are numbered in list order
        let mut seen: HashMap<String, usize> = HashMap::new();
        let conversations: Vec<Conversation> = records
            .into_iter()
            .map(|record| {
                let mut key = format!("{}|{}", record.created_at.to_rfc3339(), record.question);
                let repeat = seen.entry(key.clone()).or_insert(0);
                if *repeat > 0 {
                    key = format!("{}#{}", key, repeat);
                }
                *repeat += 1;
                conversation_from_record(&key, record)
            })
            .collect();
        let count = conversations.len();
        self.store.replace_all(conversations);

        if let Some(id) = self.active_id {
            if !self.store.contains(id) {
                self.active_id = None;
            }
        }
        self.rederive_active();
        self.publish();

        info!(count, "hydrated conversation history");
        Ok(count)
    }

    /// Validate, append the user's message optimistically and mark the session pending.
    pub fn begin_send(&mut self, content: &str) -> SessionResult<PendingSend> {
        if content.trim().is_empty() {
            return Err(SessionError::Validation("message content is empty"));
        }
        if self.is_pending() {
            return Err(SessionError::ConcurrencyViolation);
        }

        let now = Utc::now();
        let mut working = match self.active_id.and_then(|id| self.store.get(id)) {
            Some(existing) => existing.clone(),
            None => {
                let conversation = Conversation::new(ConversationId::new_random(), derive_title(content), now);
                debug!(id = %conversation.id, title = %conversation.title, "created conversation");
                conversation
            }
        };
        working.messages.push(Message::user(content, now));

        self.next_request_id += 1;
        let ticket = PendingSend {
            request_id: self.next_request_id,
            conversation_id: working.id,
            question: content.to_string(),
        };

        self.active_id = Some(working.id);
        self.active_messages = working.messages.clone();
        self.in_flight = Some(InFlight {
            ticket: ticket.clone(),
            working,
        });
        self.publish();

        debug!(request_id = ticket.request_id, conversation = %ticket.conversation_id, "send started");
        Ok(ticket)
    }

    /// The gateway call for `ticket`, detached from `self` so it can be spawned.
    pub fn request(&self, ticket: &PendingSend) -> impl Future<Output = Result<AskReply, GatewayError>> + Send + 'static {
        let gateway = Arc::clone(&self.gateway);
        let credential = self.credential.clone();
        let question = ticket.question.clone();
        async move { gateway.ask(&question, &credential).await }
    }

    /// Record the assistant turn for `ticket` and commit the conversation to the store.
    pub fn complete_send(&mut self, ticket: PendingSend, outcome: Result<AskReply, GatewayError>) {
        let flight = match self.in_flight.take() {
            Some(flight) if flight.ticket.request_id == ticket.request_id => flight,
            other => {
                self.in_flight = other;
                warn!(request_id = ticket.request_id, "completion for stale send ignored");
                return;
            }
        };

        let now = Utc::now();
        let reply = match outcome {
            Ok(reply) => reply
                .answer
                .filter(|answer| !answer.trim().is_empty())
                .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()),
            Err(err) => {
                warn!(error = %err, "ask failed, recording error turn");
                failure_text(&err)
            }
        };

        let mut conversation = flight.working;
        conversation.messages.push(Message::assistant(reply, now));
        conversation.touch(now);

        info!(
            conversation = %conversation.id,
            messages = conversation.messages.len(),
            "send completed"
        );
        self.store.upsert(conversation);
        self.rederive_active();
        self.publish();
    }

    /// Full send cycle. Gateway failures become an assistant turn and never reach the caller.
    pub async fn send(&mut self, content: &str) -> SessionResult<()> {
        let ticket = self.begin_send(content)?;
        let outcome = self.request(&ticket).await;
        self.complete_send(ticket, outcome);
        Ok(())
    }

    /// Tear the session down, dropping all in-memory state.
    pub fn logout(self) {
        info!(conversations = self.store.len(), "session closed");
    }

    fn rederive_active(&mut self) {
        self.active_messages = match self.active_id {
            None => Vec::new(),
            Some(id) => match &self.in_flight {
                Some(flight) if flight.working.id == id => flight.working.messages.clone(),
                _ => self.store.get(id).map(|c| c.messages.clone()).unwrap_or_default(),
            },
        };
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

pub fn failure_text(err: &GatewayError) -> String {
    format!("Error: {}", err)
}

fn conversation_from_record(key: &str, record: HistoryRecord) -> Conversation {
    let id = ConversationId::from_name(key);
    let answer = record
        .answer
        .filter(|answer| !answer.trim().is_empty())
        .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string());

    let mut conversation = Conversation::new(id, derive_title(&record.question), record.created_at);
    conversation.messages.push(Message::new(
        MessageId::from_name(&format!("{}|user", key)),
        record.question,
        Origin::User,
        record.created_at,
    ));
    conversation.messages.push(Message::new(
        MessageId::from_name(&format!("{}|assistant", key)),
        answer,
        Origin::Assistant,
        record.created_at,
    ));
    conversation
}
