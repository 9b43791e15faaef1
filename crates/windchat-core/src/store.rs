use crate::state::{Conversation, ConversationId};

/// In-memory conversations, most recently updated first
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id. The conversation always ends up first in display order.
    pub fn upsert(&mut self, conversation: Conversation) {
        if let Some(pos) = self.position(conversation.id) {
            self.conversations.remove(pos);
        }
        self.conversations.insert(0, conversation);
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ConversationId) -> bool {
        self.position(id).is_some()
    }

    /// Bulk load, discarding everything held before. Order is kept as given.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn conversation(title: &str) -> Conversation {
        Conversation::new(ConversationId::new_random(), title, Utc::now())
    }

    #[test]
    fn test_upsert_inserts_at_front() {
        let mut store = ConversationStore::new();
        let a = conversation("a");
        let b = conversation("b");
        store.upsert(a.clone());
        store.upsert(b.clone());

        let titles: Vec<&str> = store.conversations().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn test_upsert_replaces_and_moves_to_front() {
        let mut store = ConversationStore::new();
        let mut a = conversation("a");
        let b = conversation("b");
        store.upsert(a.clone());
        store.upsert(b);

        a.title = "a renamed".to_string();
        store.upsert(a.clone());

        assert_eq!(store.len(), 2);
        assert_eq!(store.conversations()[0].id, a.id);
        assert_eq!(store.get(a.id).map(|c| c.title.as_str()), Some("a renamed"));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = ConversationStore::new();
        assert!(store.get(ConversationId::new_random()).is_none());
    }

    #[test]
    fn test_replace_all_overwrites_and_keeps_order() {
        let mut store = ConversationStore::new();
        let local = conversation("local");
        store.upsert(local.clone());

        let loaded = vec![conversation("x"), conversation("y"), conversation("z")];
        store.replace_all(loaded.clone());

        assert_eq!(store.conversations(), loaded.as_slice());
        assert!(!store.contains(local.id));
    }
}
