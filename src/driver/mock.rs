//! In-process mock surface

use async_trait::async_trait;

use crate::common::Result;
use crate::store::{Conversation, ConversationStore, Fault};

use super::ConversationSurface;

/// Surface backed by an in-process store, for harness self-tests
#[derive(Debug, Default)]
pub struct MockSurface {
    store: ConversationStore,
}

impl MockSurface {
    pub fn new(fault: Fault) -> Self {
        Self {
            store: ConversationStore::new(fault),
        }
    }

    async fn maybe_stall(&self) {
        if self.store.fault() == Fault::Stall {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl ConversationSurface for MockSurface {
    fn describe(&self) -> String {
        match self.store.fault() {
            Fault::None => "mock (in-process)".to_string(),
            fault => format!("mock (in-process, fault: {:?})", fault),
        }
    }

    async fn create(&mut self, id: &str, name: &str) -> Result<Conversation> {
        self.maybe_stall().await;
        self.store.create(id, name)
    }

    async fn delete(&mut self, id: &str) -> Result<()> {
        self.maybe_stall().await;
        self.store.delete(id)
    }

    async fn lookup(&mut self, id: &str) -> Result<Option<Conversation>> {
        self.maybe_stall().await;
        Ok(self.store.lookup(id))
    }

    async fn resync(&mut self) -> Result<()> {
        self.maybe_stall().await;
        self.store.resync();
        Ok(())
    }
}
