//! In-memory conversation store
//!
//! Backs both the in-process mock surface and the out-of-process surrogate.
//! Besides the live set it keeps a roster of every conversation ever created,
//! standing in for the server-side view a resync pulls from, and tombstones
//! for deleted ids so a resync cannot bring a deleted conversation back
//! (unless [`Fault::ResurrectOnResync`] is injected).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// The entity under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
}

/// Misbehaviour injected for harness self-tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Fault {
    #[default]
    None,
    /// `delete` reports success but leaves the conversation in place
    IgnoreDelete,
    /// `create` always fails
    FailCreate,
    /// Scenario operations never answer
    Stall,
    /// `resync` ignores tombstones, so deleted conversations come back
    ResurrectOnResync,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    live: BTreeMap<String, Conversation>,
    roster: BTreeMap<String, Conversation>,
    tombstones: BTreeSet<String>,
    fault: Fault,
}

impl ConversationStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            ..Default::default()
        }
    }

    pub fn fault(&self) -> Fault {
        self.fault
    }

    pub fn create(&mut self, id: &str, name: &str) -> Result<Conversation> {
        if self.fault == Fault::FailCreate {
            return Err(Error::Internal("injected create failure".to_string()));
        }
        if self.live.contains_key(id) {
            return Err(Error::ConversationExists(id.to_string()));
        }

        let conversation = Conversation {
            id: id.to_string(),
            name: name.to_string(),
        };
        self.live.insert(id.to_string(), conversation.clone());
        self.roster.insert(id.to_string(), conversation.clone());
        self.tombstones.remove(id);
        Ok(conversation)
    }

    /// Delete a live conversation; deleting an unknown id is an error
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if !self.live.contains_key(id) {
            return Err(Error::ConversationNotFound(id.to_string()));
        }
        if self.fault == Fault::IgnoreDelete {
            tracing::debug!(id, "Ignoring delete (injected fault)");
            return Ok(());
        }

        self.live.remove(id);
        self.tombstones.insert(id.to_string());
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Option<Conversation> {
        self.live.get(id).cloned()
    }

    /// Restore rostered conversations that are neither live nor tombstoned
    ///
    /// With [`Fault::ResurrectOnResync`] tombstones are ignored.
    ///
    /// Returns the number of conversations restored.
    pub fn resync(&mut self) -> usize {
        let missing: Vec<Conversation> = self
            .roster
            .values()
            .filter(|c| !self.live.contains_key(&c.id))
            .filter(|c| {
                self.fault == Fault::ResurrectOnResync || !self.tombstones.contains(&c.id)
            })
            .cloned()
            .collect();

        let restored = missing.len();
        for conversation in missing {
            self.live.insert(conversation.id.clone(), conversation);
        }
        restored
    }

    /// Record a conversation on the server side only, as if another device created it
    #[cfg(test)]
    pub(crate) fn seed_remote(&mut self, conversation: Conversation) {
        self.roster.insert(conversation.id.clone(), conversation);
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
