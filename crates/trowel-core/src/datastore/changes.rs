//! Change notification channel owned by a datastore

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{ResourceId, RevisionId};

const DEFAULT_CAPACITY: usize = 256;

/// Receiving end of a [`ChangeFeed`]
pub type ChangeReceiver = broadcast::Receiver<DocumentChange>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    /// A revision written on another replica arrived
    Remote,
}

/// A document revision became current or conflicting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentChange {
    pub id: ResourceId,
    pub revision: RevisionId,
    pub kind: ChangeKind,
}

/// Broadcast of [`DocumentChange`]s to every subscriber
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<DocumentChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> ChangeReceiver {
        self.sender.subscribe()
    }

    pub fn publish(&self, change: DocumentChange) {
        // Sending only fails when nobody listens
        if self.sender.send(change).is_err() {
            tracing::trace!("No change subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_every_subscriber_receives_changes() {
        let feed = ChangeFeed::default();
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();

        let change = DocumentChange {
            id: ResourceId::from("a"),
            revision: RevisionId::from("1-x"),
            kind: ChangeKind::Created,
        };
        feed.publish(change.clone());

        assert_eq!(first.recv().await.unwrap(), change);
        assert_eq!(second.recv().await.unwrap(), change);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new(4);
        feed.publish(DocumentChange {
            id: ResourceId::from("a"),
            revision: RevisionId::from("1-x"),
            kind: ChangeKind::Updated,
        });
    }
}
