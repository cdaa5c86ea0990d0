//! Conflict resolution session for one document

use std::collections::{BTreeSet, HashMap};

use chrono::DateTime;
use futures::future::join_all;

use crate::config::ProjectConfig;
use crate::datastore::Datastore;
use crate::error::{Error, Result};
use crate::history::merge_change_histories;
use crate::models::{Action, Document, ResourceId, RevisionId};

use super::diff::{differing_fields, DifferingField, FieldKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    /// No conflicting revision selected
    Idle,
    /// A revision is selected and its differences are computed
    Reviewing,
}

/// Which side the current choices favour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinningSide {
    Left,
    Right,
    Mixed,
}

/// Walks the conflicting revisions of a document oldest first.
///
/// The live document (left side) accumulates the chosen values in memory.
/// Nothing is persisted before [`ConflictResolver::commit`], which is a
/// conditional write on the revision the session started from.
pub struct ConflictResolver<'a, D: Datastore + ?Sized> {
    datastore: &'a D,
    config: &'a ProjectConfig,
    document: Document,
    pending: Vec<Document>,
    inspected: Vec<RevisionId>,
    selected: Option<Document>,
    differing: Vec<DifferingField>,
    relation_targets: HashMap<ResourceId, Document>,
    messages: Vec<String>,
}

impl<'a, D: Datastore + ?Sized> ConflictResolver<'a, D> {
    pub fn new(datastore: &'a D, config: &'a ProjectConfig, document: Document) -> Self {
        Self {
            datastore,
            config,
            document,
            pending: Vec::new(),
            inspected: Vec::new(),
            selected: None,
            differing: Vec::new(),
            relation_targets: HashMap::new(),
            messages: Vec::new(),
        }
    }

    /// Fetch every conflicting revision not inspected yet and select the oldest.
    ///
    /// A revision that cannot be fetched is reported through
    /// [`ConflictResolver::messages`] and left out of this session.
    pub async fn load(&mut self) {
        let id = self.document.resource.id.clone();
        let wanted: Vec<RevisionId> = self
            .document
            .conflicts
            .iter()
            .filter(|revision| !self.inspected.contains(revision))
            .cloned()
            .collect();

        let fetched = join_all(
            wanted
                .iter()
                .map(|revision| self.datastore.get_revision(&id, revision)),
        )
        .await;

        let mut pending = Vec::with_capacity(fetched.len());
        for (revision, result) in wanted.iter().zip(fetched) {
            match result {
                Ok(document) => pending.push(document),
                Err(error) => {
                    tracing::warn!(
                        %id,
                        %revision,
                        %error,
                        "Conflicting revision could not be loaded"
                    );
                    self.messages.push(format!(
                        "Revision {revision} of {} could not be loaded: {error}",
                        self.document.resource.identifier
                    ));
                }
            }
        }
        pending.sort_by_key(Document::sort_date);
        self.pending = pending;
        tracing::debug!(%id, pending = self.pending.len(), "Loaded conflicting revisions");

        self.select_first().await;
    }

    async fn select_first(&mut self) {
        match self.pending.first().and_then(|document| document.revision.clone()) {
            Some(revision) => {
                if let Err(error) = self.select_revision(&revision).await {
                    self.messages.push(error.to_string());
                }
            }
            None => self.reset_selection(),
        }
    }

    fn reset_selection(&mut self) {
        self.selected = None;
        self.differing.clear();
        self.relation_targets.clear();
    }

    /// Select a pending revision and compute its differences to the live document
    pub async fn select_revision(&mut self, revision: &RevisionId) -> Result<()> {
        let selected = self
            .pending
            .iter()
            .find(|document| document.revision.as_ref() == Some(revision))
            .cloned()
            .ok_or_else(|| Error::RevisionNotFound {
                id: self.document.resource.id.to_string(),
                revision: revision.to_string(),
            })?;

        self.differing = differing_fields(&self.document.resource, &selected.resource, self.config);
        self.selected = Some(selected);
        self.fetch_relation_targets().await;
        Ok(())
    }

    async fn fetch_relation_targets(&mut self) {
        let Some(selected) = &self.selected else {
            return;
        };

        let ids: BTreeSet<&ResourceId> = self
            .differing
            .iter()
            .filter(|field| field.kind == FieldKind::Relation)
            .flat_map(|field| {
                let left = self.document.resource.relation(&field.name).unwrap_or_default();
                let right = selected.resource.relation(&field.name).unwrap_or_default();
                left.iter().chain(right)
            })
            .filter(|id| !self.relation_targets.contains_key(*id))
            .collect();
        let ids: Vec<ResourceId> = ids.into_iter().cloned().collect();

        let fetched = join_all(ids.iter().map(|id| self.datastore.get(id))).await;
        for (id, result) in ids.into_iter().zip(fetched) {
            match result {
                Ok(target) => {
                    self.relation_targets.insert(id, target);
                }
                Err(error) => {
                    tracing::warn!(%id, %error, "Relation target could not be loaded");
                    self.messages
                        .push(format!("Relation target {id} could not be loaded: {error}"));
                }
            }
        }
    }

    /// Let every differing field favour the right (`true`) or left side
    pub fn set_winning_side(&mut self, right_side_winning: bool) {
        for field in &mut self.differing {
            field.right_side_winning = right_side_winning;
        }
    }

    /// Choose the side of one differing field; `false` if no such field differs
    pub fn set_winning_side_for_field(&mut self, name: &str, right_side_winning: bool) -> bool {
        match self.differing.iter_mut().find(|field| field.name == name) {
            Some(field) => {
                field.right_side_winning = right_side_winning;
                true
            }
            None => false,
        }
    }

    pub fn winning_side(&self) -> WinningSide {
        let right = self
            .differing
            .iter()
            .filter(|field| field.right_side_winning)
            .count();
        if right == 0 {
            WinningSide::Left
        } else if right == self.differing.len() {
            WinningSide::Right
        } else {
            WinningSide::Mixed
        }
    }

    /// Apply the choices for the selected revision and move on to the next one
    pub async fn solve_conflict(&mut self) -> Result<()> {
        let selected = self
            .selected
            .take()
            .ok_or_else(|| Error::InvalidInput("no conflicting revision selected".to_string()))?;

        let resource = &mut self.document.resource;
        for field in self.differing.iter().filter(|field| field.right_side_winning) {
            if field.kind == FieldKind::Relation {
                match selected.resource.relations.get(&field.name) {
                    Some(targets) => {
                        resource.relations.insert(field.name.clone(), targets.clone());
                    }
                    None => {
                        resource.relations.remove(&field.name);
                    }
                }
            } else {
                match selected.resource.fields.get(&field.name) {
                    Some(value) => {
                        resource.fields.insert(field.name.clone(), value.clone());
                    }
                    None => {
                        resource.fields.remove(&field.name);
                    }
                }
            }
        }
        merge_change_histories(&mut self.document, &selected);

        if let Some(revision) = selected.revision {
            self.pending
                .retain(|document| document.revision.as_ref() != Some(&revision));
            tracing::debug!(
                id = %self.document.resource.id,
                %revision,
                "Conflicting revision solved"
            );
            self.inspected.push(revision);
        }

        self.reset_selection();
        self.select_first().await;
        Ok(())
    }

    /// Persist the resolved document, dropping every inspected revision.
    ///
    /// On failure the session and the live document stay as they were.
    pub async fn commit(&mut self) -> Result<Document> {
        let mut resolved = self.document.clone();
        resolved.modified.push(Action::now(self.config.user.as_str()));

        let saved = self.datastore.update(resolved, &self.inspected).await?;
        tracing::info!(
            id = %saved.resource.id,
            resolved = self.inspected.len(),
            remaining = saved.conflicts.len(),
            "Committed conflict resolution"
        );

        self.document = saved.clone();
        self.pending.clear();
        self.inspected.clear();
        self.reset_selection();
        Ok(saved)
    }

    pub const fn state(&self) -> ResolverState {
        if self.selected.is_some() {
            ResolverState::Reviewing
        } else {
            ResolverState::Idle
        }
    }

    /// Live document including the choices applied so far
    pub const fn document(&self) -> &Document {
        &self.document
    }

    pub const fn selected_revision(&self) -> Option<&Document> {
        self.selected.as_ref()
    }

    pub fn differing_fields(&self) -> &[DifferingField] {
        &self.differing
    }

    /// Revisions still to be inspected, oldest first
    pub fn pending(&self) -> &[Document] {
        &self.pending
    }

    pub fn inspected(&self) -> &[RevisionId] {
        &self.inspected
    }

    pub const fn relation_targets(&self) -> &HashMap<ResourceId, Document> {
        &self.relation_targets
    }

    /// Comma-separated identifiers of the fetched targets among `ids`
    pub fn target_identifiers(&self, ids: &[ResourceId]) -> String {
        ids.iter()
            .filter_map(|id| self.relation_targets.get(id))
            .map(|target| target.resource.identifier.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Non-fatal problems met while loading and selecting
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// `"<user> - <UTC time>"` of the latest action of a revision
pub fn revision_label(revision: &Document) -> String {
    let action = revision.last_modified();
    let time = DateTime::from_timestamp_millis(action.date).map_or_else(
        || action.date.to_string(),
        |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    format!("{} - {time}", action.user)
}
