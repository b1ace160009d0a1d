// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Per-kind entity registry: EntityId -> shared native entity.
//
// Each registry has its own lock. Only `insert_under` touches two registries
// and it always takes the parent (read) before the child (write).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::XrceError;
use crate::types::{EntityId, ObjectKind};

pub(crate) struct Registry<T> {
    kind: ObjectKind,
    entries: RwLock<HashMap<EntityId, Arc<T>>>,
}

impl<T> Registry<T> {
    pub(crate) fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn kind(&self) -> ObjectKind {
        self.kind
    }

    fn not_found(&self, id: EntityId) -> XrceError {
        XrceError::NotFound {
            kind: self.kind,
            id,
        }
    }

    pub(crate) fn get(&self, id: EntityId) -> Result<Arc<T>, XrceError> {
        self.entries
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Fail early with `AlreadyExists` before building an entity.
    pub(crate) fn ensure_vacant(&self, id: EntityId) -> Result<(), XrceError> {
        if self.contains(id) {
            return Err(XrceError::AlreadyExists {
                kind: self.kind,
                id,
            });
        }
        Ok(())
    }

    /// Insert a fully-built entity.
    pub(crate) fn insert(&self, id: EntityId, entity: Arc<T>) -> Result<(), XrceError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(XrceError::AlreadyExists {
                kind: self.kind,
                id,
            });
        }
        entries.insert(id, entity);
        Ok(())
    }

    /// Insert while holding the parent registry, so the parent cannot be
    /// deleted between the existence check and the insertion.
    pub(crate) fn insert_under<P>(
        &self,
        id: EntityId,
        entity: Arc<T>,
        parents: &Registry<P>,
        parent_id: EntityId,
    ) -> Result<(), XrceError> {
        self.insert_unique_under(id, entity, parents, parent_id, |_| false)
    }

    /// `insert_under`, also refusing when an existing entry `conflicts`
    /// with the new one. The conflict check runs under the write lock, so
    /// two racing inserts cannot both pass it.
    pub(crate) fn insert_unique_under<P>(
        &self,
        id: EntityId,
        entity: Arc<T>,
        parents: &Registry<P>,
        parent_id: EntityId,
        conflicts: impl Fn(&T) -> bool,
    ) -> Result<(), XrceError> {
        let parent_entries = parents.entries.read();
        if !parent_entries.contains_key(&parent_id) {
            return Err(parents.not_found(parent_id));
        }
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(XrceError::AlreadyExists {
                kind: self.kind,
                id,
            });
        }
        if let Some(&existing) = entries
            .iter()
            .find(|(_, e)| conflicts(e))
            .map(|(existing, _)| existing)
        {
            return Err(XrceError::AlreadyExists {
                kind: self.kind,
                id: existing,
            });
        }
        entries.insert(id, entity);
        Ok(())
    }

    pub(crate) fn remove(&self, id: EntityId) -> Result<Arc<T>, XrceError> {
        self.entries
            .write()
            .remove(&id)
            .ok_or_else(|| self.not_found(id))
    }

    /// First entry satisfying `pred`.
    pub(crate) fn find(&self, pred: impl Fn(&T) -> bool) -> Option<(EntityId, Arc<T>)> {
        self.entries
            .read()
            .iter()
            .find(|(_, e)| pred(e))
            .map(|(&id, e)| (id, Arc::clone(e)))
    }

    /// Run `f` on the entry under the shared lock.
    pub(crate) fn with_entry<R>(&self, id: EntityId, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.entries.read().get(&id).map(|e| f(e))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
