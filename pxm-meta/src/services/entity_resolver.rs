//! Get-or-create resolution of reference entities
//!
//! `resolve` never fails. Storage trouble degrades to the Unknown entity and
//! an error log line. A lost creation race (the insert reports a conflict or
//! errors) is settled by querying again, so concurrent callers converge on
//! the single row that won.

use crate::db::store::{InsertOutcome, ReferenceStore};
use crate::models::{DescriptiveFields, ReferenceEntity};
use crate::services::resolution_cache::ResolutionCache;
use pxm_common::events::EventBus;
use pxm_common::{Error, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// How an entity was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<E> {
    /// Already cached or stored
    Found(E),
    /// Inserted by this call
    Created(E),
    /// Insert lost a race; the winner's row was found on re-query
    ConflictRetried(E),
    /// Storage could not produce the row; carries the Unknown entity
    Failed(E),
}

impl<E> Resolution<E> {
    pub fn entity(&self) -> &E {
        match self {
            Resolution::Found(e)
            | Resolution::Created(e)
            | Resolution::ConflictRetried(e)
            | Resolution::Failed(e) => e,
        }
    }

    pub fn into_entity(self) -> E {
        match self {
            Resolution::Found(e)
            | Resolution::Created(e)
            | Resolution::ConflictRetried(e)
            | Resolution::Failed(e) => e,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }
}

/// Resolver for one entity kind
pub struct EntityResolver<E: ReferenceEntity> {
    store: Arc<dyn ReferenceStore<E>>,
    cache: ResolutionCache<E>,
    /// Serializes inserts for this kind
    create_lock: Mutex<()>,
    events: EventBus,
    unknown: OnceLock<E>,
}

impl<E: ReferenceEntity> EntityResolver<E> {
    pub fn new(store: Arc<dyn ReferenceStore<E>>, cache: ResolutionCache<E>, events: EventBus) -> Self {
        Self {
            store,
            cache,
            create_lock: Mutex::new(()),
            events,
            unknown: OnceLock::new(),
        }
    }

    pub fn cache(&self) -> &ResolutionCache<E> {
        &self.cache
    }

    /// The Unknown entity, with its stored id once [`Self::seed_unknown`] ran
    pub fn unknown(&self) -> E {
        self.unknown.get().cloned().unwrap_or_else(E::unknown)
    }

    /// Canonical entity for `fields`
    ///
    /// Blank or unusable fields return Unknown without touching storage.
    pub async fn resolve(&self, fields: &DescriptiveFields) -> E {
        if fields.is_empty() {
            return self.unknown();
        }

        let candidate = E::from_fields(fields);
        if candidate.is_unknown() {
            return self.unknown();
        }

        self.first_or_create(candidate).await.into_entity()
    }

    /// Cache, then storage, then insert, then re-query
    pub async fn first_or_create(&self, candidate: E) -> Resolution<E> {
        let slug = candidate.slug().to_string();

        if let Some(cached) = self.cache.get(&slug) {
            debug!(kind = E::KIND, slug = %slug, "Resolved from cache");
            return Resolution::Found(cached);
        }

        match self.store.find_by_slug(&slug).await {
            Ok(Some(found)) => {
                self.cache.set(&slug, found.clone());
                return Resolution::Found(found);
            }
            Ok(None) => {}
            Err(e) => warn!(kind = E::KIND, slug = %slug, "Lookup failed, attempting insert: {}", e),
        }

        let inserted = {
            let _creating = self.create_lock.lock().await;
            self.store.insert_if_absent(&candidate).await
        };

        match inserted {
            Ok(InsertOutcome::Inserted(created)) => {
                if !created.is_unknown() {
                    self.events.publish_created(E::KIND, vec![created.name().to_string()]);
                    self.events.publish_count(&E::count_metric(), 1);
                }
                info!(kind = E::KIND, slug = %slug, "Created {}", created.name());
                self.cache.set(&slug, created.clone());
                return Resolution::Created(created);
            }
            Ok(InsertOutcome::Conflict) => {
                debug!(kind = E::KIND, slug = %slug, "Insert conflicted, querying again");
            }
            Err(e) => {
                debug!(kind = E::KIND, slug = %slug, "Insert failed, querying again: {}", e);
            }
        }

        match self.store.find_by_slug(&slug).await {
            Ok(Some(found)) => {
                self.cache.set(&slug, found.clone());
                Resolution::ConflictRetried(found)
            }
            Ok(None) => {
                error!(kind = E::KIND, slug = %slug, "Not found after failed insert, using unknown");
                Resolution::Failed(self.unknown())
            }
            Err(e) => {
                error!(kind = E::KIND, slug = %slug, "Re-query failed, using unknown: {}", e);
                Resolution::Failed(self.unknown())
            }
        }
    }

    /// Make sure the Unknown row exists and remember its id
    ///
    /// Creating the Unknown row publishes no events.
    pub async fn seed_unknown(&self) -> Result<E> {
        let unknown = E::unknown();
        let slug = unknown.slug().to_string();

        let stored = match self.store.find_by_slug(&slug).await? {
            Some(found) => found,
            None => {
                let inserted = {
                    let _creating = self.create_lock.lock().await;
                    self.store.insert_if_absent(&unknown).await?
                };
                match inserted {
                    InsertOutcome::Inserted(created) => created,
                    InsertOutcome::Conflict => self
                        .store
                        .find_by_slug(&slug)
                        .await?
                        .ok_or_else(|| Error::NotFound(format!("{} {}", E::KIND, slug)))?,
                }
            }
        };

        self.cache.set(&slug, stored.clone());
        if self.unknown.set(stored.clone()).is_err() {
            debug!(kind = E::KIND, "Unknown already seeded");
        }
        Ok(stored)
    }
}
