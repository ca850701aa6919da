//! State shared by the loader, the event handlers and the view.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::warn;

use coursetrack_backend::LearningBackend;
use coursetrack_core::{CompletionStore, Generation, StoreError, Update};
use coursetrack_models::{ItemRef, ItemState, LearningItem, ModuleId};

use crate::config::SyncConfig;
use crate::event::ProgressEvent;

/// Backend, store and event channel of one [`CourseView`](crate::CourseView).
#[derive(Clone)]
pub struct SyncContext {
    pub(crate) backend: Arc<dyn LearningBackend>,
    pub(crate) store: Arc<RwLock<CompletionStore>>,
    pub(crate) config: SyncConfig,
    event_tx: broadcast::Sender<ProgressEvent>,
}

impl SyncContext {
    /// Creates a context with an empty store.
    pub fn new(backend: Arc<dyn LearningBackend>, config: SyncConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            backend,
            store: Arc::new(RwLock::new(CompletionStore::new(&config.engine))),
            config,
            event_tx,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: ProgressEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Generation of the current view.
    pub async fn generation(&self) -> Generation {
        self.store.read().await.generation()
    }

    /// Runs one store mutation under the write lock and publishes what changed.
    pub(crate) async fn apply<F>(&self, item: Option<&ItemRef>, f: F) -> Result<Update, StoreError>
    where
        F: FnOnce(&mut CompletionStore) -> Result<Update, StoreError> + Send,
    {
        self.apply_with(item, |store| f(store).map(|update| (update, ())))
            .await
            .map(|(update, ())| update)
    }

    /// Like [`apply`](Self::apply), passing through an extra result.
    pub(crate) async fn apply_with<F, R>(&self, item: Option<&ItemRef>, f: F) -> Result<(Update, R), StoreError>
    where
        F: FnOnce(&mut CompletionStore) -> Result<(Update, R), StoreError> + Send,
        R: Send,
    {
        let (result, events) = {
            let mut store = self.store.write().await;
            let result = f(&mut store);
            let events = match &result {
                Ok((update, _)) if update.changed => change_events(&store, update, item),
                _ => Vec::new(),
            };
            (result, events)
        };
        for event in events {
            self.emit(event);
        }
        result
    }

    /// Logs and publishes an arrival the store rejected.
    pub(crate) fn discard(&self, target: &str, err: &StoreError) {
        warn!(target_item = %target, error = %err, "discarding arrival");
        self.emit(ProgressEvent::ArrivalDiscarded {
            target: target.to_string(),
            reason: err.to_string(),
        });
    }

    /// Publishes the current summary of each module.
    pub(crate) async fn publish_modules(&self, module_ids: &[ModuleId]) {
        let events: Vec<ProgressEvent> = {
            let store = self.store.read().await;
            module_ids
                .iter()
                .filter_map(|id| store.module(id))
                .map(|module| ProgressEvent::ModuleRecomputed {
                    module_id: module.id.clone(),
                    summary: module.summary(),
                })
                .collect()
        };
        for event in events {
            self.emit(event);
        }
    }
}

/// Current state of a tracked item.
pub(crate) fn item_state(store: &CompletionStore, item: &ItemRef) -> Option<ItemState> {
    match item {
        ItemRef::Content(id) => store.content(id).map(|c| c.state()),
        ItemRef::Video(id) => store.video(id).map(|v| v.state()),
        ItemRef::Quiz(id) => store.quiz(id).map(|q| q.state()),
    }
}

fn change_events(store: &CompletionStore, update: &Update, item: Option<&ItemRef>) -> Vec<ProgressEvent> {
    let mut events = Vec::with_capacity(2);
    if let Some(item) = item {
        if let Some(state) = item_state(store, item) {
            events.push(ProgressEvent::ItemUpdated {
                module_id: update.module_id.clone(),
                item: item.clone(),
                state,
            });
        }
    }
    if let Some(module) = store.module(&update.module_id) {
        events.push(ProgressEvent::ModuleRecomputed {
            module_id: module.id.clone(),
            summary: module.summary(),
        });
    }
    events
}
