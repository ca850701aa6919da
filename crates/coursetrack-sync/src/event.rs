//! Change notifications.

use coursetrack_models::{ItemRef, ItemState, ModuleId, ModuleSummary};

/// Events published after store mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A module's aggregates changed.
    ModuleRecomputed {
        /// Module ID.
        module_id: ModuleId,
        /// Reconciled state after the change.
        summary: ModuleSummary,
    },
    /// An item's state changed.
    ItemUpdated {
        /// Owning module.
        module_id: ModuleId,
        /// The item.
        item: ItemRef,
        /// New state.
        state: ItemState,
    },
    /// A learner action could not be persisted and was rolled back.
    WriteFailed {
        /// The item.
        item: ItemRef,
        /// Error message.
        error: String,
    },
    /// A fetch result arrived for a view or target no longer tracked.
    ArrivalDiscarded {
        /// What arrived.
        target: String,
        /// Why it was dropped.
        reason: String,
    },
}

impl ProgressEvent {
    /// Returns the module ID associated with this event, if any.
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            ProgressEvent::ModuleRecomputed { module_id, .. } => Some(module_id),
            ProgressEvent::ItemUpdated { module_id, .. } => Some(module_id),
            ProgressEvent::WriteFailed { .. } => None,
            ProgressEvent::ArrivalDiscarded { .. } => None,
        }
    }

    /// Returns true if this event reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, ProgressEvent::WriteFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursetrack_models::Module;

    #[test]
    fn test_event_module_id() {
        let module_id = ModuleId::from("m1");

        let event = ProgressEvent::ModuleRecomputed {
            module_id: module_id.clone(),
            summary: Module::new("m1").summary(),
        };
        assert_eq!(event.module_id(), Some(&module_id));

        let event = ProgressEvent::ItemUpdated {
            module_id: module_id.clone(),
            item: ItemRef::Content("c1".into()),
            state: ItemState::Completed,
        };
        assert_eq!(event.module_id(), Some(&module_id));

        let event = ProgressEvent::ArrivalDiscarded {
            target: "contents of module m1".to_string(),
            reason: "stale".to_string(),
        };
        assert_eq!(event.module_id(), None);
    }

    #[test]
    fn test_event_is_error() {
        let event = ProgressEvent::WriteFailed {
            item: ItemRef::Video("v1".into()),
            error: "timeout".to_string(),
        };
        assert!(event.is_error());

        let event = ProgressEvent::ArrivalDiscarded {
            target: "video:v1".to_string(),
            reason: "stale".to_string(),
        };
        assert!(!event.is_error());
    }
}
