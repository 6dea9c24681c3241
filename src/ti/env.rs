use crate::ti::error::{TiError, TiResult};
use crate::util::tag_table::{ObjectTagTable, Tag};
use enum_map::{Enum, EnumMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

/// The optional features an environment asked for when it was created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub can_tag_objects: bool,
    pub can_generate_object_free_events: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Capabilities {
            can_tag_objects: true,
            can_generate_object_free_events: true,
        }
    }
}

/// The events heapti raises.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, Display, EnumIter)]
pub enum TiEvent {
    ObjectFree,
    ObsoleteObjectCreated,
}

/// Called when a tagged object is collected, with its tag.
pub type ObjectFreeCallback = Arc<dyn Fn(Tag) + Send + Sync>;

/// Called when an object is replaced by another, with the tags of the old and the new object. The
/// tags the callback leaves behind are the tags the two objects carry afterwards.
pub type ObsoleteObjectCreatedCallback = Arc<dyn Fn(&mut Tag, &mut Tag) + Send + Sync>;

/// An environment: one attached tool, with its own tags, capabilities and event callbacks.
pub struct TiEnv {
    id: usize,
    capabilities: Capabilities,
    tag_table: Arc<ObjectTagTable>,
    enabled_events: EnumMap<TiEvent, AtomicBool>,
    object_free: spin::RwLock<Option<ObjectFreeCallback>>,
    obsolete_object_created: spin::RwLock<Option<ObsoleteObjectCreatedCallback>>,
}

impl TiEnv {
    pub(crate) fn new(id: usize, capabilities: Capabilities) -> Self {
        TiEnv {
            id,
            capabilities,
            tag_table: Arc::new(ObjectTagTable::new()),
            enabled_events: EnumMap::default(),
            object_free: spin::RwLock::new(None),
            obsolete_object_created: spin::RwLock::new(None),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn tag_table(&self) -> &Arc<ObjectTagTable> {
        &self.tag_table
    }

    pub(crate) fn require_can_tag_objects(&self) -> TiResult<()> {
        if self.capabilities.can_tag_objects {
            Ok(())
        } else {
            Err(TiError::MustPossessCapability)
        }
    }

    /// Install or remove the callback for collected tagged objects. The callback is only called
    /// while [`TiEvent::ObjectFree`] is enabled.
    pub fn set_object_free_callback(&self, callback: Option<ObjectFreeCallback>) -> TiResult<()> {
        if !self.capabilities.can_generate_object_free_events {
            return Err(TiError::MustPossessCapability);
        }
        *self.object_free.write() = callback;
        self.update_object_free_hook();
        Ok(())
    }

    /// Install or remove the callback for replaced objects. The callback is only called while
    /// [`TiEvent::ObsoleteObjectCreated`] is enabled. Otherwise the old and the new object swap
    /// their tags.
    pub fn set_obsolete_object_created_callback(
        &self,
        callback: Option<ObsoleteObjectCreatedCallback>,
    ) {
        *self.obsolete_object_created.write() = callback;
    }

    pub fn set_event_enabled(&self, event: TiEvent, enabled: bool) -> TiResult<()> {
        if event == TiEvent::ObjectFree && !self.capabilities.can_generate_object_free_events {
            return Err(TiError::MustPossessCapability);
        }
        self.enabled_events[event].store(enabled, Ordering::SeqCst);
        if event == TiEvent::ObjectFree {
            self.update_object_free_hook();
        }
        Ok(())
    }

    pub fn is_event_enabled(&self, event: TiEvent) -> bool {
        self.enabled_events[event].load(Ordering::SeqCst)
    }

    // The tag table only sees a hook while the event is enabled.
    fn update_object_free_hook(&self) {
        let hook = if self.is_event_enabled(TiEvent::ObjectFree) {
            self.object_free.read().clone()
        } else {
            None
        };
        self.tag_table.set_object_free_hook(hook);
    }

    pub(crate) fn obsolete_object_created_callback(&self) -> Option<ObsoleteObjectCreatedCallback> {
        if !self.is_event_enabled(TiEvent::ObsoleteObjectCreated) {
            return None;
        }
        self.obsolete_object_created.read().clone()
    }
}

impl std::fmt::Debug for TiEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiEnv")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .field("tags", &self.tag_table.len())
            .finish()
    }
}
