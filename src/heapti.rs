//! The heapti instance: options, environments and the state shared by every heap walk.

use crate::ti::env::{Capabilities, TiEnv};
use crate::ti::events::EventHandler;
use crate::ti::field_visitor::IndexCachingTable;
use crate::util::options::Options;
use crate::vm::{ReferenceGlue, SystemWeakHolder, VMBinding};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Build a heapti instance. Options are read from `HEAPTI_*` environment variables first, and can
/// then be overridden with [`HeapTiBuilder::set_option`].
pub struct HeapTiBuilder {
    pub options: Options,
}

impl Default for HeapTiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapTiBuilder {
    /// Create a builder with options from the environment variables.
    pub fn new() -> Self {
        HeapTiBuilder {
            options: Options::default(),
        }
    }

    /// Create a builder with default options, ignoring the environment variables.
    pub fn new_no_env_vars() -> Self {
        HeapTiBuilder {
            options: Options::without_env_vars(),
        }
    }

    /// Set an option. Returns false if the value is rejected; see [`Options::set_from_str`].
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Build a heapti instance with the current options.
    pub fn build<VM: VMBinding>(&self) -> HeapTi<VM> {
        HeapTi::new(Arc::new(self.options.clone()))
    }
}

/// A heapti instance. A runtime creates one instance, and tools attach to it by creating
/// environments.
pub struct HeapTi<VM: VMBinding> {
    pub(crate) options: Arc<Options>,
    pub(crate) event_handler: Arc<EventHandler>,
    pub(crate) index_cache: Arc<IndexCachingTable>,
    index_cache_holder: Arc<dyn SystemWeakHolder>,
    /// Serializes the operations that stop the world and walk the whole graph.
    exclusive_operation: Mutex<()>,
    next_env_id: AtomicUsize,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> HeapTi<VM> {
    pub fn new(options: Arc<Options>) -> Self {
        let index_cache = Arc::new(IndexCachingTable::new(options.cache_interface_field_counts));
        let index_cache_holder: Arc<dyn SystemWeakHolder> = index_cache.clone();
        VM::VMReferenceGlue::add_system_weak_holder(index_cache_holder.clone());
        HeapTi {
            options,
            event_handler: Arc::new(EventHandler::new()),
            index_cache,
            index_cache_holder,
            exclusive_operation: Mutex::new(()),
            next_env_id: AtomicUsize::new(0),
            phantom: PhantomData,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn event_handler(&self) -> &EventHandler {
        &self.event_handler
    }

    pub fn index_cache(&self) -> &IndexCachingTable {
        &self.index_cache
    }

    /// Attach a tool. Its tag table is registered with the runtime as a system weak holder.
    pub fn create_env(&self, capabilities: Capabilities) -> Arc<TiEnv> {
        let id = self.next_env_id.fetch_add(1, Ordering::SeqCst);
        let env = Arc::new(TiEnv::new(id, capabilities));
        let holder: Arc<dyn SystemWeakHolder> = env.tag_table().clone();
        VM::VMReferenceGlue::add_system_weak_holder(holder);
        self.event_handler.add_env(env.clone());
        debug!("Created env {} with {:?}", id, capabilities);
        env
    }

    /// Detach a tool. Its tags are dropped with the environment.
    pub fn dispose_env(&self, env: &Arc<TiEnv>) {
        self.event_handler.remove_env(env);
        let holder: Arc<dyn SystemWeakHolder> = env.tag_table().clone();
        VM::VMReferenceGlue::remove_system_weak_holder(&holder);
        debug!("Disposed env {}", env.id());
    }

    pub(crate) fn lock_exclusive(&self) -> MutexGuard<'_, ()> {
        self.exclusive_operation
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<VM: VMBinding> Drop for HeapTi<VM> {
    fn drop(&mut self) {
        for env in self.event_handler.envs() {
            self.dispose_env(&env);
        }
        VM::VMReferenceGlue::remove_system_weak_holder(&self.index_cache_holder);
    }
}
