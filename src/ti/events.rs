use crate::ti::env::TiEnv;
use crate::util::tag_table::Tag;
use std::sync::Arc;

/// The sink of events heapti raises. It knows every live environment.
#[derive(Default)]
pub struct EventHandler {
    envs: spin::RwLock<Vec<Arc<TiEnv>>>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_env(&self, env: Arc<TiEnv>) {
        self.envs.write().push(env);
    }

    pub fn remove_env(&self, env: &TiEnv) {
        self.envs.write().retain(|e| e.id() != env.id());
    }

    /// A snapshot of the live environments, so that callers may run tool code without holding
    /// the registry lock.
    pub fn envs(&self) -> Vec<Arc<TiEnv>> {
        self.envs.read().clone()
    }

    pub fn for_each_env<F: FnMut(&Arc<TiEnv>)>(&self, mut f: F) {
        for env in self.envs().iter() {
            f(env);
        }
    }

    /// Tell an environment that the object tagged `old_tag` was replaced by the object tagged
    /// `new_tag`. If the environment has no enabled callback for it, the tags are swapped, so that
    /// the tag follows the replacement.
    pub fn dispatch_obsolete_object_created(
        &self,
        env: &TiEnv,
        old_tag: &mut Tag,
        new_tag: &mut Tag,
    ) {
        match env.obsolete_object_created_callback() {
            Some(callback) => callback(old_tag, new_tag),
            None => std::mem::swap(old_tag, new_tag),
        }
    }
}
