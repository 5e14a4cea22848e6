use crate::config::LockPolicy;
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tracing::debug;

// Dead per-domain slots are pruned once the map grows past this.
const PRUNE_THRESHOLD: usize = 1024;

/// Serializes upstream WHOIS lookups.
pub enum LookupLock {
    Global(Mutex<()>),
    PerDomain(std::sync::Mutex<HashMap<String, Weak<Mutex<()>>>>),
}

/// Held for the duration of one upstream lookup; released on drop.
pub enum LookupGuard<'a> {
    Global(MutexGuard<'a, ()>),
    PerDomain(OwnedMutexGuard<()>),
}

impl LookupLock {
    pub fn new(policy: LockPolicy) -> Self {
        match policy {
            LockPolicy::Global => LookupLock::Global(Mutex::new(())),
            LockPolicy::PerDomain => LookupLock::PerDomain(std::sync::Mutex::new(HashMap::new())),
        }
    }

    pub async fn acquire(&self, domain: &str) -> LookupGuard<'_> {
        match self {
            LookupLock::Global(mutex) => LookupGuard::Global(mutex.lock().await),
            LookupLock::PerDomain(slots) => {
                let slot = Self::slot_for(slots, domain);
                LookupGuard::PerDomain(slot.lock_owned().await)
            }
        }
    }

    fn slot_for(slots: &std::sync::Mutex<HashMap<String, Weak<Mutex<()>>>>, domain: &str) -> Arc<Mutex<()>> {
        let mut slots = slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = slots.get(domain).and_then(Weak::upgrade) {
            return existing;
        }

        if slots.len() >= PRUNE_THRESHOLD {
            slots.retain(|_, slot| slot.strong_count() > 0);
            debug!("Pruned lookup lock slots, {} remain", slots.len());
        }

        let slot = Arc::new(Mutex::new(()));
        slots.insert(domain.to_string(), Arc::downgrade(&slot));
        slot
    }
}
