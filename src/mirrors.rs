use crate::providers::{Mirror, Provider};
use std::collections::HashMap;
use std::sync::Mutex;

/// Orders a provider's mirrors for the next attempt.
///
/// The most-recently-successful mirror comes first (a process-local hint),
/// then the rest in declared priority order. The hint is race-tolerant: a
/// stale entry costs one wasted attempt, never a wrong result, so a plain
/// Mutex without any further coordination is enough. Ordering stays correct
/// with no hint at all.
#[derive(Default)]
pub struct MirrorRegistry {
    last_good: Mutex<HashMap<String, String>>,
}

impl MirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors to try, in order.
    pub fn iterate(&self, provider: &Provider) -> Vec<Mirror> {
        let mut ordered: Vec<Mirror> = provider.mirrors.clone();
        ordered.sort_by_key(|m| m.priority);

        let hint = self
            .last_good
            .lock()
            .ok()
            .and_then(|map| map.get(&provider.id).cloned());
        if let Some(base) = hint {
            if let Some(pos) = ordered.iter().position(|m| m.base == base) {
                let preferred = ordered.remove(pos);
                ordered.insert(0, preferred);
            }
        }
        ordered
    }

    /// Record that a mirror just served a valid response.
    pub fn mark_good(&self, provider_id: &str, base: &str) {
        if let Ok(mut map) = self.last_good.lock() {
            map.insert(provider_id.to_string(), base.to_string());
        }
    }
}
