//! # Window Diagnostics Registry
//!
//! Windows report their lifecycle to an injectable [`WindowRegistry`]. The
//! default is [`NoopRegistry`]; [`OwnerTracker`] keeps a live table of windows
//! per owner (the process id unless the builder names another owner) so that a
//! failed allocation can log who is holding the memory.
//!
//! The registry is observability only: nothing in the fill or read paths
//! depends on it.

use std::fmt::Write as _;

use hashbrown::HashMap;
use parking_lot::Mutex;

use super::WindowId;
use crate::config::LEAK_WARNING_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub name: String,
    pub capacity: usize,
    pub owner: String,
}

pub trait WindowRegistry: Send + Sync {
    fn window_opened(&self, info: &WindowInfo);

    fn window_released(&self, id: WindowId);

    /// Human-readable account of live windows, logged on allocation failure.
    fn summary(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistry;

impl WindowRegistry for NoopRegistry {
    fn window_opened(&self, _info: &WindowInfo) {}

    fn window_released(&self, _id: WindowId) {}
}

#[derive(Debug, Default)]
pub struct OwnerTracker {
    windows: Mutex<HashMap<WindowId, WindowInfo>>,
}

impl OwnerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_windows(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn live_windows_for(&self, owner: &str) -> usize {
        self.windows
            .lock()
            .values()
            .filter(|info| info.owner == owner)
            .count()
    }

    pub fn bytes_for(&self, owner: &str) -> usize {
        self.windows
            .lock()
            .values()
            .filter(|info| info.owner == owner)
            .map(|info| info.capacity)
            .sum()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.lock().contains_key(&id)
    }
}

impl WindowRegistry for OwnerTracker {
    fn window_opened(&self, info: &WindowInfo) {
        let owned_by_same = {
            let mut windows = self.windows.lock();
            windows.insert(info.id, info.clone());
            windows.values().filter(|w| w.owner == info.owner).count()
        };

        if owned_by_same > LEAK_WARNING_THRESHOLD {
            log::warn!(
                "owner {} holds {} open windows; cursors are probably not being closed",
                info.owner,
                owned_by_same
            );
        }
    }

    fn window_released(&self, id: WindowId) {
        self.windows.lock().remove(&id);
    }

    fn summary(&self) -> Option<String> {
        let windows = self.windows.lock();
        if windows.is_empty() {
            return None;
        }

        let mut per_owner: HashMap<&str, (usize, usize)> = HashMap::new();
        for info in windows.values() {
            let entry = per_owner.entry(info.owner.as_str()).or_default();
            entry.0 += 1;
            entry.1 += info.capacity;
        }

        let mut owners: Vec<_> = per_owner.into_iter().collect();
        owners.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = String::new();
        for (i, (owner, (count, bytes))) in owners.iter().enumerate() {
            if i > 0 {
                out.push_str("; ");
            }
            let _ = write!(out, "owner {}: {} windows, {} bytes", owner, count, bytes);
        }
        Some(out)
    }
}
