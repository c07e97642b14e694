//! # Window Budget Implementation
//!
//! Tracks the bytes reserved by every live window sharing a budget and refuses
//! new windows once the hard limit would be exceeded.
//!
//! ## Design Principles
//!
//! 1. **Hard Limits**: A window whose capacity does not fit fails to build
//! 2. **Whole-capacity accounting**: A window reserves its full capacity up
//!    front, not the bytes it has filled, because capacity is fixed
//! 3. **Thread Safety**: Counters are atomics updated with CAS loops, so windows
//!    may be created and released from any thread
//!
//! Release happens exactly once per window, on the final reference release.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use eyre::{bail, Result};
use sysinfo::System;

pub use crate::config::{DEFAULT_BUDGET_PERCENT, MIN_BUDGET_FLOOR};

static SYSTEM_TOTAL_MEMORY: OnceLock<usize> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct BudgetStats {
    pub total_limit: usize,
    pub total_used: usize,
    pub live_windows: usize,
    pub peak_used: usize,
}

impl BudgetStats {
    pub fn available(&self) -> usize {
        self.total_limit.saturating_sub(self.total_used)
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.total_limit == 0 {
            return 0.0;
        }
        (self.total_used as f64 / self.total_limit as f64) * 100.0
    }
}

impl std::fmt::Display for BudgetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "windows:{},used:{}/{},peak:{}",
            self.live_windows, self.total_used, self.total_limit, self.peak_used
        )
    }
}

/// Raised when a window cannot reserve its capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAllocationError {
    pub name: String,
    pub requested: usize,
    pub available: usize,
    pub live_windows: usize,
}

impl std::fmt::Display for WindowAllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot allocate window '{}': requested {} bytes but only {} available ({} windows open)",
            self.name, self.requested, self.available, self.live_windows
        )
    }
}

impl std::error::Error for WindowAllocationError {}

#[derive(Debug)]
pub struct WindowBudget {
    total_limit: AtomicUsize,
    used: AtomicUsize,
    live_windows: AtomicUsize,
    peak_used: AtomicUsize,
}

impl WindowBudget {
    pub fn auto_detect() -> Self {
        let total_memory = *SYSTEM_TOTAL_MEMORY.get_or_init(|| {
            let mut sys = System::new();
            sys.refresh_memory();
            sys.total_memory() as usize
        });

        let budget = (total_memory * DEFAULT_BUDGET_PERCENT) / 100;
        let budget = budget.max(MIN_BUDGET_FLOOR);

        Self::with_limit(budget)
    }

    pub fn with_limit(bytes: usize) -> Self {
        Self {
            total_limit: AtomicUsize::new(bytes.max(MIN_BUDGET_FLOOR)),
            used: AtomicUsize::new(0),
            live_windows: AtomicUsize::new(0),
            peak_used: AtomicUsize::new(0),
        }
    }

    /// A budget with no effective limit. Windows built without an explicit
    /// budget share one of these.
    pub fn unlimited() -> Self {
        Self {
            total_limit: AtomicUsize::new(usize::MAX),
            used: AtomicUsize::new(0),
            live_windows: AtomicUsize::new(0),
            peak_used: AtomicUsize::new(0),
        }
    }

    pub fn total_limit(&self) -> usize {
        self.total_limit.load(Ordering::Acquire)
    }

    pub fn set_limit(&self, bytes: usize) {
        self.total_limit
            .store(bytes.max(MIN_BUDGET_FLOOR), Ordering::Release);
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn live_windows(&self) -> usize {
        self.live_windows.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.total_limit().saturating_sub(self.used())
    }

    pub fn can_allocate(&self, bytes: usize) -> bool {
        self.available() >= bytes
    }

    /// Reserves `bytes` for a window named `name`.
    pub fn allocate(&self, name: &str, bytes: usize) -> Result<()> {
        loop {
            let current = self.used.load(Ordering::Acquire);
            let limit = self.total_limit();
            let new_used = current.saturating_add(bytes);

            if new_used > limit {
                bail!(WindowAllocationError {
                    name: name.to_string(),
                    requested: bytes,
                    available: limit.saturating_sub(current),
                    live_windows: self.live_windows(),
                });
            }

            match self.used.compare_exchange_weak(
                current,
                new_used,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.live_windows.fetch_add(1, Ordering::AcqRel);
                    self.peak_used.fetch_max(new_used, Ordering::AcqRel);
                    return Ok(());
                }
                Err(_) => continue,
            }
        }
    }

    /// Returns a window's reservation. Called once, on final release.
    pub fn release(&self, bytes: usize) {
        loop {
            let current = self.used.load(Ordering::Acquire);
            let new_value = current.saturating_sub(bytes);

            match self.used.compare_exchange_weak(
                current,
                new_value,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(_) => continue,
            }
        }

        let _ = self
            .live_windows
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn stats(&self) -> BudgetStats {
        BudgetStats {
            total_limit: self.total_limit(),
            total_used: self.used(),
            live_windows: self.live_windows(),
            peak_used: self.peak_used.load(Ordering::Acquire),
        }
    }
}

impl Default for WindowBudget {
    fn default() -> Self {
        Self::auto_detect()
    }
}
