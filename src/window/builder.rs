//! # Window Builder
//!
//! `WindowBuilder` configures and allocates [`RowWindow`]s. A builder is cheap
//! to clone and is reused as the template for every page a windowed cursor
//! allocates.
//!
//! ## Configuration Options
//!
//! | Option        | Default            | Description                               |
//! |---------------|--------------------|-------------------------------------------|
//! | name          | `<unnamed>`        | Label used in logs and diagnostics        |
//! | capacity      | 2 MiB              | Fixed buffer size in bytes                |
//! | shared_memory | false              | Back the buffer with an anonymous mapping |
//! | budget        | process-wide, none | Budget the capacity is reserved from      |
//! | registry      | `NoopRegistry`     | Diagnostics hook for window lifecycle     |
//! | owner         | process id         | Owner label reported to the registry      |
//!
//! ## Usage
//!
//! ```ignore
//! let window = RowWindow::builder()
//!     .name("contacts")
//!     .capacity(64 * 1024)
//!     .build()?;
//! ```

use std::sync::{Arc, OnceLock};

use eyre::Result;

use super::reference::WindowShared;
use super::registry::{NoopRegistry, WindowInfo, WindowRegistry};
use super::storage::WindowStorage;
use super::{RowWindow, WindowId};
use crate::config::DEFAULT_WINDOW_CAPACITY;
use crate::memory::WindowBudget;

static DEFAULT_BUDGET: OnceLock<Arc<WindowBudget>> = OnceLock::new();

fn default_budget() -> Arc<WindowBudget> {
    DEFAULT_BUDGET
        .get_or_init(|| Arc::new(WindowBudget::unlimited()))
        .clone()
}

#[derive(Clone)]
pub struct WindowBuilder {
    name: Option<String>,
    capacity: usize,
    shared_memory: bool,
    budget: Option<Arc<WindowBudget>>,
    registry: Option<Arc<dyn WindowRegistry>>,
    owner: Option<String>,
}

impl std::fmt::Debug for WindowBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowBuilder")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("shared_memory", &self.shared_memory)
            .field("owner", &self.owner)
            .finish()
    }
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            capacity: DEFAULT_WINDOW_CAPACITY,
            shared_memory: false,
            budget: None,
            registry: None,
            owner: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the fixed buffer size in bytes, header included.
    pub fn capacity(mut self, bytes: usize) -> Self {
        self.capacity = bytes;
        self
    }

    /// Backs the buffer with an anonymous shared mapping instead of the heap.
    pub fn shared_memory(mut self, shared: bool) -> Self {
        self.shared_memory = shared;
        self
    }

    pub fn budget(mut self, budget: Arc<WindowBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn WindowRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn configured_capacity(&self) -> usize {
        self.capacity
    }

    /// Allocates the window, reserving its capacity from the budget.
    pub fn build(&self) -> Result<RowWindow> {
        let name = self.name.clone().unwrap_or_else(|| "<unnamed>".to_string());
        let budget = self.budget.clone().unwrap_or_else(default_budget);
        let registry: Arc<dyn WindowRegistry> = self
            .registry
            .clone()
            .unwrap_or_else(|| Arc::new(NoopRegistry));

        if let Err(e) = budget.allocate(&name, self.capacity) {
            match registry.summary() {
                Some(summary) => log::warn!("{}; open windows: {}", e, summary),
                None => log::warn!("{}", e),
            }
            return Err(e);
        }

        let storage = match WindowStorage::new(self.capacity, self.shared_memory) {
            Ok(storage) => storage,
            Err(e) => {
                budget.release(self.capacity);
                return Err(e);
            }
        };

        let id = WindowId::next();
        let owner = self
            .owner
            .clone()
            .unwrap_or_else(|| std::process::id().to_string());
        registry.window_opened(&WindowInfo {
            id,
            name: name.clone(),
            capacity: self.capacity,
            owner,
        });

        log::debug!(
            "opened window '{}' ({}) with {} bytes{}",
            name,
            id,
            self.capacity,
            if self.shared_memory { " of shared memory" } else { "" }
        );

        Ok(RowWindow::attach(
            Arc::new(WindowShared::new(id, name, storage, budget, registry)),
            0,
        ))
    }
}
