//! # Window Memory Budget
//!
//! Windows reserve their whole capacity when they are built and return it when
//! their storage is finally released. The budget caps the total across all
//! windows that share it, making a runaway consumer (a cursor leaked in a
//! loop, say) fail fast with a `WindowAllocationError` instead of exhausting
//! the process.
//!
//! ## Configuration
//!
//! ```rust,ignore
//! // Auto-detect (25% of system RAM, 4MB floor)
//! let budget = WindowBudget::auto_detect();
//!
//! // Explicit limit
//! let budget = Arc::new(WindowBudget::with_limit(16 * 1024 * 1024));
//! let window = RowWindow::builder().budget(budget.clone()).build()?;
//! ```

mod budget;

pub use budget::{BudgetStats, WindowAllocationError, WindowBudget};
