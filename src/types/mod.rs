//! # Cell Type System
//!
//! Every cell in a window carries an explicit type tag. This module defines the
//! tag and the two value representations that move data in and out of windows.
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `FieldType` | Per-cell type tag stored in the window (NULL, INTEGER, ...) |
//! | `Value<'a>` | Borrowed value handed out by row producers |
//! | `OwnedValue` | Heap-owned value for in-memory result sets |
//!
//! ## Usage
//!
//! ```ignore
//! use turcursor::types::{FieldType, OwnedValue, Value};
//!
//! let val = Value::Int(42);
//! assert_eq!(val.field_type(), FieldType::Integer);
//! let owned: OwnedValue = (&val).into();
//! ```

mod field_type;
mod owned_value;
mod value;

pub use field_type::FieldType;
pub use owned_value::OwnedValue;
pub use value::Value;
