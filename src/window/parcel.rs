//! # Cross-Process Window Transfer
//!
//! A window crosses a process boundary as a 32-byte [`WindowParcel`]: a handle
//! to its storage plus the sender's start position. Row data is never copied.
//! The receiving side resolves the handle in a [`HandleTable`] and attaches a
//! new reference to the same storage, so the storage lives until both sides
//! have released it.
//!
//! ## Parcel Layout (32 bytes)
//!
//! ```text
//! Offset  Size  Field           Description
//! ------  ----  --------------  --------------------------------------
//! 0       8     magic           "TurPcl\0\x01"
//! 8       8     handle          Key into the HandleTable
//! 16      8     start_position  Absolute position of the window's row 0
//! 24      4     capacity        Capacity, checked against the storage
//! 28      4     reserved
//! ```
//!
//! The table holds weak references only: publishing a window does not keep
//! it alive, and a parcel for a window whose last holder is gone fails to
//! attach with `WindowError::Released`.

use std::sync::{Arc, Weak};

use eyre::{bail, Result};
use hashbrown::HashMap;
use parking_lot::Mutex;
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::reference::WindowShared;
use super::{RowWindow, WindowError};
use crate::config::{PARCEL_MAGIC, PARCEL_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct WindowParcel {
    magic: [u8; 8],
    handle: U64,
    start_position: U64,
    capacity: U32,
    reserved: U32,
}

const _: () = assert!(std::mem::size_of::<WindowParcel>() == PARCEL_SIZE);

impl WindowParcel {
    pub fn new(handle: WindowHandle, start_position: usize, capacity: usize) -> Self {
        Self {
            magic: *PARCEL_MAGIC,
            handle: U64::new(handle.0),
            start_position: U64::new(start_position as u64),
            capacity: U32::new(capacity as u32),
            reserved: U32::new(0),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() != PARCEL_SIZE {
            bail!(WindowError::InvalidParcel(format!(
                "expected {} bytes, got {}",
                PARCEL_SIZE,
                bytes.len()
            )));
        }
        let parcel = match Self::ref_from_bytes(bytes) {
            Ok(parcel) => parcel,
            Err(e) => bail!(WindowError::InvalidParcel(format!("{:?}", e))),
        };
        if &parcel.magic != PARCEL_MAGIC {
            bail!(WindowError::InvalidParcel("bad magic".to_string()));
        }
        Ok(parcel)
    }

    pub fn to_bytes(&self) -> [u8; PARCEL_SIZE] {
        let mut out = [0u8; PARCEL_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    pub fn handle(&self) -> WindowHandle {
        WindowHandle(self.handle.get())
    }

    zerocopy_getters! {
        start_position: u64,
        capacity: u32,
    }
}

/// Resolves parcel handles to live window storage.
#[derive(Debug, Default)]
pub struct HandleTable {
    entries: Mutex<HashMap<WindowHandle, Weak<WindowShared>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, shared: &Arc<WindowShared>) -> WindowHandle {
        let handle = WindowHandle(shared.id.0);
        let mut entries = self.entries.lock();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.insert(handle, Arc::downgrade(shared));
        handle
    }

    pub(crate) fn resolve(&self, handle: WindowHandle) -> Option<Arc<WindowShared>> {
        self.entries.lock().get(&handle).and_then(Weak::upgrade)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RowWindow {
    /// Publishes the storage in `table` and serializes a parcel for it.
    pub fn write_to_parcel(&self, table: &HandleTable) -> Result<[u8; PARCEL_SIZE]> {
        let _reference = self.reference();
        let handle = table.publish(&self.shared);
        log::debug!(
            "writing parcel for window '{}' ({}) at start position {}",
            self.shared.name,
            self.shared.id,
            self.start_position()
        );
        Ok(WindowParcel::new(handle, self.start_position(), self.shared.capacity).to_bytes())
    }

    /// Attaches a new holder to the storage named by a parcel.
    pub fn from_parcel(bytes: &[u8], table: &HandleTable) -> Result<RowWindow> {
        let parcel = WindowParcel::from_bytes(bytes)?;
        let handle = parcel.handle();

        let Some(shared) = table.resolve(handle) else {
            bail!(WindowError::Released {
                name: format!("handle {}", handle.0)
            });
        };
        if !shared.try_acquire() {
            bail!(WindowError::Released {
                name: shared.name.clone()
            });
        }
        if parcel.capacity() as usize != shared.capacity {
            let name = shared.name.clone();
            shared.release();
            bail!(WindowError::InvalidParcel(format!(
                "capacity {} does not match window '{}'",
                parcel.capacity(),
                name
            )));
        }

        Ok(RowWindow::attach(shared, parcel.start_position() as usize))
    }
}
