//! # Header Field Macros
//!
//! The window header (`WindowHeader`) and the transfer record
//! (`WindowParcel`) are laid directly over raw bytes, so their numeric
//! fields are zerocopy little-endian wrappers (`U32`, `U64`) rather than
//! native integers. These macros give such a struct plain native-typed
//! methods so the storage code never touches the wrappers:
//!
//! | Macro                  | Generates                                  |
//! |------------------------|--------------------------------------------|
//! | `zerocopy_accessors!`  | `field() -> T` and `set_field(T)`          |
//! | `zerocopy_getters!`    | `field() -> T` only, for read-only records |
//!
//! ```ignore
//! impl WindowHeader {
//!     zerocopy_accessors! {
//!         num_rows: u32,
//!         free_offset: u32,
//!     }
//! }
//!
//! header.set_num_rows(header.num_rows() + 1);
//! ```
//!
//! `T` must be the native type of the wrapper (`u32` for `U32`, `u64` for
//! `U64`).

macro_rules! zerocopy_accessors {
    ($($field:ident : $native:ty),* $(,)?) => {
        $(
            ::paste::paste! {
                #[inline]
                pub fn $field(&self) -> $native {
                    self.$field.get()
                }

                #[inline]
                pub fn [<set_ $field>](&mut self, value: $native) {
                    self.$field.set(value);
                }
            }
        )*
    };
}

macro_rules! zerocopy_getters {
    ($($field:ident : $native:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $field(&self) -> $native {
                self.$field.get()
            }
        )*
    };
}
