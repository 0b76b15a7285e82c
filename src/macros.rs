//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in the
//! freelist's on-page structures.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types (U32, U64).
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::{U32, U64};
//!
//! #[repr(C)]
//! struct FreelistPageHeader {
//!     magic: U32,
//!     id_count: U32,
//!     checksum: U64,
//! }
//!
//! impl FreelistPageHeader {
//!     zerocopy_accessors! {
//!         id_count: u32,
//!         checksum: u64,
//!     }
//! }
//!
//! // Generates:
//! // pub fn id_count(&self) -> u32 { self.id_count.get() }
//! // pub fn set_id_count(&mut self, val: u32) { self.id_count = U32::new(val); }
//! // pub fn checksum(&self) -> u64 { self.checksum.get() }
//! // pub fn set_checksum(&mut self, val: u64) { self.checksum = U64::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
