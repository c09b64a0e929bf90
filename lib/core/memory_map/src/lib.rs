//! Normalization of memory region descriptors into an alias-aware address decoder.
//!
//! A [`MemoryMap`] holds [`MemoryDescriptor`]s describing how a logical address space maps onto
//! backing buffers. Descriptors may be partially specified; [`MemoryMap::normalize()`] derives
//! the missing fields from the rest of the map and computes, for every descriptor, the mask of
//! address lines that index into its buffer.
#![no_std]

extern crate alloc;

pub mod descriptor;
pub mod map;

pub use descriptor::{DescriptorFlags, MemoryDescriptor, NormalizedDescriptor};
pub use map::{MemoryMap, NormalizeError};
