//! An ordered set of [`MemoryDescriptor`]s and the pass that resolves them into a consistent
//! address decoder.

use alloc::vec::Vec;
use core::{error, fmt, slice};

use bitmask::{compress, expand, fill_below_highest_bit, highest_set_bit};
use log::{debug, trace};

use crate::descriptor::{MemoryDescriptor, NormalizedDescriptor};

/// Upper bound on the iterations of each convergence loop in [`MemoryMap::normalize()`].
///
/// Every iteration either folds one more address line into `disconnect` or drops one line from
/// the buffer offset mask, so neither loop can legitimately run longer than the word is wide.
const MAX_ITERATIONS: u32 = usize::BITS;

/// An ordered collection of [`MemoryDescriptor`]s that together describe a logical address space.
///
/// Descriptors are appended with [`MemoryMap::insert()`] and resolved in a single batch by
/// [`MemoryMap::normalize()`]. Insertion order is preserved for iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryMap {
    /// The descriptors, in insertion order.
    descriptors: Vec<NormalizedDescriptor>,
    /// `true` if `descriptors` have been resolved since the last insertion.
    normalized: bool,
}

impl MemoryMap {
    /// Constructs an empty [`MemoryMap`].
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            normalized: false,
        }
    }

    /// Appends a copy of `descriptor` to the [`MemoryMap`].
    ///
    /// No validation happens here; invalid descriptors are reported by
    /// [`MemoryMap::normalize()`].
    pub fn insert(&mut self, descriptor: MemoryDescriptor) {
        self.descriptors.push(NormalizedDescriptor::new(descriptor));
        self.normalized = false;
    }

    /// Returns the number of descriptors in the [`MemoryMap`].
    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the [`MemoryMap`] holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns `true` if the last call to [`MemoryMap::normalize()`] succeeded and no descriptor
    /// has been inserted since.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Returns the descriptor at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&NormalizedDescriptor> {
        self.descriptors.get(index)
    }

    /// Returns an iterator over the descriptors in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, NormalizedDescriptor> {
        self.descriptors.iter()
    }

    /// Removes every descriptor from the [`MemoryMap`].
    pub fn clear(&mut self) {
        self.descriptors.clear();
        self.normalized = false;
    }

    /// Resolves every descriptor in place so that the [`MemoryMap`] forms a consistent address
    /// decoder.
    ///
    /// Missing `select` and `len` fields are derived from the union of the address lines used by
    /// the entire map, `disconnect` is tightened to the lines that actually mirror inside the
    /// backing buffer, and [`NormalizedDescriptor::disconnect_mask()`] is computed.
    ///
    /// Once this succeeds, further calls return `Ok(())` without touching any descriptor until
    /// another descriptor is inserted.
    ///
    /// # Errors
    ///
    /// - [`NormalizeError::InvalidLength`]: Returned if a descriptor without a `select` has a
    ///   `len` that is zero or not a power of two, or if a derived `len` does not fit in a
    ///   [`usize`].
    /// - [`NormalizeError::MisalignedStart`]: Returned if a descriptor's `start` has bits set
    ///   outside its `select`.
    /// - [`NormalizeError::Diverged`]: Returned if a convergence loop exceeds its iteration bound.
    ///
    /// The pass stops at the first failing descriptor. Descriptors before it remain resolved and
    /// the failing descriptor may be partially resolved.
    pub fn normalize(&mut self) -> Result<(), NormalizeError> {
        if self.normalized {
            return Ok(());
        }

        let mut top_addr = 1usize;
        for entry in &self.descriptors {
            let desc = &entry.descriptor;
            top_addr |= if desc.select != 0 {
                desc.select
            } else {
                // Wraps exactly like the address arithmetic of the emulated bus.
                desc.start.wrapping_add(desc.len).wrapping_sub(1)
            };
        }
        let top_addr = fill_below_highest_bit(top_addr);
        debug!(
            "normalizing {} descriptors within envelope {top_addr:#x}",
            self.descriptors.len()
        );

        for (index, entry) in self.descriptors.iter_mut().enumerate() {
            if let Err(error) = normalize_descriptor(entry, top_addr, index) {
                debug!("{error}: {:x?}", entry.descriptor);
                return Err(error);
            }

            trace!(
                "descriptor {index}: start={:#x} select={:#x} disconnect={:#x} len={:#x} \
                 disconnect_mask={:#x}",
                entry.descriptor.start,
                entry.descriptor.select,
                entry.descriptor.disconnect,
                entry.descriptor.len,
                entry.disconnect_mask,
            );
        }

        self.normalized = true;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a MemoryMap {
    type Item = &'a NormalizedDescriptor;
    type IntoIter = slice::Iter<'a, NormalizedDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resolves a single descriptor against the map-wide address envelope `top_addr`.
fn normalize_descriptor(
    entry: &mut NormalizedDescriptor,
    top_addr: usize,
    index: usize,
) -> Result<(), NormalizeError> {
    let desc = &mut entry.descriptor;

    if desc.select == 0 {
        if desc.len == 0 || !desc.len.is_power_of_two() {
            return Err(NormalizeError::InvalidLength {
                index,
                len: desc.len,
            });
        }

        // Claim every line in play that the buffer's own offset lines do not consume.
        desc.select = top_addr & !expand(fill_below_highest_bit(desc.len - 1), desc.disconnect);
    }

    if desc.len == 0 {
        let highest_offset =
            fill_below_highest_bit(compress(top_addr & !desc.select, desc.disconnect));
        desc.len = highest_offset
            .checked_add(1)
            .ok_or(NormalizeError::InvalidLength { index, len: 0 })?;
    }

    if desc.start & !desc.select != 0 {
        return Err(NormalizeError::MisalignedStart {
            index,
            start: desc.start,
            select: desc.select,
        });
    }

    // Fold unselected lines into `disconnect` until the region no longer addresses past its
    // buffer.
    let mut iterations = 0;
    while compress(top_addr & !desc.select, desc.disconnect) >> 1 > desc.len - 1 {
        if iterations == MAX_ITERATIONS {
            return Err(NormalizeError::Diverged { index });
        }

        desc.disconnect |= highest_set_bit(top_addr & !desc.select & !desc.disconnect);
        iterations += 1;
    }

    let mut disconnect_mask = fill_below_highest_bit(desc.len - 1);
    desc.disconnect &= disconnect_mask;

    let mut iterations = 0;
    while (!disconnect_mask >> 1) & desc.disconnect != 0 {
        if iterations == MAX_ITERATIONS {
            return Err(NormalizeError::Diverged { index });
        }

        disconnect_mask >>= 1;
        desc.disconnect &= disconnect_mask;
        iterations += 1;
    }

    entry.disconnect_mask = disconnect_mask;
    Ok(())
}

/// Various errors that can occur while normalizing a [`MemoryMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    /// A descriptor's length is unusable: zero or not a power of two while its `select` must be
    /// derived, or too large to represent once derived.
    InvalidLength {
        /// The index of the offending descriptor.
        index: usize,
        /// The offending length.
        len: usize,
    },
    /// A descriptor's `start` has bits set outside its `select`.
    MisalignedStart {
        /// The index of the offending descriptor.
        index: usize,
        /// The offending start address.
        start: usize,
        /// The select mask, possibly derived, that `start` must fit within.
        select: usize,
    },
    /// A convergence loop ran for more iterations than the word has bits.
    Diverged {
        /// The index of the offending descriptor.
        index: usize,
    },
}

impl NormalizeError {
    /// Returns the index of the descriptor that caused the error.
    pub const fn index(&self) -> usize {
        match *self {
            Self::InvalidLength { index, .. }
            | Self::MisalignedStart { index, .. }
            | Self::Diverged { index } => index,
        }
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { index, len } => {
                write!(f, "descriptor {index} has an invalid length {len:#x}")
            }
            Self::MisalignedStart {
                index,
                start,
                select,
            } => write!(
                f,
                "descriptor {index} starts at {start:#x}, outside of its select mask {select:#x}"
            ),
            Self::Diverged { index } => {
                write!(f, "descriptor {index} did not converge")
            }
        }
    }
}

impl error::Error for NormalizeError {}
