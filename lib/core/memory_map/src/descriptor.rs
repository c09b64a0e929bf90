//! Descriptions of how a range of logical addresses maps onto a backing buffer.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// A declaration that a range of logical addresses maps onto a particular backing buffer.
///
/// Any of [`MemoryDescriptor::select`], [`MemoryDescriptor::disconnect`], and
/// [`MemoryDescriptor::len`] may be left as `0` and resolved by
/// [`MemoryMap::normalize()`][n].
///
/// [n]: crate::MemoryMap::normalize
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct MemoryDescriptor {
    /// Attributes of the region. Never consulted during normalization.
    pub flags: DescriptorFlags,
    /// The address at which the region begins in the logical address space.
    pub start: usize,
    /// Address lines that must equal the corresponding lines of `start` for an address to belong
    /// to this region.
    ///
    /// `0` means the mask is derived from `len`.
    pub select: usize,
    /// Address lines that are ignored when computing an offset into the backing buffer.
    pub disconnect: usize,
    /// The size, in bytes, of the backing buffer.
    ///
    /// `0` means the size is derived from the address envelope of the entire map.
    pub len: usize,
    /// The byte offset of the region inside its backing buffer.
    pub offset: usize,
}

impl MemoryDescriptor {
    /// Constructs a [`MemoryDescriptor`] for the `len` bytes located at `start`, leaving every
    /// other field to be resolved.
    pub const fn new(start: usize, len: usize) -> Self {
        Self {
            flags: DescriptorFlags::NONE,
            start,
            select: 0,
            disconnect: 0,
            len,
            offset: 0,
        }
    }

    /// Returns `self` with its [`MemoryDescriptor::flags`] replaced by `flags`.
    pub const fn with_flags(self, flags: DescriptorFlags) -> Self {
        Self { flags, ..self }
    }

    /// Returns `self` with its [`MemoryDescriptor::select`] replaced by `select`.
    pub const fn with_select(self, select: usize) -> Self {
        Self { select, ..self }
    }

    /// Returns `self` with its [`MemoryDescriptor::disconnect`] replaced by `disconnect`.
    pub const fn with_disconnect(self, disconnect: usize) -> Self {
        Self { disconnect, ..self }
    }

    /// Returns `self` with its [`MemoryDescriptor::offset`] replaced by `offset`.
    pub const fn with_offset(self, offset: usize) -> Self {
        Self { offset, ..self }
    }
}

/// A [`MemoryDescriptor`] together with the buffer offset mask derived for it.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct NormalizedDescriptor {
    /// The wrapped descriptor. Fully resolved once normalization succeeds.
    pub(crate) descriptor: MemoryDescriptor,
    /// Address lines, within the region, that index into the backing buffer once the
    /// disconnected lines are stripped.
    pub(crate) disconnect_mask: usize,
}

impl NormalizedDescriptor {
    /// Wraps `descriptor` with an empty disconnect mask.
    pub(crate) const fn new(descriptor: MemoryDescriptor) -> Self {
        Self {
            descriptor,
            disconnect_mask: 0,
        }
    }

    /// Returns the wrapped [`MemoryDescriptor`].
    pub const fn descriptor(&self) -> &MemoryDescriptor {
        &self.descriptor
    }

    /// Returns the mask of address lines that select distinct bytes of the backing buffer.
    ///
    /// This is `0` until the owning [`MemoryMap`][mm] has been normalized.
    ///
    /// [mm]: crate::MemoryMap
    pub const fn disconnect_mask(&self) -> usize {
        self.disconnect_mask
    }
}

/// Attributes of a [`MemoryDescriptor`].
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct DescriptorFlags(pub u64);

impl DescriptorFlags {
    /// No attributes.
    pub const NONE: Self = Self(0);

    /// The region is read-only.
    pub const CONST: Self = Self(1 << 0);
    /// The region is stored big-endian.
    pub const BIGENDIAN: Self = Self(1 << 1);
    /// The region is the main system RAM.
    pub const SYSTEM_RAM: Self = Self(1 << 2);
    /// The region is battery backed save RAM.
    pub const SAVE_RAM: Self = Self(1 << 3);
    /// The region is video RAM.
    pub const VIDEO_RAM: Self = Self(1 << 4);

    /// Accesses to the region are aligned to 2 bytes.
    pub const ALIGN_2: Self = Self(1 << Self::ALIGN_SHIFT);
    /// Accesses to the region are aligned to 4 bytes.
    pub const ALIGN_4: Self = Self(2 << Self::ALIGN_SHIFT);
    /// Accesses to the region are aligned to 8 bytes.
    pub const ALIGN_8: Self = Self(3 << Self::ALIGN_SHIFT);

    /// Accesses to the region are at least 2 bytes wide.
    pub const MINSIZE_2: Self = Self(1 << Self::MINSIZE_SHIFT);
    /// Accesses to the region are at least 4 bytes wide.
    pub const MINSIZE_4: Self = Self(2 << Self::MINSIZE_SHIFT);
    /// Accesses to the region are at least 8 bytes wide.
    pub const MINSIZE_8: Self = Self(3 << Self::MINSIZE_SHIFT);

    /// Position of the alignment field.
    const ALIGN_SHIFT: u32 = 16;
    /// Position of the minimum access size field.
    const MINSIZE_SHIFT: u32 = 24;
    /// Width mask of the alignment and minimum access size fields.
    const FIELD_MASK: u64 = 0b11;

    /// Returns `true` if the flags in `other` are set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the access alignment of the region, in bytes.
    pub const fn alignment(&self) -> u64 {
        1 << ((self.0 >> Self::ALIGN_SHIFT) & Self::FIELD_MASK)
    }

    /// Returns the minimum access size of the region, in bytes.
    pub const fn min_size(&self) -> u64 {
        1 << ((self.0 >> Self::MINSIZE_SHIFT) & Self::FIELD_MASK)
    }
}

impl BitOr for DescriptorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DescriptorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl BitAnd for DescriptorFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for DescriptorFlags {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

#[cfg(test)]
mod test {
    use super::{DescriptorFlags, MemoryDescriptor};

    #[test]
    fn flag_fields_decode_to_bytes() {
        assert_eq!(DescriptorFlags::NONE.alignment(), 1);
        assert_eq!(DescriptorFlags::NONE.min_size(), 1);

        let flags =
            DescriptorFlags::SYSTEM_RAM | DescriptorFlags::ALIGN_4 | DescriptorFlags::MINSIZE_2;
        assert_eq!(flags.alignment(), 4);
        assert_eq!(flags.min_size(), 2);
        assert!(flags.contains(DescriptorFlags::SYSTEM_RAM));
        assert!(!flags.contains(DescriptorFlags::CONST));

        assert_eq!(DescriptorFlags::ALIGN_8.alignment(), 8);
        assert_eq!(DescriptorFlags::MINSIZE_8.min_size(), 8);
    }

    #[test]
    fn flag_operators() {
        let mut flags = DescriptorFlags::CONST;
        flags |= DescriptorFlags::BIGENDIAN;
        assert_eq!(flags, DescriptorFlags(0b11));

        flags &= DescriptorFlags::BIGENDIAN;
        assert_eq!(flags, DescriptorFlags::BIGENDIAN);
    }

    #[test]
    fn builder_leaves_unset_fields_zero() {
        let descriptor = MemoryDescriptor::new(0x8000, 0x4000)
            .with_disconnect(0x1)
            .with_offset(0x20);

        assert_eq!(descriptor.start, 0x8000);
        assert_eq!(descriptor.len, 0x4000);
        assert_eq!(descriptor.select, 0);
        assert_eq!(descriptor.disconnect, 0x1);
        assert_eq!(descriptor.offset, 0x20);
        assert_eq!(descriptor.flags, DescriptorFlags::NONE);
    }
}
