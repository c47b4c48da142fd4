//! Containers for the low 16 bits of one key partition
//!
//! Each container represents a set over 0..=65535 in one of two physical
//! forms:
//! - `ArrayContainer`: sorted u16 array, used at cardinality <= 4096
//! - `BitmapContainer`: 1024-word bitmap, used above that
//!
//! Every binary operation dispatches on both operand variants, and every
//! operation that can cross the 4096 boundary hands back the right
//! representation: array results that overflow promote to bitmaps, bitmap
//! results that underflow collapse to arrays.

mod array;
mod bitmap;

pub use array::ArrayContainer;
pub use bitmap::{BitmapContainer, BitmapContainerIter};

use std::io::{self, Read, Write};

/// Cardinality threshold between the sparse and dense representations
pub const ARRAY_TO_BITMAP_THRESHOLD: usize = 4096;

/// Size of each container's key space (2^16 values)
pub const CONTAINER_CAPACITY: usize = 65536;

/// Words in a dense container's bitmap
pub const WORDS_PER_CONTAINER: usize = 1024;

/// One container: the set of low 16-bit values stored under a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Array(ArrayContainer),
    Bitmap(BitmapContainer),
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Container::Array(ArrayContainer::new())
    }

    /// Container holding exactly the closed range `[first, last]`, in the
    /// representation that fits
    pub fn range_of_ones(first: u32, last: u32) -> Self {
        if (last - first) as usize + 1 > ARRAY_TO_BITMAP_THRESHOLD {
            Container::Bitmap(BitmapContainer::from_range(first, last))
        } else {
            Container::Array(ArrayContainer::from_range(first as u16, last as u16))
        }
    }

    /// Promote an array result that may have outgrown the threshold
    fn from_array_result(array: ArrayContainer) -> Self {
        if array.cardinality() > ARRAY_TO_BITMAP_THRESHOLD {
            Container::Bitmap(BitmapContainer::from_sorted_slice(array.as_slice()))
        } else {
            Container::Array(array)
        }
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        match self {
            Container::Array(a) => a.cardinality(),
            Container::Bitmap(b) => b.cardinality(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        match self {
            Container::Array(a) => a.contains(value),
            Container::Bitmap(b) => b.contains(value),
        }
    }

    /// Insert a value, promoting to a bitmap past the threshold
    pub fn insert(&mut self, value: u16) -> bool {
        match self {
            Container::Array(a) => {
                if !a.insert(value) {
                    return false;
                }
                if a.cardinality() > ARRAY_TO_BITMAP_THRESHOLD {
                    *self = Container::Bitmap(BitmapContainer::from_sorted_slice(a.as_slice()));
                }
                true
            }
            Container::Bitmap(b) => b.insert(value),
        }
    }

    /// Remove a value, collapsing to an array at the threshold
    pub fn remove(&mut self, value: u16) -> bool {
        match self {
            Container::Array(a) => a.remove(value),
            Container::Bitmap(b) => {
                let removed = b.remove(value);
                if removed && b.cardinality() <= ARRAY_TO_BITMAP_THRESHOLD {
                    *self = Container::Array(b.to_array());
                }
                removed
            }
        }
    }

    pub fn and(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => Container::Array(a.and(b)),
            (Container::Array(a), Container::Bitmap(b)) => Container::Array(b.and_array(a)),
            (Container::Bitmap(a), Container::Array(b)) => Container::Array(a.and_array(b)),
            (Container::Bitmap(a), Container::Bitmap(b)) => a.and_bitmap(b),
        }
    }

    pub fn and_inplace(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => {
                a.and_inplace(b);
                None
            }
            (Container::Array(a), Container::Bitmap(b)) => Some(Container::Array(b.and_array(a))),
            (Container::Bitmap(a), Container::Array(b)) => Some(Container::Array(a.and_array(b))),
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.and_bitmap_inplace(b).map(Container::Array)
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    pub fn or(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => Self::from_array_result(a.or(b)),
            (Container::Array(a), Container::Bitmap(b)) => Container::Bitmap(b.or_array(a)),
            (Container::Bitmap(a), Container::Array(b)) => Container::Bitmap(a.or_array(b)),
            (Container::Bitmap(a), Container::Bitmap(b)) => Container::Bitmap(a.or_bitmap(b)),
        }
    }

    pub fn or_inplace(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => Some(Self::from_array_result(a.or(b))),
            (Container::Array(a), Container::Bitmap(b)) => Some(Container::Bitmap(b.or_array(a))),
            (Container::Bitmap(a), Container::Array(b)) => {
                a.or_array_inplace(b);
                None
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.or_bitmap_inplace(b);
                None
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    /// OR without maintaining a dense result's cardinality counter.
    ///
    /// Internal optimization contract: the caller must `repair_cardinality`
    /// before the count is observed again.
    pub fn lazy_or_inplace(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => Some(Self::from_array_result(a.or(b))),
            (Container::Array(a), Container::Bitmap(b)) => {
                let mut answer = b.clone();
                answer.lazy_or_array_inplace(a);
                Some(Container::Bitmap(answer))
            }
            (Container::Bitmap(a), Container::Array(b)) => {
                a.lazy_or_array_inplace(b);
                None
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.lazy_or_bitmap_inplace(b);
                None
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    /// Recompute a dense container's counter after lazy operations, and
    /// collapse it if it ended up under the threshold
    pub fn repair_cardinality(&mut self) {
        let replacement = match &mut *self {
            Container::Array(_) => None,
            Container::Bitmap(b) => {
                b.compute_cardinality();
                if b.cardinality() <= ARRAY_TO_BITMAP_THRESHOLD {
                    Some(Container::Array(b.to_array()))
                } else {
                    None
                }
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    pub fn xor(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => Self::from_array_result(a.xor(b)),
            (Container::Array(a), Container::Bitmap(b)) => b.xor_array(a),
            (Container::Bitmap(a), Container::Array(b)) => a.xor_array(b),
            (Container::Bitmap(a), Container::Bitmap(b)) => a.xor_bitmap(b),
        }
    }

    pub fn xor_inplace(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => Some(Self::from_array_result(a.xor(b))),
            (Container::Array(a), Container::Bitmap(b)) => Some(b.xor_array(a)),
            (Container::Bitmap(a), Container::Array(b)) => {
                a.xor_array_inplace(b).map(Container::Array)
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.xor_bitmap_inplace(b).map(Container::Array)
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    pub fn and_not(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => Container::Array(a.and_not(b)),
            (Container::Array(a), Container::Bitmap(b)) => {
                let content: Vec<u16> = a.iter().filter(|&v| !b.contains(v)).collect();
                Container::Array(ArrayContainer::from_vec(content))
            }
            (Container::Bitmap(a), Container::Array(b)) => a.and_not_array(b),
            (Container::Bitmap(a), Container::Bitmap(b)) => a.and_not_bitmap(b),
        }
    }

    pub fn and_not_inplace(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => {
                let difference = a.and_not(b);
                *a = difference;
                None
            }
            (Container::Array(a), Container::Bitmap(b)) => {
                let content: Vec<u16> = a.iter().filter(|&v| !b.contains(v)).collect();
                *a = ArrayContainer::from_vec(content);
                None
            }
            (Container::Bitmap(a), Container::Array(b)) => {
                a.and_not_array_inplace(b).map(Container::Array)
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.and_not_bitmap_inplace(b).map(Container::Array)
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    pub fn intersects(&self, other: &Container) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a.intersects(b),
            (Container::Array(a), Container::Bitmap(b)) => b.intersects_array(a),
            (Container::Bitmap(a), Container::Array(b)) => a.intersects_array(b),
            (Container::Bitmap(a), Container::Bitmap(b)) => a.intersects_bitmap(b),
        }
    }

    /// Complement restricted to the closed range `[first, last]`
    pub fn not(&self, first: u32, last: u32) -> Container {
        match self {
            Container::Array(a) => {
                let span = (last - first) as usize + 1;
                let inside = a.count_in_closed_range(first, last);
                let new_cardinality = a.cardinality() - inside + (span - inside);
                if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
                    let mut answer = BitmapContainer::from_sorted_slice(a.as_slice());
                    answer.flip_range(first, last);
                    Container::Bitmap(answer)
                } else {
                    Container::Array(a.not_range(first as u16, last as u16))
                }
            }
            Container::Bitmap(b) => {
                let mut answer = b.clone();
                answer.flip_range(first, last);
                if answer.cardinality() <= ARRAY_TO_BITMAP_THRESHOLD {
                    Container::Array(answer.to_array())
                } else {
                    Container::Bitmap(answer)
                }
            }
        }
    }

    /// In-place complement of the closed range `[first, last]`
    pub fn not_inplace(&mut self, first: u32, last: u32) {
        let replacement = match &mut *self {
            Container::Array(a) => {
                let span = (last - first) as usize + 1;
                let inside = a.count_in_closed_range(first, last);
                let new_cardinality = a.cardinality() - inside + (span - inside);
                if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
                    let mut answer = BitmapContainer::from_sorted_slice(a.as_slice());
                    answer.flip_range(first, last);
                    Some(Container::Bitmap(answer))
                } else {
                    *a = a.not_range(first as u16, last as u16);
                    None
                }
            }
            Container::Bitmap(b) => {
                b.flip_range(first, last);
                if b.cardinality() <= ARRAY_TO_BITMAP_THRESHOLD {
                    Some(Container::Array(b.to_array()))
                } else {
                    None
                }
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    /// Union with the half-open range `[first, last)`
    pub fn add_range(&self, first: u32, last: u32) -> Container {
        let mut answer = self.clone();
        answer.add_range_inplace(first, last);
        answer
    }

    pub fn add_range_inplace(&mut self, first: u32, last: u32) {
        if first >= last {
            return;
        }
        let replacement = match &mut *self {
            Container::Array(a) => {
                let present = a.count_in_closed_range(first, last - 1);
                let new_cardinality = a.cardinality() - present + (last - first) as usize;
                if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
                    let mut answer = BitmapContainer::from_sorted_slice(a.as_slice());
                    answer.insert_range(first, last);
                    Some(Container::Bitmap(answer))
                } else {
                    a.insert_range(first, last);
                    None
                }
            }
            Container::Bitmap(b) => {
                b.insert_range(first, last);
                None
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    /// Difference with the half-open range `[first, last)`
    pub fn remove_range(&self, first: u32, last: u32) -> Container {
        let mut answer = self.clone();
        answer.remove_range_inplace(first, last);
        answer
    }

    pub fn remove_range_inplace(&mut self, first: u32, last: u32) {
        if first >= last {
            return;
        }
        let replacement = match &mut *self {
            Container::Array(a) => {
                a.remove_range(first, last);
                None
            }
            Container::Bitmap(b) => {
                b.remove_range(first, last);
                if b.cardinality() <= ARRAY_TO_BITMAP_THRESHOLD {
                    Some(Container::Array(b.to_array()))
                } else {
                    None
                }
            }
        };
        if let Some(c) = replacement {
            *self = c;
        }
    }

    /// Number of elements <= value
    pub fn rank(&self, value: u16) -> usize {
        match self {
            Container::Array(a) => a.rank(value),
            Container::Bitmap(b) => b.rank(value),
        }
    }

    /// k-th smallest element (0-indexed)
    pub fn select(&self, k: usize) -> Option<u16> {
        match self {
            Container::Array(a) => a.select(k),
            Container::Bitmap(b) => b.select(k),
        }
    }

    pub fn iter(&self) -> ContainerIter<'_> {
        match self {
            Container::Array(a) => ContainerIter::Array(a.iter()),
            Container::Bitmap(b) => ContainerIter::Bitmap(b.iter()),
        }
    }

    /// Write each element ORed with `mask` into `out` starting at `at`
    pub fn fill_least_significant_16bits(&self, out: &mut [u32], at: usize, mask: u32) {
        match self {
            Container::Array(a) => a.fill_least_significant_16bits(out, at, mask),
            Container::Bitmap(b) => b.fill_least_significant_16bits(out, at, mask),
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            Container::Array(a) => a.size_in_bytes(),
            Container::Bitmap(b) => b.size_in_bytes(),
        }
    }

    pub fn serialized_size_in_bytes(&self) -> usize {
        match self {
            Container::Array(a) => a.serialized_size_in_bytes(),
            Container::Bitmap(b) => b.serialized_size_in_bytes(),
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        match self {
            Container::Array(a) => a.serialize(writer),
            Container::Bitmap(b) => b.serialize(writer),
        }
    }

    /// Read back a payload; the representation follows from the cardinality
    pub fn deserialize<R: Read>(reader: &mut R, cardinality: usize) -> io::Result<Container> {
        if cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            Ok(Container::Bitmap(BitmapContainer::deserialize(
                reader,
                cardinality,
            )?))
        } else {
            Ok(Container::Array(ArrayContainer::deserialize(
                reader,
                cardinality,
            )?))
        }
    }
}

/// Ascending iterator over either container variant
pub enum ContainerIter<'a> {
    Array(std::iter::Copied<std::slice::Iter<'a, u16>>),
    Bitmap(BitmapContainerIter<'a>),
}

impl Iterator for ContainerIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(it) => it.next(),
            ContainerIter::Bitmap(it) => it.next(),
        }
    }
}
