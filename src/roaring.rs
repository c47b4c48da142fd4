//! Compressed set of u32 values
//!
//! Each value is split into a high 16-bit key and a low 16-bit remainder;
//! the remainders live in per-key containers that switch between a sorted
//! array and a bitmap at 4096 elements. Set algebra walks the two key
//! sequences and dispatches to the container pair; clones share containers
//! copy-on-write.

use std::io::{Read, Write};

use crate::container::{
    ARRAY_TO_BITMAP_THRESHOLD, ArrayContainer, BitmapContainer, Container, ContainerIter,
};
use crate::error::Result;
use crate::roaring_array::RoaringArray;

/// Compressed bitmap over the u32 space
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoaringBitmap {
    containers: RoaringArray,
}

#[inline]
fn highbits(value: u32) -> u16 {
    (value >> 16) as u16
}

#[inline]
fn lowbits(value: u32) -> u16 {
    value as u16
}

impl RoaringBitmap {
    /// Create an empty bitmap
    pub fn new() -> Self {
        Self {
            containers: RoaringArray::new(),
        }
    }

    /// Build from an ascending slice; duplicates are allowed and collapse
    pub fn from_sorted_slice(values: &[u32]) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] <= w[1]));
        let mut bitmap = Self::new();
        let mut i = 0;
        while i < values.len() {
            let high = highbits(values[i]);
            let mut lows: Vec<u16> = Vec::new();
            while i < values.len() && highbits(values[i]) == high {
                lows.push(lowbits(values[i]));
                i += 1;
            }
            lows.dedup();
            let container = if lows.len() > ARRAY_TO_BITMAP_THRESHOLD {
                Container::Bitmap(BitmapContainer::from_sorted_slice(&lows))
            } else {
                Container::Array(ArrayContainer::from_vec(lows))
            };
            bitmap.containers.append(high, container);
        }
        bitmap
    }

    /// Insert a value. Returns true if it was new.
    pub fn insert(&mut self, value: u32) -> bool {
        match self.containers.get_index(highbits(value)) {
            Ok(i) => self
                .containers
                .writable_container_at(i)
                .insert(lowbits(value)),
            Err(i) => {
                let mut container = Container::new();
                container.insert(lowbits(value));
                self.containers.insert_at(i, highbits(value), container);
                true
            }
        }
    }

    /// Remove a value. Returns true if it was present.
    pub fn remove(&mut self, value: u32) -> bool {
        match self.containers.get_index(highbits(value)) {
            Ok(i) => {
                let container = self.containers.writable_container_at(i);
                let removed = container.remove(lowbits(value));
                if container.is_empty() {
                    self.containers.remove_at(i);
                }
                removed
            }
            Err(_) => false,
        }
    }

    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        match self.containers.get_container(highbits(value)) {
            Some(container) => container.contains(lowbits(value)),
            None => false,
        }
    }

    /// Number of stored values
    pub fn cardinality(&self) -> u64 {
        (0..self.containers.size())
            .map(|i| self.containers.container_at(i).cardinality() as u64)
            .sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn clear(&mut self) {
        self.containers.clear();
    }

    /// Insert every value in the half-open range `[start, end)`
    pub fn insert_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        let last = end - 1;
        for hb in highbits(start)..=highbits(last) {
            let lo = if hb == highbits(start) {
                lowbits(start) as u32
            } else {
                0
            };
            let hi = if hb == highbits(last) {
                lowbits(last) as u32
            } else {
                0xFFFF
            };
            match self.containers.get_index(hb) {
                Ok(i) => {
                    self.containers
                        .writable_container_at(i)
                        .add_range_inplace(lo, hi + 1);
                }
                Err(i) => {
                    self.containers
                        .insert_at(i, hb, Container::range_of_ones(lo, hi));
                }
            }
        }
    }

    /// Remove every value in the half-open range `[start, end)`
    pub fn remove_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        let last = end - 1;
        let hb_first = highbits(start);
        let hb_last = highbits(last);
        let lo_first = lowbits(start) as u32;
        let hi_last = lowbits(last) as u32;

        if hb_first == hb_last {
            if let Ok(i) = self.containers.get_index(hb_first) {
                if lo_first == 0 && hi_last == 0xFFFF {
                    self.containers.remove_at(i);
                } else {
                    let container = self.containers.writable_container_at(i);
                    container.remove_range_inplace(lo_first, hi_last + 1);
                    if container.is_empty() {
                        self.containers.remove_at(i);
                    }
                }
            }
            return;
        }

        let mut i = match self.containers.get_index(hb_first) {
            Ok(i) | Err(i) => i,
        };
        // first chunk, when the range enters it mid-way
        if i < self.containers.size() && self.containers.key_at(i) == hb_first && lo_first != 0 {
            let container = self.containers.writable_container_at(i);
            container.remove_range_inplace(lo_first, 0x10000);
            if container.is_empty() {
                self.containers.remove_at(i);
            } else {
                i += 1;
            }
        }
        // fully covered chunks in the middle go out in one splice
        let begin = i;
        while i < self.containers.size() && self.containers.key_at(i) < hb_last {
            i += 1;
        }
        self.containers.remove_index_range(begin, i);
        // last chunk
        if let Ok(j) = self.containers.get_index(hb_last) {
            if hi_last == 0xFFFF {
                self.containers.remove_at(j);
            } else {
                let container = self.containers.writable_container_at(j);
                container.remove_range_inplace(0, hi_last + 1);
                if container.is_empty() {
                    self.containers.remove_at(j);
                }
            }
        }
    }

    /// Complement the closed range `[first, last]` in place
    pub fn flip_inplace(&mut self, first: u32, last: u32) {
        if first > last {
            return;
        }
        for hb in highbits(first)..=highbits(last) {
            let lo = if hb == highbits(first) {
                lowbits(first) as u32
            } else {
                0
            };
            let hi = if hb == highbits(last) {
                lowbits(last) as u32
            } else {
                0xFFFF
            };
            match self.containers.get_index(hb) {
                Ok(i) => {
                    let container = self.containers.writable_container_at(i);
                    container.not_inplace(lo, hi);
                    if container.is_empty() {
                        self.containers.remove_at(i);
                    }
                }
                Err(i) => {
                    self.containers
                        .insert_at(i, hb, Container::range_of_ones(lo, hi));
                }
            }
        }
    }

    /// Complement of the closed range `[first, last]`
    pub fn flip(&self, first: u32, last: u32) -> RoaringBitmap {
        if first > last {
            return self.clone();
        }
        let hb_first = highbits(first);
        let hb_last = highbits(last);
        let mut answer = RoaringArray::new();
        answer.append_copies_until(&self.containers, hb_first);
        for hb in hb_first..=hb_last {
            let lo = if hb == hb_first {
                lowbits(first) as u32
            } else {
                0
            };
            let hi = if hb == hb_last {
                lowbits(last) as u32
            } else {
                0xFFFF
            };
            match self.containers.get_index(hb) {
                Ok(i) => {
                    let c = self.containers.container_at(i).not(lo, hi);
                    if !c.is_empty() {
                        answer.append(hb, c);
                    }
                }
                Err(_) => answer.append(hb, Container::range_of_ones(lo, hi)),
            }
        }
        answer.append_copies_after(&self.containers, hb_last);
        RoaringBitmap { containers: answer }
    }

    /// Intersection
    pub fn and(&self, other: &RoaringBitmap) -> RoaringBitmap {
        let mut answer = RoaringArray::new();
        let (mut pos1, mut pos2) = (0, 0);
        let (len1, len2) = (self.containers.size(), other.containers.size());
        while pos1 < len1 && pos2 < len2 {
            let s1 = self.containers.key_at(pos1);
            let s2 = other.containers.key_at(pos2);
            match s1.cmp(&s2) {
                std::cmp::Ordering::Equal => {
                    let c = self
                        .containers
                        .container_at(pos1)
                        .and(other.containers.container_at(pos2));
                    if !c.is_empty() {
                        answer.append(s1, c);
                    }
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => {
                    pos1 = self.containers.advance_until(s2, pos1);
                }
                std::cmp::Ordering::Greater => {
                    pos2 = other.containers.advance_until(s1, pos2);
                }
            }
        }
        RoaringBitmap { containers: answer }
    }

    pub fn and_inplace(&mut self, other: &RoaringBitmap) {
        let mut pos1 = 0;
        while pos1 < self.containers.size() {
            let s1 = self.containers.key_at(pos1);
            match other.containers.get_index(s1) {
                Ok(pos2) => {
                    let c2 = other.containers.container_at(pos2);
                    let container = self.containers.writable_container_at(pos1);
                    container.and_inplace(c2);
                    if container.is_empty() {
                        self.containers.remove_at(pos1);
                    } else {
                        pos1 += 1;
                    }
                }
                Err(_) => self.containers.remove_at(pos1),
            }
        }
    }

    /// Union
    pub fn or(&self, other: &RoaringBitmap) -> RoaringBitmap {
        let mut answer = RoaringArray::new();
        let (mut pos1, mut pos2) = (0, 0);
        let (len1, len2) = (self.containers.size(), other.containers.size());
        while pos1 < len1 && pos2 < len2 {
            let s1 = self.containers.key_at(pos1);
            let s2 = other.containers.key_at(pos2);
            match s1.cmp(&s2) {
                std::cmp::Ordering::Equal => {
                    answer.append(
                        s1,
                        self.containers
                            .container_at(pos1)
                            .or(other.containers.container_at(pos2)),
                    );
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => {
                    answer.append_copy(&self.containers, pos1);
                    pos1 += 1;
                }
                std::cmp::Ordering::Greater => {
                    answer.append_copy(&other.containers, pos2);
                    pos2 += 1;
                }
            }
        }
        answer.append_copy_many(&self.containers, pos1, len1);
        answer.append_copy_many(&other.containers, pos2, len2);
        RoaringBitmap { containers: answer }
    }

    pub fn or_inplace(&mut self, other: &RoaringBitmap) {
        for pos2 in 0..other.containers.size() {
            let key = other.containers.key_at(pos2);
            let c2 = other.containers.container_at(pos2);
            match self.containers.get_index(key) {
                Ok(i) => self.containers.writable_container_at(i).or_inplace(c2),
                Err(i) => self.containers.insert_at(i, key, Container::clone(c2)),
            }
        }
    }

    /// Symmetric difference
    pub fn xor(&self, other: &RoaringBitmap) -> RoaringBitmap {
        let mut answer = RoaringArray::new();
        let (mut pos1, mut pos2) = (0, 0);
        let (len1, len2) = (self.containers.size(), other.containers.size());
        while pos1 < len1 && pos2 < len2 {
            let s1 = self.containers.key_at(pos1);
            let s2 = other.containers.key_at(pos2);
            match s1.cmp(&s2) {
                std::cmp::Ordering::Equal => {
                    let c = self
                        .containers
                        .container_at(pos1)
                        .xor(other.containers.container_at(pos2));
                    if !c.is_empty() {
                        answer.append(s1, c);
                    }
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => {
                    answer.append_copy(&self.containers, pos1);
                    pos1 += 1;
                }
                std::cmp::Ordering::Greater => {
                    answer.append_copy(&other.containers, pos2);
                    pos2 += 1;
                }
            }
        }
        answer.append_copy_many(&self.containers, pos1, len1);
        answer.append_copy_many(&other.containers, pos2, len2);
        RoaringBitmap { containers: answer }
    }

    pub fn xor_inplace(&mut self, other: &RoaringBitmap) {
        for pos2 in 0..other.containers.size() {
            let key = other.containers.key_at(pos2);
            let c2 = other.containers.container_at(pos2);
            match self.containers.get_index(key) {
                Ok(i) => {
                    let container = self.containers.writable_container_at(i);
                    container.xor_inplace(c2);
                    if container.is_empty() {
                        self.containers.remove_at(i);
                    }
                }
                Err(i) => self.containers.insert_at(i, key, Container::clone(c2)),
            }
        }
    }

    /// Difference `self \ other`
    pub fn and_not(&self, other: &RoaringBitmap) -> RoaringBitmap {
        let mut answer = RoaringArray::new();
        let (mut pos1, mut pos2) = (0, 0);
        let (len1, len2) = (self.containers.size(), other.containers.size());
        while pos1 < len1 && pos2 < len2 {
            let s1 = self.containers.key_at(pos1);
            let s2 = other.containers.key_at(pos2);
            match s1.cmp(&s2) {
                std::cmp::Ordering::Equal => {
                    let c = self
                        .containers
                        .container_at(pos1)
                        .and_not(other.containers.container_at(pos2));
                    if !c.is_empty() {
                        answer.append(s1, c);
                    }
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => {
                    answer.append_copy(&self.containers, pos1);
                    pos1 += 1;
                }
                std::cmp::Ordering::Greater => {
                    pos2 = other.containers.advance_until(s1, pos2);
                }
            }
        }
        answer.append_copy_many(&self.containers, pos1, len1);
        RoaringBitmap { containers: answer }
    }

    pub fn and_not_inplace(&mut self, other: &RoaringBitmap) {
        let mut pos1 = 0;
        while pos1 < self.containers.size() {
            let s1 = self.containers.key_at(pos1);
            if let Ok(pos2) = other.containers.get_index(s1) {
                let c2 = other.containers.container_at(pos2);
                let container = self.containers.writable_container_at(pos1);
                container.and_not_inplace(c2);
                if container.is_empty() {
                    self.containers.remove_at(pos1);
                    continue;
                }
            }
            pos1 += 1;
        }
    }

    /// Whether the two sets share at least one value
    pub fn intersects(&self, other: &RoaringBitmap) -> bool {
        let (mut pos1, mut pos2) = (0, 0);
        let (len1, len2) = (self.containers.size(), other.containers.size());
        while pos1 < len1 && pos2 < len2 {
            let s1 = self.containers.key_at(pos1);
            let s2 = other.containers.key_at(pos2);
            match s1.cmp(&s2) {
                std::cmp::Ordering::Equal => {
                    if self
                        .containers
                        .container_at(pos1)
                        .intersects(other.containers.container_at(pos2))
                    {
                        return true;
                    }
                    pos1 += 1;
                    pos2 += 1;
                }
                std::cmp::Ordering::Less => {
                    pos1 = self.containers.advance_until(s2, pos1);
                }
                std::cmp::Ordering::Greater => {
                    pos2 = other.containers.advance_until(s1, pos2);
                }
            }
        }
        false
    }

    /// Union of many bitmaps; cardinality bookkeeping is deferred until one
    /// repair pass at the end
    pub fn union_many(bitmaps: &[&RoaringBitmap]) -> RoaringBitmap {
        let mut answer = RoaringBitmap::new();
        for bitmap in bitmaps {
            answer.lazy_or_inplace(bitmap);
        }
        answer.repair_after_lazy();
        answer
    }

    fn lazy_or_inplace(&mut self, other: &RoaringBitmap) {
        for pos2 in 0..other.containers.size() {
            let key = other.containers.key_at(pos2);
            let c2 = other.containers.container_at(pos2);
            match self.containers.get_index(key) {
                Ok(i) => self
                    .containers
                    .writable_container_at(i)
                    .lazy_or_inplace(c2),
                Err(i) => self.containers.insert_at(i, key, Container::clone(c2)),
            }
        }
    }

    fn repair_after_lazy(&mut self) {
        for i in 0..self.containers.size() {
            self.containers.writable_container_at(i).repair_cardinality();
        }
    }

    /// Number of stored values <= value
    pub fn rank(&self, value: u32) -> u64 {
        let hb = highbits(value);
        let mut r = 0u64;
        for i in 0..self.containers.size() {
            let key = self.containers.key_at(i);
            if key > hb {
                break;
            }
            if key < hb {
                r += self.containers.container_at(i).cardinality() as u64;
            } else {
                r += self.containers.container_at(i).rank(lowbits(value)) as u64;
            }
        }
        r
    }

    /// k-th smallest stored value (0-indexed)
    pub fn select(&self, k: u64) -> Option<u32> {
        let mut remaining = k;
        for i in 0..self.containers.size() {
            let container = self.containers.container_at(i);
            let cardinality = container.cardinality() as u64;
            if remaining < cardinality {
                let low = container.select(remaining as usize)?;
                return Some(((self.containers.key_at(i) as u32) << 16) | low as u32);
            }
            remaining -= cardinality;
        }
        None
    }

    /// Ascending iterator over the stored values
    pub fn iter(&self) -> RoaringBitmapIter<'_> {
        RoaringBitmapIter {
            array: &self.containers,
            index: 0,
            high: 0,
            inner: None,
        }
    }

    /// All values, ascending
    pub fn to_vec(&self) -> Vec<u32> {
        let mut out = vec![0u32; self.cardinality() as usize];
        let mut pos = 0;
        for i in 0..self.containers.size() {
            let container = self.containers.container_at(i);
            let mask = (self.containers.key_at(i) as u32) << 16;
            container.fill_least_significant_16bits(&mut out, pos, mask);
            pos += container.cardinality();
        }
        out
    }

    /// Approximate in-memory size of the container payloads in bytes
    pub fn size_in_bytes(&self) -> usize {
        (0..self.containers.size())
            .map(|i| 2 + self.containers.container_at(i).size_in_bytes())
            .sum()
    }

    /// Size of the persistent form in bytes
    pub fn serialized_size_in_bytes(&self) -> usize {
        self.containers.serialized_size_in_bytes()
    }

    /// Write the persistent little-endian layout; returns the bytes written
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<usize> {
        self.containers.serialize(writer)
    }

    /// Read a bitmap back from its persistent layout
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            containers: RoaringArray::deserialize(reader)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn container_layout(&self) -> Vec<(u16, bool, usize)> {
        (0..self.containers.size())
            .map(|i| {
                let c = self.containers.container_at(i);
                (
                    self.containers.key_at(i),
                    matches!(c, Container::Bitmap(_)),
                    c.cardinality(),
                )
            })
            .collect()
    }
}

/// Ascending iterator over a bitmap's values
pub struct RoaringBitmapIter<'a> {
    array: &'a RoaringArray,
    index: usize,
    high: u32,
    inner: Option<ContainerIter<'a>>,
}

impl Iterator for RoaringBitmapIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some(inner) = &mut self.inner {
                if let Some(low) = inner.next() {
                    return Some(self.high | low as u32);
                }
                self.index += 1;
                self.inner = None;
            }
            if self.index >= self.array.size() {
                return None;
            }
            self.high = (self.array.key_at(self.index) as u32) << 16;
            self.inner = Some(self.array.container_at(self.index).iter());
        }
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = RoaringBitmapIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
