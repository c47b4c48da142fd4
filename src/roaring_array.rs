//! Ordered map from high-16-bit keys to containers
//!
//! Three parallel sequences: strictly ascending keys, shared container
//! handles, and per-entry dirty bits. After a clone both handles refer to
//! the same containers; a dirty entry is duplicated on first write, so
//! mutations on one handle never reach the sibling.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::sync::Arc;

use crate::container::{ARRAY_TO_BITMAP_THRESHOLD, Container, WORDS_PER_CONTAINER};
use crate::error::{Error, Result};

/// Cookie of the persistent layout (RoaringFormatSpec, no run containers)
pub const SERIAL_COOKIE: u32 = 12346;

fn payload_size_from_cardinality(cardinality: usize) -> usize {
    if cardinality > ARRAY_TO_BITMAP_THRESHOLD {
        WORDS_PER_CONTAINER * 8
    } else {
        2 * cardinality
    }
}

#[derive(Debug, Default)]
pub(crate) struct RoaringArray {
    keys: Vec<u16>,
    containers: Vec<Arc<Container>>,
    dirty: Vec<bool>,
}

impl RoaringArray {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.containers.clear();
        self.dirty.clear();
    }

    #[inline]
    pub fn key_at(&self, i: usize) -> u16 {
        self.keys[i]
    }

    #[inline]
    pub fn container_at(&self, i: usize) -> &Container {
        &self.containers[i]
    }

    /// Hybrid search over `keys[begin..end)`: binary halving while the
    /// window holds more than 16 keys, then a linear sweep for the tail.
    /// `Err` carries the insertion point.
    pub fn binary_search(&self, begin: usize, end: usize, key: u16) -> std::result::Result<usize, usize> {
        let mut low = begin;
        let mut high = end as isize - 1;
        while low as isize + 16 <= high {
            let middle = (low + high as usize) >> 1;
            let middle_value = self.keys[middle];
            if middle_value < key {
                low = middle + 1;
            } else if middle_value > key {
                high = middle as isize - 1;
            } else {
                return Ok(middle);
            }
        }
        while low as isize <= high {
            let value = self.keys[low];
            if value >= key {
                if value == key {
                    return Ok(low);
                }
                break;
            }
            low += 1;
        }
        Err(low)
    }

    /// Index of a key, with a fast path for append-heavy workloads
    pub fn get_index(&self, key: u16) -> std::result::Result<usize, usize> {
        let size = self.size();
        if size == 0 {
            return Err(0);
        }
        if self.keys[size - 1] == key {
            return Ok(size - 1);
        }
        self.binary_search(0, size, key)
    }

    pub fn contains_key(&self, key: u16) -> bool {
        self.get_index(key).is_ok()
    }

    pub fn get_container(&self, key: u16) -> Option<&Container> {
        self.get_index(key).ok().map(|i| self.container_at(i))
    }

    /// Exclusive access to the container at `i`, duplicating it first if it
    /// may still be shared with a clone
    pub fn writable_container_at(&mut self, i: usize) -> &mut Container {
        if self.is_dirty(i) {
            let fresh = Container::clone(&self.containers[i]);
            self.containers[i] = Arc::new(fresh);
            self.dirty[i] = false;
        }
        Arc::make_mut(&mut self.containers[i])
    }

    pub fn insert_at(&mut self, i: usize, key: u16, container: Container) {
        self.keys.insert(i, key);
        self.containers.insert(i, Arc::new(container));
        if self.has_dirty() {
            self.dirty.insert(i, false);
        }
    }

    pub fn append(&mut self, key: u16, container: Container) {
        debug_assert!(self.keys.last().is_none_or(|&k| k < key));
        self.keys.push(key);
        self.containers.push(Arc::new(container));
        if self.has_dirty() {
            self.dirty.push(false);
        }
    }

    /// Append a copy of `other`'s entry at `i`
    pub fn append_copy(&mut self, other: &RoaringArray, i: usize) {
        self.append(other.keys[i], Container::clone(&other.containers[i]));
    }

    pub fn append_copy_many(&mut self, other: &RoaringArray, start: usize, end: usize) {
        for i in start..end {
            self.append_copy(other, i);
        }
    }

    /// Append copies of `other`'s entries with keys below `stopping_key`
    pub fn append_copies_until(&mut self, other: &RoaringArray, stopping_key: u16) {
        for i in 0..other.size() {
            if other.keys[i] >= stopping_key {
                break;
            }
            self.append_copy(other, i);
        }
    }

    /// Append copies of `other`'s entries with keys above `before_start`
    pub fn append_copies_after(&mut self, other: &RoaringArray, before_start: u16) {
        let start = match other.get_index(before_start) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        for i in start..other.size() {
            self.append_copy(other, i);
        }
    }

    pub fn remove_key(&mut self, key: u16) -> bool {
        match self.binary_search(0, self.size(), key) {
            Ok(i) => {
                self.remove_at(i);
                true
            }
            Err(_) => false,
        }
    }

    pub fn remove_at(&mut self, i: usize) {
        self.keys.remove(i);
        self.containers.remove(i);
        if self.has_dirty() {
            self.dirty.remove(i);
        }
    }

    /// Drop the entries at indices `[begin, end)`
    pub fn remove_index_range(&mut self, begin: usize, end: usize) {
        if end <= begin {
            return;
        }
        self.keys.drain(begin..end);
        self.containers.drain(begin..end);
        if self.has_dirty() {
            self.dirty.drain(begin..end);
        }
    }

    pub fn set_container_at(&mut self, i: usize, container: Container) {
        self.containers[i] = Arc::new(container);
        if self.has_dirty() {
            self.dirty[i] = false;
        }
    }

    pub fn replace_key_and_container_at(&mut self, i: usize, key: u16, container: Container) {
        self.keys[i] = key;
        self.containers[i] = Arc::new(container);
        if self.has_dirty() {
            self.dirty[i] = false;
        }
    }

    /// Galloping search: first index strictly after `pos` whose key is
    /// >= `min`, or `size()` when exhausted
    pub fn advance_until(&self, min: u16, pos: usize) -> usize {
        let size = self.size();
        let mut lower = pos + 1;
        if lower >= size || self.keys[lower] >= min {
            return lower;
        }

        let mut span_size = 1;
        while lower + span_size < size && self.keys[lower + span_size] < min {
            span_size *= 2;
        }
        let mut upper = if lower + span_size < size {
            lower + span_size
        } else {
            size - 1
        };

        if self.keys[upper] == min {
            return upper;
        }
        if self.keys[upper] < min {
            return size;
        }

        // the next-smallest span was too small, so the answer is in
        // (lower + span/2, upper)
        lower += span_size / 2;
        while lower + 1 != upper {
            let mid = (lower + upper) / 2;
            if self.keys[mid] == min {
                return mid;
            } else if self.keys[mid] < min {
                lower = mid;
            } else {
                upper = mid;
            }
        }
        upper
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = vec![true; self.keys.len()];
    }

    #[inline]
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    #[inline]
    pub fn is_dirty(&self, i: usize) -> bool {
        self.has_dirty() && self.dirty[i]
    }

    pub fn serialized_size_in_bytes(&self) -> usize {
        let mut count = 4 + 4;
        for c in &self.containers {
            count += 4 + 4;
            count += c.serialized_size_in_bytes();
        }
        count
    }

    /// Write the persistent layout: cookie, count, key/cardinality table,
    /// offset table, then the container payloads. Returns the total size.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let n = self.keys.len();
        let preamble_size = 4 + 4 + 8 * n;
        let mut header = Vec::with_capacity(preamble_size);
        header.write_u32::<LittleEndian>(SERIAL_COOKIE)?;
        header.write_u32::<LittleEndian>(n as u32)?;
        for (key, container) in self.keys.iter().zip(&self.containers) {
            header.write_u16::<LittleEndian>(*key)?;
            header.write_u16::<LittleEndian>((container.cardinality() - 1) as u16)?;
        }
        let mut offset = preamble_size;
        for container in &self.containers {
            header.write_u32::<LittleEndian>(offset as u32)?;
            offset += payload_size_from_cardinality(container.cardinality());
        }
        writer.write_all(&header)?;
        for container in &self.containers {
            container.serialize(writer)?;
        }
        Ok(offset)
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<RoaringArray> {
        let cookie = reader.read_u32::<LittleEndian>()?;
        if cookie != SERIAL_COOKIE {
            return Err(Error::InvalidCookie {
                expected: SERIAL_COOKIE,
                got: cookie,
            });
        }
        let n = reader.read_u32::<LittleEndian>()? as usize;
        let mut keys = Vec::with_capacity(n);
        let mut cardinalities = Vec::with_capacity(n);
        for _ in 0..n {
            keys.push(reader.read_u16::<LittleEndian>()?);
            cardinalities.push(reader.read_u16::<LittleEndian>()? as usize + 1);
        }
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            offsets.push(reader.read_u32::<LittleEndian>()? as usize);
        }

        let mut ra = RoaringArray::new();
        let mut expected_offset = 4 + 4 + 8 * n;
        for i in 0..n {
            if i > 0 && keys[i] <= keys[i - 1] {
                return Err(Error::Corruption(format!(
                    "container keys not strictly ascending at index {i}"
                )));
            }
            // the offset table is redundant with the cardinality table;
            // trust the cardinalities when they disagree
            if offsets[i] != expected_offset {
                log::warn!(
                    "container offset table mismatch at index {}: expected {}, got {}",
                    i,
                    expected_offset,
                    offsets[i]
                );
            }
            expected_offset += payload_size_from_cardinality(cardinalities[i]);
            let container = Container::deserialize(reader, cardinalities[i])?;
            ra.append(keys[i], container);
        }
        Ok(ra)
    }
}

impl Clone for RoaringArray {
    /// Shallow copy sharing the container handles; the copy is marked fully
    /// dirty so its first write to any entry duplicates that container. The
    /// source side stays safe through the shared-handle reference counts.
    fn clone(&self) -> Self {
        let mut cloned = RoaringArray {
            keys: self.keys.clone(),
            containers: self.containers.clone(),
            dirty: Vec::new(),
        };
        cloned.mark_all_dirty();
        cloned
    }
}

impl PartialEq for RoaringArray {
    /// Same keys and equal containers position-wise; dirty bits are a
    /// sharing detail, not part of the value
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
            && self
                .containers
                .iter()
                .zip(&other.containers)
                .all(|(a, b)| a == b)
    }
}

impl Eq for RoaringArray {}

#[cfg(test)]
mod tests {
    use super::*;

    fn singleton(value: u16) -> Container {
        let mut c = Container::new();
        c.insert(value);
        c
    }

    fn sample() -> RoaringArray {
        let mut ra = RoaringArray::new();
        for key in [2u16, 5, 9, 10, 30, 100] {
            ra.append(key, singleton(key));
        }
        ra
    }

    #[test]
    fn test_binary_search_contract() {
        let ra = sample();
        assert_eq!(ra.binary_search(0, ra.size(), 2), Ok(0));
        assert_eq!(ra.binary_search(0, ra.size(), 100), Ok(5));
        assert_eq!(ra.binary_search(0, ra.size(), 0), Err(0));
        assert_eq!(ra.binary_search(0, ra.size(), 6), Err(2));
        assert_eq!(ra.binary_search(0, ra.size(), 101), Err(6));

        // the halving path needs more than 16 keys
        let mut big = RoaringArray::new();
        for key in (0..200u16).map(|k| k * 3) {
            big.append(key, singleton(key));
        }
        assert_eq!(big.binary_search(0, big.size(), 300), Ok(100));
        assert_eq!(big.binary_search(0, big.size(), 301), Err(101));
        assert_eq!(big.get_index(597), Ok(199));
        assert_eq!(big.get_index(598), Err(200));
    }

    #[test]
    fn test_insert_remove_keep_parallel_sequences() {
        let mut ra = sample();
        ra.insert_at(2, 7, singleton(7));
        assert_eq!(ra.key_at(2), 7);
        assert_eq!(ra.size(), 7);
        assert!(ra.contains_key(7));

        assert!(ra.remove_key(7));
        assert!(!ra.remove_key(7));
        assert_eq!(ra.size(), 6);

        ra.remove_index_range(1, 3);
        assert_eq!(ra.size(), 4);
        assert_eq!(ra.key_at(1), 10);
        // half-open: an empty index range removes nothing
        ra.remove_index_range(2, 2);
        assert_eq!(ra.size(), 4);
    }

    #[test]
    fn test_append_copy_family() {
        let source = sample();
        let mut ra = RoaringArray::new();
        ra.append_copies_until(&source, 10);
        assert_eq!(ra.size(), 3);
        assert_eq!(ra.key_at(2), 9);

        ra.append_copies_after(&source, 9);
        assert_eq!(ra.size(), 6);
        assert_eq!(ra, source);

        let mut ra2 = RoaringArray::new();
        ra2.append_copy_many(&source, 0, source.size());
        assert_eq!(ra2, source);

        // append_copies_after with a key absent from the source
        let mut ra3 = RoaringArray::new();
        ra3.append_copies_after(&source, 6);
        assert_eq!(ra3.size(), 4);
        assert_eq!(ra3.key_at(0), 9);
    }

    #[test]
    fn test_advance_until() {
        let ra = sample(); // keys 2, 5, 9, 10, 30, 100
        assert_eq!(ra.advance_until(9, 0), 2);
        assert_eq!(ra.advance_until(10, 0), 3);
        assert_eq!(ra.advance_until(11, 2), 4);
        assert_eq!(ra.advance_until(100, 0), 5);
        assert_eq!(ra.advance_until(101, 0), 6);
        // already past the minimum: the next index is returned as-is
        assert_eq!(ra.advance_until(2, 3), 4);
    }

    #[test]
    fn test_clone_marks_dirty_and_copy_on_write() {
        let mut ra = sample();
        let mut cloned = ra.clone();
        assert!(cloned.has_dirty());
        assert!(cloned.is_dirty(0));

        // writing through the clone duplicates the entry and clears its bit
        cloned.writable_container_at(0).insert(999);
        assert!(!cloned.is_dirty(0));
        assert!(cloned.container_at(0).contains(999));
        assert!(!ra.container_at(0).contains(999));

        // writing through the source must not reach the clone either
        ra.writable_container_at(1).insert(777);
        assert!(ra.container_at(1).contains(777));
        assert!(!cloned.container_at(1).contains(777));
    }

    #[test]
    fn test_replace_and_set_clear_dirty() {
        let ra = sample();
        let mut cloned = ra.clone();
        cloned.set_container_at(0, singleton(42));
        assert!(!cloned.is_dirty(0));
        cloned.replace_key_and_container_at(1, 6, singleton(6));
        assert_eq!(cloned.key_at(1), 6);
        assert!(!cloned.is_dirty(1));
        assert!(cloned.is_dirty(2));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut ra = RoaringArray::new();
        ra.append(0, singleton(13));
        ra.append(7, Container::range_of_ones(0, 5000));
        ra.append(65535, Container::range_of_ones(100, 200));

        let mut buf = Vec::new();
        let written = ra.serialize(&mut buf).unwrap();
        assert_eq!(written, buf.len());
        assert_eq!(written, ra.serialized_size_in_bytes());

        let back = RoaringArray::deserialize(&mut &buf[..]).unwrap();
        assert_eq!(back, ra);
        assert!(matches!(back.container_at(1), Container::Bitmap(_)));
        assert_eq!(back.container_at(1).cardinality(), 5001);
    }

    #[test]
    fn test_deserialize_rejects_bad_cookie() {
        let mut buf = Vec::new();
        sample().serialize(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        match RoaringArray::deserialize(&mut &buf[..]) {
            Err(Error::InvalidCookie { expected, .. }) => assert_eq!(expected, SERIAL_COOKIE),
            other => panic!("expected cookie error, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_rejects_unordered_keys() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(SERIAL_COOKIE).unwrap();
        buf.write_u32::<LittleEndian>(2).unwrap();
        for key in [5u16, 2] {
            buf.write_u16::<LittleEndian>(key).unwrap();
            buf.write_u16::<LittleEndian>(0).unwrap(); // cardinality 1
        }
        buf.write_u32::<LittleEndian>(24).unwrap();
        buf.write_u32::<LittleEndian>(26).unwrap();
        for payload in [11u16, 12] {
            buf.write_u16::<LittleEndian>(payload).unwrap();
        }
        assert!(matches!(
            RoaringArray::deserialize(&mut &buf[..]),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_truncated_stream() {
        let mut buf = Vec::new();
        sample().serialize(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            RoaringArray::deserialize(&mut &buf[..]),
            Err(Error::Io(_))
        ));
    }
}
