//! Dense container: 65536-bit bitmap with a maintained cardinality counter
//!
//! Binary operations against another dense container first size the result
//! with a fused popcount, then materialize directly into the right
//! representation. Operations against a sparse operand walk its sorted
//! values and keep the counter current with branchless updates.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use super::{ARRAY_TO_BITMAP_THRESHOLD, CONTAINER_CAPACITY, Container, WORDS_PER_CONTAINER};
use crate::bits;
use crate::container::array::ArrayContainer;

/// Bitmap of 2^16 bits for high-density chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapContainer {
    words: Box<[u64; WORDS_PER_CONTAINER]>,
    cardinality: u32,
}

impl Default for BitmapContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitmapContainer {
    pub fn new() -> Self {
        Self {
            words: Box::new([0u64; WORDS_PER_CONTAINER]),
            cardinality: 0,
        }
    }

    /// Container pre-filled with the closed range `[first, last]`
    pub fn from_range(first: u32, last: u32) -> Self {
        let mut bc = Self::new();
        bc.cardinality = last - first + 1;
        if bc.cardinality as usize == CONTAINER_CAPACITY {
            bc.words.fill(!0);
        } else {
            let first_word = (first >> 6) as usize;
            let last_word = (last >> 6) as usize;
            bc.words[first_word..=last_word].fill(!0);
            bc.words[first_word] ^= (1u64 << (first & 63)) - 1;
            let zero_suffix = 63 - (last & 63);
            if zero_suffix != 0 {
                bc.words[last_word] ^= ((1u64 << zero_suffix) - 1) << (64 - zero_suffix);
            }
        }
        bc
    }

    /// Rebuild a bitmap from sorted, duplicate-free values
    pub fn from_sorted_slice(values: &[u16]) -> Self {
        let mut bc = Self::new();
        for &v in values {
            bc.words[(v >> 6) as usize] |= 1u64 << (v & 63);
        }
        bc.cardinality = values.len() as u32;
        bc
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality as usize
    }

    /// Recompute the counter from the words
    pub fn compute_cardinality(&mut self) {
        self.cardinality = bits::popcnt_slice(&self.words[..]) as u32;
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        (self.words[(value >> 6) as usize] >> (value & 63)) & 1 != 0
    }

    /// Set a bit, updating the counter without a branch
    pub fn insert(&mut self, value: u16) -> bool {
        let i = (value >> 6) as usize;
        let previous = self.words[i];
        let new = previous | (1u64 << (value & 63));
        self.words[i] = new;
        self.cardinality += ((previous ^ new) >> (value & 63)) as u32;
        previous != new
    }

    /// Clear a bit. The caller decides whether to downgrade afterwards.
    pub fn remove(&mut self, value: u16) -> bool {
        if self.contains(value) {
            self.cardinality -= 1;
            self.words[(value >> 6) as usize] &= !(1u64 << (value & 63));
            true
        } else {
            false
        }
    }

    pub fn or_array(&self, other: &ArrayContainer) -> BitmapContainer {
        let mut answer = self.clone();
        answer.or_array_inplace(other);
        answer
    }

    pub fn or_array_inplace(&mut self, other: &ArrayContainer) {
        for v in other.iter() {
            let i = (v >> 6) as usize;
            let bef = self.words[i];
            let aft = bef | (1u64 << (v & 63));
            self.words[i] = aft;
            // bef - aft wraps exactly when the bit was newly set
            self.cardinality += (bef.wrapping_sub(aft) >> 63) as u32;
        }
    }

    pub fn or_bitmap(&self, other: &BitmapContainer) -> BitmapContainer {
        let mut answer = Self::new();
        for k in 0..WORDS_PER_CONTAINER {
            answer.words[k] = self.words[k] | other.words[k];
        }
        answer.compute_cardinality();
        answer
    }

    pub fn or_bitmap_inplace(&mut self, other: &BitmapContainer) {
        for k in 0..WORDS_PER_CONTAINER {
            self.words[k] |= other.words[k];
        }
        self.compute_cardinality();
    }

    /// OR in sorted values without maintaining the counter; the caller must
    /// call `compute_cardinality` before the count is observed
    pub fn lazy_or_array_inplace(&mut self, other: &ArrayContainer) {
        for v in other.iter() {
            self.words[(v >> 6) as usize] |= 1u64 << (v & 63);
        }
    }

    /// OR in another bitmap without maintaining the counter
    pub fn lazy_or_bitmap_inplace(&mut self, other: &BitmapContainer) {
        for k in 0..WORDS_PER_CONTAINER {
            self.words[k] |= other.words[k];
        }
    }

    /// Sparse-operand intersection: keeps the array elements present here
    pub fn and_array(&self, other: &ArrayContainer) -> ArrayContainer {
        let mut content = Vec::with_capacity(other.cardinality());
        for v in other.iter() {
            if self.contains(v) {
                content.push(v);
            }
        }
        ArrayContainer::from_vec(content)
    }

    pub fn and_bitmap(&self, other: &BitmapContainer) -> Container {
        let new_cardinality = bits::popcnt_and_slice(&self.words[..], &other.words[..]) as usize;
        if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            let mut answer = Self::new();
            for k in 0..WORDS_PER_CONTAINER {
                answer.words[k] = self.words[k] & other.words[k];
            }
            answer.cardinality = new_cardinality as u32;
            Container::Bitmap(answer)
        } else {
            let mut content = Vec::with_capacity(new_cardinality);
            bits::fill_array_and(&mut content, &self.words[..], &other.words[..]);
            Container::Array(ArrayContainer::from_vec(content))
        }
    }

    /// In-place dense intersection; `Some` is the downgraded replacement
    pub fn and_bitmap_inplace(&mut self, other: &BitmapContainer) -> Option<ArrayContainer> {
        let new_cardinality = bits::popcnt_and_slice(&self.words[..], &other.words[..]) as usize;
        if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            for k in 0..WORDS_PER_CONTAINER {
                self.words[k] &= other.words[k];
            }
            self.cardinality = new_cardinality as u32;
            None
        } else {
            let mut content = Vec::with_capacity(new_cardinality);
            bits::fill_array_and(&mut content, &self.words[..], &other.words[..]);
            Some(ArrayContainer::from_vec(content))
        }
    }

    pub fn xor_array(&self, other: &ArrayContainer) -> Container {
        let mut answer = self.clone();
        match answer.xor_array_inplace(other) {
            Some(ac) => Container::Array(ac),
            None => Container::Bitmap(answer),
        }
    }

    pub fn xor_array_inplace(&mut self, other: &ArrayContainer) -> Option<ArrayContainer> {
        for v in other.iter() {
            let i = (v >> 6) as usize;
            let mask = 1u64 << (v & 63);
            let w = self.words[i];
            // +1 when the bit was clear, -1 when it was set
            self.cardinality =
                (self.cardinality as i32 + 1 - 2 * ((w & mask) >> (v & 63)) as i32) as u32;
            self.words[i] = w ^ mask;
        }
        if self.cardinality as usize <= ARRAY_TO_BITMAP_THRESHOLD {
            Some(self.to_array())
        } else {
            None
        }
    }

    pub fn xor_bitmap(&self, other: &BitmapContainer) -> Container {
        let new_cardinality = bits::popcnt_xor_slice(&self.words[..], &other.words[..]) as usize;
        if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            let mut answer = Self::new();
            for k in 0..WORDS_PER_CONTAINER {
                answer.words[k] = self.words[k] ^ other.words[k];
            }
            answer.cardinality = new_cardinality as u32;
            Container::Bitmap(answer)
        } else {
            let mut content = Vec::with_capacity(new_cardinality);
            bits::fill_array_xor(&mut content, &self.words[..], &other.words[..]);
            Container::Array(ArrayContainer::from_vec(content))
        }
    }

    pub fn xor_bitmap_inplace(&mut self, other: &BitmapContainer) -> Option<ArrayContainer> {
        let new_cardinality = bits::popcnt_xor_slice(&self.words[..], &other.words[..]) as usize;
        if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            for k in 0..WORDS_PER_CONTAINER {
                self.words[k] ^= other.words[k];
            }
            self.cardinality = new_cardinality as u32;
            None
        } else {
            let mut content = Vec::with_capacity(new_cardinality);
            bits::fill_array_xor(&mut content, &self.words[..], &other.words[..]);
            Some(ArrayContainer::from_vec(content))
        }
    }

    pub fn and_not_array(&self, other: &ArrayContainer) -> Container {
        let mut answer = self.clone();
        match answer.and_not_array_inplace(other) {
            Some(ac) => Container::Array(ac),
            None => Container::Bitmap(answer),
        }
    }

    pub fn and_not_array_inplace(&mut self, other: &ArrayContainer) -> Option<ArrayContainer> {
        for v in other.iter() {
            let i = (v >> 6) as usize;
            let oldv = self.words[i];
            let newv = oldv & !(1u64 << (v & 63));
            self.words[i] = newv;
            self.cardinality -= ((oldv ^ newv) >> (v & 63)) as u32;
        }
        if self.cardinality as usize <= ARRAY_TO_BITMAP_THRESHOLD {
            Some(self.to_array())
        } else {
            None
        }
    }

    pub fn and_not_bitmap(&self, other: &BitmapContainer) -> Container {
        let new_cardinality = bits::popcnt_andnot_slice(&self.words[..], &other.words[..]) as usize;
        if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            let mut answer = Self::new();
            for k in 0..WORDS_PER_CONTAINER {
                answer.words[k] = self.words[k] & !other.words[k];
            }
            answer.cardinality = new_cardinality as u32;
            Container::Bitmap(answer)
        } else {
            let mut content = Vec::with_capacity(new_cardinality);
            bits::fill_array_andnot(&mut content, &self.words[..], &other.words[..]);
            Container::Array(ArrayContainer::from_vec(content))
        }
    }

    pub fn and_not_bitmap_inplace(&mut self, other: &BitmapContainer) -> Option<ArrayContainer> {
        let new_cardinality = bits::popcnt_andnot_slice(&self.words[..], &other.words[..]) as usize;
        if new_cardinality > ARRAY_TO_BITMAP_THRESHOLD {
            for k in 0..WORDS_PER_CONTAINER {
                self.words[k] &= !other.words[k];
            }
            self.cardinality = new_cardinality as u32;
            None
        } else {
            let mut content = Vec::with_capacity(new_cardinality);
            bits::fill_array_andnot(&mut content, &self.words[..], &other.words[..]);
            Some(ArrayContainer::from_vec(content))
        }
    }

    pub fn intersects_array(&self, other: &ArrayContainer) -> bool {
        other.iter().any(|v| self.contains(v))
    }

    pub fn intersects_bitmap(&self, other: &BitmapContainer) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(&a, &b)| a & b != 0)
    }

    /// Complement the closed range `[first, last]` in place, updating the
    /// counter word by word
    pub fn flip_range(&mut self, first: u32, last: u32) {
        if (last - first + 1) as usize == CONTAINER_CAPACITY {
            self.cardinality = CONTAINER_CAPACITY as u32 - self.cardinality;
            for w in self.words.iter_mut() {
                *w = !*w;
            }
            return;
        }

        let first_word = (first >> 6) as usize;
        let last_word = (last >> 6) as usize;
        let first_bit = first & 63;
        let last_bit = last & 63;

        // the simple mask expression is wrong when the range ends at bit 63
        let mask_on_left: u64 = if last_bit == 63 {
            !0
        } else {
            (1u64 << (last_bit + 1)) - 1
        };
        let mut mask: u64 = !((1u64 << first_bit) - 1);

        let mut change: i32 = 0;
        if first_word == last_word {
            // range starts and ends in the same word
            mask &= mask_on_left;
            change -= self.words[first_word].count_ones() as i32;
            self.words[first_word] ^= mask;
            change += self.words[first_word].count_ones() as i32;
            self.cardinality = (self.cardinality as i32 + change) as u32;
            return;
        }

        change -= self.words[first_word].count_ones() as i32;
        self.words[first_word] ^= mask;
        change += self.words[first_word].count_ones() as i32;

        change -= self.words[last_word].count_ones() as i32;
        self.words[last_word] ^= mask_on_left;
        change += self.words[last_word].count_ones() as i32;

        // full words strictly between first and last
        for w in &mut self.words[first_word + 1..last_word] {
            change += 64 - 2 * w.count_ones() as i32;
            *w = !*w;
        }
        self.cardinality = (self.cardinality as i32 + change) as u32;
    }

    /// Set the half-open range `[first, last)`
    pub fn insert_range(&mut self, first: u32, last: u32) {
        bits::set_bit_range(&mut self.words[..], first, last);
        self.compute_cardinality();
    }

    /// Clear the half-open range `[first, last)`; caller decides downgrade
    pub fn remove_range(&mut self, first: u32, last: u32) {
        bits::reset_bit_range(&mut self.words[..], first, last);
        self.compute_cardinality();
    }

    /// Number of set bits at positions <= value
    pub fn rank(&self, value: u16) -> usize {
        let end = value as usize + 1;
        let full_words = end / 64;
        let leftover = end & 63;
        let mut r = bits::popcnt_slice(&self.words[..full_words]) as usize;
        if leftover != 0 {
            r += (self.words[full_words] << (64 - leftover)).count_ones() as usize;
        }
        r
    }

    /// k-th smallest set bit (0-indexed)
    pub fn select(&self, k: usize) -> Option<u16> {
        let mut remaining = k as u32;
        for (i, &w) in self.words.iter().enumerate() {
            let in_word = w.count_ones();
            if remaining < in_word {
                return Some((i * 64 + bits::select_in_word(w, remaining) as usize) as u16);
            }
            remaining -= in_word;
        }
        None
    }

    /// First set bit at or after position `i`
    pub fn next_set_bit(&self, i: u32) -> Option<u32> {
        let mut x = (i >> 6) as usize;
        if x >= WORDS_PER_CONTAINER {
            return None;
        }
        let w = self.words[x] >> (i & 63);
        if w != 0 {
            return Some(i + w.trailing_zeros());
        }
        x += 1;
        while x < WORDS_PER_CONTAINER {
            if self.words[x] != 0 {
                return Some((x as u32) * 64 + self.words[x].trailing_zeros());
            }
            x += 1;
        }
        None
    }

    pub fn iter(&self) -> BitmapContainerIter<'_> {
        BitmapContainerIter {
            words: &self.words[..],
            word_index: 0,
            current: self.words[0],
        }
    }

    /// Write each set position ORed with `mask` into `out` starting at `at`
    pub fn fill_least_significant_16bits(&self, out: &mut [u32], at: usize, mask: u32) {
        let mut pos = at;
        for (k, &word) in self.words.iter().enumerate() {
            let mut bitset = word;
            while bitset != 0 {
                let t = bitset & bitset.wrapping_neg();
                out[pos] = ((k as u32) * 64 + (t - 1).count_ones()) | mask;
                pos += 1;
                bitset ^= t;
            }
        }
    }

    /// Sparse copy of the set positions, sized to the cardinality
    pub fn to_array(&self) -> ArrayContainer {
        let mut content = Vec::with_capacity(self.cardinality as usize);
        for (k, &word) in self.words.iter().enumerate() {
            let mut bitset = word;
            while bitset != 0 {
                let t = bitset & bitset.wrapping_neg();
                content.push((k * 64 + (t - 1).count_ones() as usize) as u16);
                bitset ^= t;
            }
        }
        ArrayContainer::from_vec(content)
    }

    pub fn size_in_bytes(&self) -> usize {
        WORDS_PER_CONTAINER * 8
    }

    pub fn serialized_size_in_bytes(&self) -> usize {
        WORDS_PER_CONTAINER * 8
    }

    /// Serialize the 1024 words little-endian (8192 bytes); the cardinality
    /// travels in the key/cardinality table of the outer array
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        for &word in self.words.iter() {
            writer.write_u64::<LittleEndian>(word)?;
        }
        Ok(WORDS_PER_CONTAINER * 8)
    }

    pub fn deserialize<R: Read>(reader: &mut R, cardinality: usize) -> io::Result<Self> {
        let mut bc = Self::new();
        for word in bc.words.iter_mut() {
            *word = reader.read_u64::<LittleEndian>()?;
        }
        bc.cardinality = cardinality as u32;
        Ok(bc)
    }
}

/// Ascending iterator over the set positions of a dense container
pub struct BitmapContainerIter<'a> {
    words: &'a [u64],
    word_index: usize,
    current: u64,
}

impl Iterator for BitmapContainerIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.current == 0 {
            self.word_index += 1;
            if self.word_index >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_index];
        }
        let t = self.current & self.current.wrapping_neg();
        self.current ^= t;
        Some((self.word_index * 64 + (t - 1).count_ones() as usize) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bc(values: &[u16]) -> BitmapContainer {
        let mut c = BitmapContainer::new();
        for &v in values {
            assert!(c.insert(v));
        }
        c
    }

    #[test]
    fn test_insert_remove_contains() {
        let mut c = BitmapContainer::new();
        assert!(c.insert(0));
        assert!(c.insert(63));
        assert!(c.insert(64));
        assert!(c.insert(65535));
        assert!(!c.insert(64));
        assert_eq!(c.cardinality(), 4);
        assert!(c.contains(63));
        assert!(!c.contains(1));
        assert!(c.remove(63));
        assert!(!c.remove(63));
        assert_eq!(c.cardinality(), 3);
    }

    #[test]
    fn test_cardinality_matches_popcount() {
        let mut c = BitmapContainer::new();
        for v in (0..60000).step_by(7) {
            c.insert(v as u16);
        }
        let counted = c.cardinality();
        c.compute_cardinality();
        assert_eq!(c.cardinality(), counted);
    }

    #[test]
    fn test_from_range() {
        let c = BitmapContainer::from_range(100, 4200);
        assert_eq!(c.cardinality(), 4101);
        assert!(!c.contains(99));
        assert!(c.contains(100));
        assert!(c.contains(4200));
        assert!(!c.contains(4201));

        let full = BitmapContainer::from_range(0, 65535);
        assert_eq!(full.cardinality(), CONTAINER_CAPACITY);

        // range ending on a word boundary bit
        let edge = BitmapContainer::from_range(10, 63);
        assert_eq!(edge.cardinality(), 54);
        assert!(edge.contains(63));
        assert!(!edge.contains(64));
    }

    #[test]
    fn test_flip_range_same_word() {
        let mut c = bc(&[3, 5]);
        c.flip_range(2, 6);
        assert_eq!(c.to_array().as_slice(), &[2, 4, 6]);
        assert_eq!(c.cardinality(), 3);
    }

    #[test]
    fn test_flip_range_spanning_words() {
        let mut c = bc(&[0, 70, 130]);
        c.flip_range(60, 130);
        let expected: Vec<u16> = std::iter::once(0u16)
            .chain((60..=130).filter(|&v| v != 70 && v != 130))
            .collect();
        assert_eq!(c.to_array().as_slice(), &expected[..]);
        let mut recomputed = c.clone();
        recomputed.compute_cardinality();
        assert_eq!(recomputed.cardinality(), c.cardinality());
    }

    #[test]
    fn test_flip_range_full() {
        let mut c = bc(&[1, 2, 3]);
        c.flip_range(0, 65535);
        assert_eq!(c.cardinality(), CONTAINER_CAPACITY - 3);
        assert!(!c.contains(2));
        assert!(c.contains(0));
        assert!(c.contains(65535));
    }

    #[test]
    fn test_flip_range_ending_at_bit_63() {
        let mut c = BitmapContainer::new();
        c.flip_range(0, 63);
        assert_eq!(c.cardinality(), 64);
        assert!(c.contains(63));
        assert!(!c.contains(64));
    }

    #[test]
    fn test_insert_remove_range() {
        let mut c = BitmapContainer::new();
        c.insert_range(10, 5000);
        assert_eq!(c.cardinality(), 4990);
        c.remove_range(20, 30);
        assert_eq!(c.cardinality(), 4980);
        assert!(c.contains(19));
        assert!(!c.contains(20));
        assert!(!c.contains(29));
        assert!(c.contains(30));
        // empty range is a no-op
        c.remove_range(100, 100);
        assert_eq!(c.cardinality(), 4980);
    }

    #[test]
    fn test_rank_select_roundtrip() {
        let values: Vec<u16> = (0..30000).step_by(13).collect();
        let c = BitmapContainer::from_sorted_slice(&values);
        assert_eq!(c.rank(0), 1);
        assert_eq!(c.rank(12), 1);
        assert_eq!(c.rank(13), 2);
        for (k, &v) in values.iter().enumerate().step_by(97) {
            assert_eq!(c.select(c.rank(v) - 1), Some(v));
            assert_eq!(c.rank(c.select(k).unwrap()), k + 1);
        }
        assert_eq!(c.select(values.len()), None);
    }

    #[test]
    fn test_next_set_bit_and_iter() {
        let c = bc(&[5, 64, 700, 65535]);
        assert_eq!(c.next_set_bit(0), Some(5));
        assert_eq!(c.next_set_bit(5), Some(5));
        assert_eq!(c.next_set_bit(6), Some(64));
        assert_eq!(c.next_set_bit(701), Some(65535));
        assert_eq!(c.next_set_bit(65535), Some(65535));

        let collected: Vec<u16> = c.iter().collect();
        assert_eq!(collected, vec![5, 64, 700, 65535]);
        assert_eq!(c.to_array().as_slice(), &collected[..]);
    }

    #[test]
    fn test_or_and_xor_andnot_with_array() {
        let dense = bc(&[1, 2, 3, 100]);
        let sparse = ArrayContainer::from_vec(vec![3, 100, 200]);

        let ored = dense.or_array(&sparse);
        assert_eq!(ored.to_array().as_slice(), &[1, 2, 3, 100, 200]);
        assert_eq!(ored.cardinality(), 5);

        let anded = dense.and_array(&sparse);
        assert_eq!(anded.as_slice(), &[3, 100]);

        let mut xored = dense.clone();
        let downgraded = xored.xor_array_inplace(&sparse).unwrap();
        assert_eq!(downgraded.as_slice(), &[1, 2, 200]);

        let mut removed = dense.clone();
        let downgraded = removed.and_not_array_inplace(&sparse).unwrap();
        assert_eq!(downgraded.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_bitmap_bitmap_ops_pick_representation() {
        let a = BitmapContainer::from_range(0, 9999);
        let b = BitmapContainer::from_range(5000, 14999);

        match a.and_bitmap(&b) {
            Container::Bitmap(c) => assert_eq!(c.cardinality(), 5000),
            Container::Array(_) => panic!("5000 > threshold, expected bitmap"),
        }

        let small = BitmapContainer::from_range(9000, 9999);
        match a.and_bitmap(&small) {
            Container::Array(c) => assert_eq!(c.cardinality(), 1000),
            Container::Bitmap(_) => panic!("1000 <= threshold, expected array"),
        }

        match a.xor_bitmap(&b) {
            Container::Bitmap(c) => assert_eq!(c.cardinality(), 10000),
            Container::Array(_) => panic!("expected bitmap"),
        }

        match a.and_not_bitmap(&b) {
            Container::Bitmap(c) => assert_eq!(c.cardinality(), 5000),
            Container::Array(_) => panic!("expected bitmap"),
        }

        let ored = a.or_bitmap(&b);
        assert_eq!(ored.cardinality(), 15000);
        assert!(a.intersects_bitmap(&b));
        assert!(!a.intersects_bitmap(&BitmapContainer::from_range(20000, 30000)));
    }

    #[test]
    fn test_lazy_or_defers_cardinality() {
        let mut a = BitmapContainer::from_range(0, 4999);
        let b = BitmapContainer::from_range(4000, 8999);
        a.lazy_or_bitmap_inplace(&b);
        a.compute_cardinality();
        assert_eq!(a.cardinality(), 9000);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let c = BitmapContainer::from_range(100, 8000);
        let mut buf = Vec::new();
        let written = c.serialize(&mut buf).unwrap();
        assert_eq!(written, 8192);
        assert_eq!(buf.len(), 8192);
        let back = BitmapContainer::deserialize(&mut &buf[..], c.cardinality()).unwrap();
        assert_eq!(back, c);
    }
}
