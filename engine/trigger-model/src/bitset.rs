use crate::error::{check_range, Result};

/// Word-packed bitset with forward scans and fixed-width field access.
/// Length is in bits; bit 0 is the least significant bit of word 0.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bitset {
    words: Box<[u64]>,
    len_bits: usize,
}

/// Widest field handled by [`Bitset::read_field`] and [`Bitset::write_field`]
pub const MAX_FIELD_WIDTH: usize = 128;

impl Bitset {
    /// Allocate a zeroed bitset with `len_bits` bits.
    pub fn with_len(len_bits: usize) -> Self {
        let nwords = (len_bits + 63) >> 6;
        Self { words: vec![0u64; nwords].into_boxed_slice(), len_bits }
    }

    #[inline]
    pub fn len_bits(&self) -> usize {
        self.len_bits
    }
    #[inline]
    fn check(&self, i: usize) -> Result<()> {
        check_range("bit", i, self.len_bits)
    }
    fn check_field(&self, offset: usize, width: usize) -> Result<()> {
        check_range("field width", width, MAX_FIELD_WIDTH + 1)?;
        check_range("field end", offset.saturating_add(width), self.len_bits + 1)
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn set(&mut self, i: usize) -> Result<()> {
        self.check(i)?;
        self.words[i >> 6] |= 1u64 << (i & 63);
        Ok(())
    }
    #[inline]
    pub fn clear(&mut self, i: usize) -> Result<()> {
        self.check(i)?;
        self.words[i >> 6] &= !(1u64 << (i & 63));
        Ok(())
    }
    #[inline]
    pub fn get(&self, i: usize) -> Result<bool> {
        self.check(i)?;
        Ok(self.is_set(i))
    }

    /// Bit `i`, false past the end.
    #[inline]
    pub fn is_set(&self, i: usize) -> bool {
        i < self.len_bits && ((self.words[i >> 6] >> (i & 63)) & 1) != 0
    }

    #[inline]
    fn put(&mut self, i: usize, value: bool) {
        if value {
            self.words[i >> 6] |= 1u64 << (i & 63);
        } else {
            self.words[i >> 6] &= !(1u64 << (i & 63));
        }
    }

    /// Zero every bit, keeping the allocation.
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Next set bit at or after `i`.
    pub fn next_one_at_or_after(&self, i: usize) -> Option<usize> {
        if i >= self.len_bits {
            return None;
        }
        let mut w = i >> 6;
        let bits = self.words[w] & (!0u64 << (i & 63));
        if bits != 0 {
            let idx = (w << 6) + bits.trailing_zeros() as usize;
            return (idx < self.len_bits).then_some(idx);
        }
        w += 1;
        while w < self.words.len() {
            let v = self.words[w];
            if v != 0 {
                let idx = (w << 6) + v.trailing_zeros() as usize;
                return (idx < self.len_bits).then_some(idx);
            }
            w += 1;
        }
        None
    }

    /// Indices of all set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        let mut cursor = 0usize;
        std::iter::from_fn(move || {
            let idx = self.next_one_at_or_after(cursor)?;
            cursor = idx + 1;
            Some(idx)
        })
    }

    /// Overwrite the `width` bits starting at `offset` with the low bits of `value`.
    pub fn write_field(&mut self, offset: usize, width: usize, value: u128) -> Result<()> {
        self.check_field(offset, width)?;
        for k in 0..width {
            self.put(offset + k, (value >> k) & 1 == 1);
        }
        Ok(())
    }

    /// Read `width` bits starting at `offset`; bit `offset` lands in bit 0.
    pub fn read_field(&self, offset: usize, width: usize) -> Result<u128> {
        self.check_field(offset, width)?;
        let mut out = 0u128;
        for k in 0..width {
            if self.is_set(offset + k) {
                out |= 1u128 << k;
            }
        }
        Ok(out)
    }

    /// Bits rendered most significant first, the usual hardware notation.
    pub fn to_bit_string(&self) -> String {
        (0..self.len_bits).rev().map(|i| if self.is_set(i) { '1' } else { '0' }).collect()
    }
}

impl core::fmt::Debug for Bitset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Bitset({} bits, {} set)", self.len_bits, self.count_ones())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriggerError;

    #[test]
    fn set_get_clear_and_scan() {
        let mut b = Bitset::with_len(130);
        assert!(b.is_empty());
        b.set(0).unwrap();
        b.set(64).unwrap();
        b.set(129).unwrap();
        assert!(b.get(64).unwrap());
        assert_eq!(b.next_one_at_or_after(1), Some(64));
        assert_eq!(b.next_one_at_or_after(65), Some(129));
        b.clear(64).unwrap();
        assert_eq!(b.ones().collect::<Vec<_>>(), vec![0, 129]);
        assert_eq!(b.count_ones(), 2);
        b.clear_all();
        assert!(b.is_empty());
    }

    #[test]
    fn fields_straddle_word_boundaries() {
        let mut b = Bitset::with_len(2000);
        let block = (0b10110u128 << 36) | 0xF_0000_0001;
        b.write_field(1900, 100, block).unwrap();
        assert_eq!(b.read_field(1900, 100).unwrap(), block);
        assert_eq!(b.read_field(1936, 5).unwrap(), 0b10110);
        b.write_field(1900, 100, 0).unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn bit_string_is_msb_first() {
        let mut b = Bitset::with_len(5);
        b.set(0).unwrap();
        b.set(3).unwrap();
        assert_eq!(b.to_bit_string(), "01001");
    }

    #[test]
    fn out_of_bounds_access_is_a_range_error() {
        let mut b = Bitset::with_len(10);
        assert!(matches!(b.get(10), Err(TriggerError::Range { index: 10, limit: 10, .. })));
        assert!(b.set(64).is_err());
        assert!(b.clear(usize::MAX).is_err());
        assert!(!b.is_set(10));
        assert!(b.is_empty());

        assert!(b.read_field(4, 7).is_err());
        assert!(b.write_field(0, 129, 0).is_err());
        assert!(b.write_field(usize::MAX, 2, 0b11).is_err());
        assert_eq!(b.read_field(4, 6).unwrap(), 0);
    }

    #[test]
    fn empty_bitset_rejects_every_index() {
        let b = Bitset::with_len(0);
        assert!(b.get(0).is_err());
        assert_eq!(b.next_one_at_or_after(0), None);
        assert_eq!(b.to_bit_string(), "");
    }
}
