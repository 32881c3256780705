//! Bounds-checked little-endian primitive readers over in-memory byte
//! slices, shared by the schema-driven decoder (`thru-abi`) and the
//! fixed-layout wire codecs (`thru-wire`).

/// Returns `buf[offset..offset+len]`, or `None` when it would run past the
/// end of `buf`. Every primitive reader below goes through this so that a
/// short buffer never panics.
#[inline]
pub fn window(buf: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    buf.get(offset..offset.checked_add(len)?)
}

macro_rules! le_reader {
    ($name:ident, $ty:ty, $len:expr) => {
        #[inline]
        pub fn $name(buf: &[u8], offset: usize) -> Option<$ty> {
            let bytes = window(buf, offset, $len)?;
            let mut arr = [0u8; $len];
            arr.copy_from_slice(bytes);
            Some(<$ty>::from_le_bytes(arr))
        }
    };
}

le_reader!(read_u8, u8, 1);
le_reader!(read_i8, i8, 1);
le_reader!(read_u16, u16, 2);
le_reader!(read_i16, i16, 2);
le_reader!(read_u32, u32, 4);
le_reader!(read_i32, i32, 4);
le_reader!(read_u64, u64, 8);
le_reader!(read_i64, i64, 8);
le_reader!(read_f32, f32, 4);
le_reader!(read_f64, f64, 8);

/// Half-precision float is never converted to a full `f32`/`f64` (spec:
/// "there is no requirement to convert half-float to a full float") — the
/// raw 16-bit pattern is all a consumer gets.
#[inline]
pub fn read_f16_bits(buf: &[u8], offset: usize) -> Option<u16> {
    read_u16(buf, offset)
}

/// Counts the number of set bits across a byte slice (used for state-proof
/// path-bitset sizing).
#[inline]
pub fn popcount(bytes: &[u8]) -> u32 {
    bytes.iter().map(|b| b.count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let buf = [0x78, 0x56, 0x34, 0x12];
        assert_eq!(read_u32(&buf, 0), Some(0x12345678));
    }

    #[test]
    fn out_of_bounds_is_none() {
        let buf = [0x01, 0x02];
        assert_eq!(read_u32(&buf, 0), None);
        assert_eq!(read_u16(&buf, 1), None);
    }

    #[test]
    fn popcount_counts_set_bits() {
        assert_eq!(popcount(&[0xff, 0x00, 0x0f]), 12);
    }
}
