//! little-endian field access inside fixed-size on-disk records

#[inline]
pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[inline]
pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_u32_array<const N: usize>(buf: &[u8], offset: usize) -> [u32; N] {
    let mut values = [0u32; N];
    for (i, value) in values.iter_mut().enumerate() {
        *value = read_u32(buf, offset + i * 4);
    }
    values
}

pub(crate) fn write_u32_slice(buf: &mut [u8], offset: usize, values: &[u32]) {
    for (i, value) in values.iter().enumerate() {
        write_u32(buf, offset + i * 4, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_is_little_endian() {
        let mut buf = [0u8; 8];
        write_u32(&mut buf, 2, 0x0403_0201);
        assert_eq!(buf, [0, 0, 1, 2, 3, 4, 0, 0]);
        assert_eq!(read_u32(&buf, 2), 0x0403_0201);
    }

    #[test]
    fn test_u32_arrays() {
        let mut buf = [0u8; 12];
        write_u32_slice(&mut buf, 0, &[7, 8, 9]);
        assert_eq!(read_u32_array::<3>(&buf, 0), [7, 8, 9]);
        assert_eq!(read_u32_array::<2>(&buf, 4), [8, 9]);
    }
}
