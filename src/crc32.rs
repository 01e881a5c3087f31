//! CRC-32 used to verify that the entries of the directory are uncorrupted.
//!
//! This is the nibble-table variant known from the Arduino EEPROM examples. Unlike the
//! textbook CRC-32 it inverts the accumulator after every byte, so its values don't match
//! generic CRC-32 calculators. The directory format depends on exactly this behavior, so it
//! must not be replaced by a "proper" implementation.

#[cfg(feature = "defmt")]
use defmt::trace;

const CRC_TABLE: [u32; 16] = [
    0x00000000, 0x1db71064, 0x3b6e20c8, 0x26d930ac, 0x76dc4190, 0x6b6b51f4, 0x4db26158, 0x5005713c,
    0xedb88320, 0xf00f9344, 0xd6d6a3e8, 0xcb61b38c, 0x9b64c2b0, 0x86d3d2d4, 0xa00ae278, 0xbdbdf21c,
];

pub const CRC32_INITIAL_VALUE: u32 = !0;

/// Running CRC-32 over a sequence of bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Crc32 {
    value: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub const fn new() -> Self {
        Self::with_value(CRC32_INITIAL_VALUE)
    }

    /// Resumes a computation, e.g. from a value stored on the device.
    pub const fn with_value(value: u32) -> Self {
        Self { value }
    }

    pub fn append_byte(&mut self, v: u8) {
        let mut value = self.value;
        value = table_entry(value ^ v as u32) ^ (value >> 4);
        value = table_entry(value ^ (v >> 4) as u32) ^ (value >> 4);
        self.value = !value;
    }

    pub fn append(&mut self, bytes: &[u8]) {
        #[cfg(feature = "defmt")]
        trace!("crc32: append {} bytes", bytes.len());

        for &b in bytes {
            self.append_byte(b);
        }
    }

    pub const fn value(&self) -> u32 {
        self.value
    }
}

#[inline(always)]
const fn table_entry(key: u32) -> u32 {
    CRC_TABLE[(key & 0x0f) as usize]
}

/// Convenience for computing the CRC of a complete byte slice.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.append(bytes);
    crc.value()
}
