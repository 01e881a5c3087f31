use crate::EepromAddr;
use crate::tag::EepromTag;

/// Marks an initialized directory at address zero.
pub const PREFIX: [u8; 4] = *b"Tlv!";

pub(crate) const ADDR_OF_PREFIX: EepromAddr = 0;
pub(crate) const ADDR_OF_END: EepromAddr = ADDR_OF_PREFIX + PREFIX.len() as EepromAddr;
pub(crate) const ADDR_OF_CRC: EepromAddr = ADDR_OF_END + size_of::<EepromAddr>() as EepromAddr;

/// Address of the first entry, which is also the size of the fixed directory header.
pub const FIRST_ENTRY_ADDR: EepromAddr = ADDR_OF_CRC + size_of::<u32>() as EepromAddr;

/// Every entry starts with domain, id and the length of its data.
pub const ENTRY_HEADER_SIZE: EepromAddr = 3;

/// The length of the data of an entry is stored in a single byte.
pub const MAX_BLOCK_LENGTH: u8 = u8::MAX;

// The on-device layout is shared with existing firmware and must not move.
const _: () = assert!(ADDR_OF_END == 4, "end pointer must follow the prefix");
const _: () = assert!(ADDR_OF_CRC == 6, "crc must follow the end pointer");
const _: () = assert!(FIRST_ENTRY_ADDR == 10, "entries must follow the crc");
const _: () = assert!(
    size_of::<EntryHeader>() == ENTRY_HEADER_SIZE as usize,
    "entry header must be three bytes"
);

/// Header in front of the data of each entry.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct EntryHeader {
    pub(crate) tag: EepromTag,
    pub(crate) length: u8,
}

impl EntryHeader {
    pub(crate) const fn to_bytes(self) -> [u8; ENTRY_HEADER_SIZE as usize] {
        let tag = self.tag.to_bytes();
        [tag[0], tag[1], self.length]
    }

    pub(crate) const fn from_bytes(bytes: [u8; ENTRY_HEADER_SIZE as usize]) -> Self {
        Self {
            tag: EepromTag::from_bytes([bytes[0], bytes[1]]),
            length: bytes[2],
        }
    }

    /// Number of bytes the entry occupies, including this header.
    pub(crate) const fn stride(&self) -> EepromAddr {
        ENTRY_HEADER_SIZE + self.length as EepromAddr
    }
}
