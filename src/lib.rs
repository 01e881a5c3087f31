#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod crc32;
pub mod error;
pub mod platform;
mod raw;
pub mod region;
pub mod tag;
mod tlv;
mod uuid_entry;
pub mod value;

extern crate alloc;

/// Addresses and lengths within the storage. 16 bits are plenty for the few KB of EEPROM
/// found on microcontrollers.
pub type EepromAddr = u16;

/// The highest usable address; NOT `u16::MAX` so that `start + length` of any region is
/// still representable.
pub const MAX_ADDRESS: EepromAddr = 65534;

pub use crc32::Crc32;
pub use error::{Error, ErrorKind};
pub use raw::{ENTRY_HEADER_SIZE, FIRST_ENTRY_ADDR, MAX_BLOCK_LENGTH, PREFIX};
pub use region::{EepromRegion, EepromRegionReader};
pub use tag::{DomainRegistration, DomainRegistry, EepromDomain, EepromTag};
pub use tlv::{EepromTlv, EntryInfo, Summary, Transaction};
pub use uuid_entry::UUID_SIZE;
pub use value::RegionValue;
