//! Bounded, cursor based views of a part of the storage.
//!
//! A region covers the addresses `[start_address, start_address + length)`. Reads and writes
//! happen at the cursor, which is an offset from the start of the region and advances with
//! every successful operation. All operations are all-or-nothing: either the requested number of
//! bytes is transferred and the cursor moves by exactly that amount, or nothing is transferred,
//! the cursor stays where it is and [`Error::RegionExhausted`] is returned.

use crate::error::Error;
use crate::platform::{ByteOps, Platform};
use crate::value::RegionValue;
use crate::{EepromAddr, MAX_ADDRESS};
use core::fmt;
use core::ops::{Deref, DerefMut};
#[cfg(feature = "defmt")]
use defmt::trace;

/// Read-only view of a part of the storage, e.g. of the data of a directory entry.
pub struct EepromRegionReader<'a, T: Platform> {
    storage: &'a mut T,
    start_address: EepromAddr,
    length: EepromAddr,
    cursor: EepromAddr,
}

impl<'a, T: Platform> EepromRegionReader<'a, T> {
    /// Panics if the region reaches beyond [`MAX_ADDRESS`] or beyond the end of the storage.
    pub fn new(storage: &'a mut T, start_address: EepromAddr, length: EepromAddr) -> Self {
        let end = start_address as u32 + length as u32;
        assert!(end <= MAX_ADDRESS as u32, "region overflows the address space");
        assert!(
            end <= storage.length() as u32,
            "region reaches beyond the end of the storage"
        );

        Self {
            storage,
            start_address,
            length,
            cursor: 0,
        }
    }

    pub fn start_address(&self) -> EepromAddr {
        self.start_address
    }

    pub fn length(&self) -> EepromAddr {
        self.length
    }

    /// Offset of the next read or write, in the range `0..=length`.
    pub fn cursor(&self) -> EepromAddr {
        self.cursor
    }

    pub fn available(&self) -> EepromAddr {
        self.length - self.cursor
    }

    /// Moves the cursor; `length` is allowed and marks the region as fully consumed.
    pub fn set_cursor(&mut self, cursor: EepromAddr) -> Result<(), Error> {
        if cursor > self.length {
            return Err(Error::CursorOutOfRange);
        }
        self.cursor = cursor;
        Ok(())
    }

    /// Shrinks the region to nothing, so that every further read or write fails.
    pub fn invalidate(&mut self) {
        self.cursor = 0;
        self.length = 0;
    }

    pub fn read<V: RegionValue>(&mut self) -> Result<V, Error> {
        let address = self.reserve(V::size())?;
        let value = self.storage.get(address)?;
        self.cursor += V::size() as EepromAddr;
        Ok(value)
    }

    pub fn read_into<V: RegionValue>(&mut self, output: &mut V) -> Result<(), Error> {
        *output = self.read()?;
        Ok(())
    }

    /// Fills `buf` completely.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let address = self.reserve(buf.len())?;
        self.storage.read_into(address, buf)?;
        self.cursor += buf.len() as EepromAddr;
        Ok(())
    }

    /// Reads `length` bytes of UTF-8 into the front of `buf`. The cursor doesn't move if the
    /// bytes aren't valid UTF-8.
    pub fn read_str<'b>(&mut self, buf: &'b mut [u8], length: usize) -> Result<&'b str, Error> {
        if length > buf.len() {
            return Err(Error::ValueTooLong);
        }

        let cursor = self.cursor;
        self.read_bytes(&mut buf[..length])?;
        match core::str::from_utf8(&buf[..length]) {
            Ok(s) => Ok(s),
            Err(_) => {
                self.cursor = cursor;
                Err(Error::InvalidUtf8)
            }
        }
    }

    /// Reads everything from the cursor to the end of the region.
    pub fn read_to_end(&mut self) -> Result<alloc::vec::Vec<u8>, Error> {
        let mut buf = alloc::vec![0u8; self.available() as usize];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    /// Returns the absolute address of the cursor if `len` more bytes fit into the region.
    fn reserve(&self, len: usize) -> Result<EepromAddr, Error> {
        if len > self.available() as usize {
            #[cfg(feature = "defmt")]
            trace!(
                "region: {} bytes requested, {} available",
                len,
                self.available()
            );

            return Err(Error::RegionExhausted);
        }
        Ok(self.start_address + self.cursor)
    }
}

impl<T: Platform> fmt::Display for EepromRegionReader<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{.start={}, .length={}, .cursor={}, .available={}}}",
            self.start_address,
            self.length,
            self.cursor,
            self.available()
        )
    }
}

impl<T: Platform> fmt::Debug for EepromRegionReader<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EepromRegionReader")
            .field("start_address", &self.start_address)
            .field("length", &self.length)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Writable view of a part of the storage. All reading operations of [`EepromRegionReader`]
/// are available through `Deref`.
pub struct EepromRegion<'a, T: Platform> {
    reader: EepromRegionReader<'a, T>,
}

impl<'a, T: Platform> EepromRegion<'a, T> {
    /// Panics if the region reaches beyond [`MAX_ADDRESS`] or beyond the end of the storage.
    pub fn new(storage: &'a mut T, start_address: EepromAddr, length: EepromAddr) -> Self {
        Self {
            reader: EepromRegionReader::new(storage, start_address, length),
        }
    }

    /// The whole storage as one region.
    pub fn full(storage: &'a mut T) -> Self {
        let length = storage.length();
        Self::new(storage, 0, length)
    }

    /// Writes `value` at the cursor, skipping bytes that already hold the same value.
    pub fn write<V: RegionValue>(&mut self, value: V) -> Result<(), Error> {
        let address = self.reader.reserve(V::size())?;
        self.reader.storage.put(address, value)?;
        self.reader.cursor += V::size() as EepromAddr;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let address = self.reader.reserve(bytes.len())?;
        self.reader.storage.write_bytes(address, bytes)?;
        self.reader.cursor += bytes.len() as EepromAddr;
        Ok(())
    }

    /// Writes the bytes of `s` without any terminator or length; the reader has to know the
    /// length in some other way, e.g. from the length of the entry.
    pub fn write_str(&mut self, s: &str) -> Result<(), Error> {
        self.write_bytes(s.as_bytes())
    }

    pub(crate) fn storage_mut(&mut self) -> &mut T {
        &mut *self.reader.storage
    }
}

impl<'a, T: Platform> Deref for EepromRegion<'a, T> {
    type Target = EepromRegionReader<'a, T>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl<T: Platform> DerefMut for EepromRegion<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.reader
    }
}

impl<T: Platform> fmt::Display for EepromRegion<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.reader, f)
    }
}

impl<T: Platform> fmt::Debug for EepromRegion<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EepromRegion")
            .field("start_address", &self.reader.start_address)
            .field("length", &self.reader.length)
            .field("cursor", &self.reader.cursor)
            .finish()
    }
}
