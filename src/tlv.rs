use crate::crc32::Crc32;
use crate::error::Error;
use crate::platform::{ByteOps, Platform};
use crate::raw::{
    ADDR_OF_CRC, ADDR_OF_END, ADDR_OF_PREFIX, ENTRY_HEADER_SIZE, EntryHeader, FIRST_ENTRY_ADDR,
    MAX_BLOCK_LENGTH, PREFIX,
};
use crate::region::{EepromRegion, EepromRegionReader};
use crate::tag::EepromTag;
use crate::EepromAddr;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Entries are copied and checksummed in chunks of this size.
const CHUNK_SIZE: usize = 32;

/// Location of a single entry in the directory, as returned by [`EepromTlv::entries`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EntryInfo {
    pub tag: EepromTag,
    /// Address of the entry header.
    pub address: EepromAddr,
    /// Length of the entry data.
    pub length: u8,
}

impl EntryInfo {
    /// True for removed entries that haven't been reclaimed yet.
    pub fn is_unused(&self) -> bool {
        self.tag.is_unused()
    }

    pub fn data_address(&self) -> EepromAddr {
        self.address + ENTRY_HEADER_SIZE
    }

    /// Address just past the last data byte.
    pub fn end_address(&self) -> EepromAddr {
        self.data_address() + self.length as EepromAddr
    }
}

impl fmt::Display for EntryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{.tag={}, .address={}, .length={}}}",
            self.tag, self.address, self.length
        )
    }
}

/// End of data and entries of a directory, as returned by [`EepromTlv::summary`].
///
/// Displays as `{.end=28, .entries=[{.tag=..}, ..]}`, or with `.entries=(Empty)` for a
/// directory without entries.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Summary {
    pub end: EepromAddr,
    pub entries: Vec<EntryInfo>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{.end={}, .entries=", self.end)?;
        if self.entries.is_empty() {
            f.write_str("(Empty)")?;
        } else {
            f.write_str("[")?;
            for (i, entry) in self.entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{entry}")?;
            }
            f.write_str("]")?;
        }
        f.write_str("}")
    }
}

/// Tag-Length-Value directory stored at the start of a byte addressable storage.
///
/// Layout:
///
/// | offset | size | content                                        |
/// |--------|------|------------------------------------------------|
/// | 0      | 4    | prefix `Tlv!`                                  |
/// | 4      | 2    | end of data, address just past the last entry  |
/// | 6      | 4    | CRC-32 of the bytes from offset 10 to the end  |
/// | 10     |      | entries: domain, id, length, `length` bytes    |
///
/// Entries are appended; the last entry with a tag supersedes all earlier ones. Every operation
/// validates the layout again since the storage may have been modified through another handle.
pub struct EepromTlv<'a, T: Platform> {
    storage: &'a mut T,
    transaction_is_active: bool,
    pub(crate) faulted: bool,
}

impl<'a, T: Platform> EepromTlv<'a, T> {
    /// Returns a handle if the storage holds a valid directory.
    ///
    /// Fails with a `NotFound` kind if the prefix is missing and with a `DataLoss` kind if the
    /// directory is corrupted.
    pub fn get_if_valid(storage: &'a mut T) -> Result<Self, Error> {
        validate(storage, |_| {})?;
        Ok(Self::from_storage(storage))
    }

    /// Creates an empty directory, discarding whatever the storage held before.
    pub fn clear_and_initialize(storage: &'a mut T) -> Result<Self, Error> {
        #[cfg(feature = "debug-logs")]
        println!("tlv: clear_and_initialize {} bytes", storage.length());

        if storage.length() < FIRST_ENTRY_ADDR {
            return Err(Error::DeviceTooSmall);
        }

        storage.write_bytes(ADDR_OF_PREFIX, &PREFIX)?;
        storage.put(ADDR_OF_CRC, Crc32::new().value())?;
        storage.put(ADDR_OF_END, FIRST_ENTRY_ADDR)?;

        Ok(Self::from_storage(storage))
    }

    fn from_storage(storage: &'a mut T) -> Self {
        Self {
            storage,
            transaction_is_active: false,
            faulted: false,
        }
    }

    /// Returns a reader for the data of the live entry with the given tag.
    pub fn find_entry(&mut self, tag: EepromTag) -> Result<EepromRegionReader<'_, T>, Error> {
        if tag.is_unused() {
            return Err(Error::EntryNotFound);
        }

        let mut found = None;
        validate(self.storage, |entry| {
            if entry.tag == tag {
                found = Some(*entry);
            }
        })?;

        match found {
            Some(entry) => {
                #[cfg(feature = "debug-logs")]
                println!("tlv: find_entry {tag} at {}", entry.address);

                Ok(EepromRegionReader::new(
                    self.storage,
                    entry.data_address(),
                    entry.length as EepromAddr,
                ))
            }
            None => Err(Error::EntryNotFound),
        }
    }

    /// Opens a write transaction for a new entry with at least `minimum_size` bytes of data.
    ///
    /// The payload is written through [`Transaction::region`] and becomes visible with
    /// [`Transaction::commit`]. Dropping the transaction without committing leaves the directory
    /// untouched.
    pub fn start_transaction(&mut self, minimum_size: u8) -> Result<Transaction<'_, T>, Error> {
        self.check_writable()?;

        let result = validate(self.storage, |_| {});
        let end = self.latch(result)?;
        let remaining = self.storage.length() - end;
        if remaining < ENTRY_HEADER_SIZE + minimum_size as EepromAddr {
            #[cfg(feature = "defmt")]
            trace!(
                "tlv: {} bytes requested, {} remaining",
                minimum_size,
                remaining
            );

            return Err(Error::DirectoryFull);
        }
        let length = (remaining - ENTRY_HEADER_SIZE).min(MAX_BLOCK_LENGTH as EepromAddr);

        #[cfg(feature = "debug-logs")]
        println!("tlv: start_transaction at {end}, up to {length} bytes");

        self.transaction_is_active = true;
        let Self {
            storage,
            transaction_is_active,
            faulted,
        } = self;

        Ok(Transaction {
            region: EepromRegion::new(&mut **storage, end + ENTRY_HEADER_SIZE, length),
            entry_address: end,
            is_active: transaction_is_active,
            faulted,
        })
    }

    /// Appends an entry whose data is produced by `writer`. The entry is only committed if the
    /// writer succeeds; its length is the cursor position of the region when the writer returns.
    pub fn write_entry_to_cursor<F>(
        &mut self,
        tag: EepromTag,
        minimum_size: u8,
        writer: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut EepromRegion<'_, T>) -> Result<(), Error>,
    {
        let mut transaction = self.start_transaction(minimum_size)?;
        let result = match writer(transaction.region()) {
            Ok(()) => transaction.commit(tag),
            Err(e) => {
                transaction.abort();
                Err(e)
            }
        };
        self.latch(result)
    }

    /// Removes every entry with the given tag, then compacts the directory.
    pub fn remove_entry(&mut self, tag: EepromTag) -> Result<(), Error> {
        self.check_writable()?;
        let result = self.tombstone(tag);
        self.latch(result)?;

        self.reclaim_unused_space()?;
        Ok(())
    }

    fn tombstone(&mut self, tag: EepromTag) -> Result<(), Error> {
        if tag.is_unused() {
            return Err(Error::EntryNotFound);
        }

        let mut matches: Vec<EepromAddr> = Vec::new();
        let end = validate(self.storage, |entry| {
            if entry.tag == tag {
                matches.push(entry.address);
            }
        })?;

        if matches.is_empty() {
            return Err(Error::EntryNotFound);
        }

        #[cfg(feature = "debug-logs")]
        println!("tlv: remove_entry {tag}: {} entries", matches.len());

        for address in matches {
            self.storage
                .write_bytes(address, &EepromTag::TOMBSTONE.to_bytes())?;
        }

        let crc = checksum(self.storage, FIRST_ENTRY_ADDR, end)?;
        self.storage.put(ADDR_OF_CRC, crc)
    }

    /// Drops removed and superseded entries by moving the remaining entries towards the start of
    /// the directory. Returns the number of bytes freed.
    ///
    /// Nothing is written if there is nothing to reclaim. Compaction is not atomic: a power loss
    /// in the middle leaves a directory that fails validation.
    pub fn reclaim_unused_space(&mut self) -> Result<EepromAddr, Error> {
        self.check_writable()?;
        let result = self.compact();
        self.latch(result)
    }

    fn compact(&mut self) -> Result<EepromAddr, Error> {
        let mut entries = Vec::new();
        let end = validate(self.storage, |entry| entries.push(*entry))?;

        let mut last_by_tag = BTreeMap::new();
        for entry in entries.iter().filter(|entry| !entry.is_unused()) {
            last_by_tag.insert(entry.tag, entry.address);
        }

        let is_kept = |entry: &EntryInfo| last_by_tag.get(&entry.tag) == Some(&entry.address);

        if entries.iter().all(is_kept) {
            return Ok(0);
        }

        let mut crc = Crc32::new();
        let mut to = FIRST_ENTRY_ADDR;
        for entry in entries.iter().filter(|entry| is_kept(entry)) {
            let stride = entry.end_address() - entry.address;
            move_bytes(self.storage, entry.address, to, stride, &mut crc)?;
            to += stride;
        }

        #[cfg(feature = "debug-logs")]
        println!("tlv: reclaim_unused_space: end {end} -> {to}");

        self.storage.put(ADDR_OF_CRC, crc.value())?;
        self.storage.put(ADDR_OF_END, to)?;

        Ok(end - to)
    }

    /// Number of bytes available for additional data, i.e. what is left after the header of one
    /// more entry. A single entry holds at most [`MAX_BLOCK_LENGTH`] of them.
    pub fn available(&mut self) -> Result<EepromAddr, Error> {
        let end = validate(self.storage, |_| {})?;
        Ok((self.storage.length() - end).saturating_sub(ENTRY_HEADER_SIZE))
    }

    /// Address just past the last entry.
    pub fn end_address(&mut self) -> Result<EepromAddr, Error> {
        validate(self.storage, |_| {})
    }

    /// All entries in the order they were written, including removed and superseded ones.
    pub fn entries(&mut self) -> Result<Vec<EntryInfo>, Error> {
        let mut entries = Vec::new();
        validate(self.storage, |entry| entries.push(*entry))?;
        Ok(entries)
    }

    /// Snapshot of the directory for diagnostic output, see [`Summary`].
    pub fn summary(&mut self) -> Result<Summary, Error> {
        let mut entries = Vec::new();
        let end = validate(self.storage, |entry| entries.push(*entry))?;
        Ok(Summary { end, entries })
    }

    pub(crate) fn check_writable(&self) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::StorageError);
        }
        if self.transaction_is_active {
            return Err(Error::TransactionActive);
        }
        Ok(())
    }

    /// Refuses all further modifications once the storage failed.
    fn latch<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(Error::StorageError) = result {
            #[cfg(feature = "defmt")]
            warn!("tlv: storage error, refusing further writes");

            self.faulted = true;
        }
        result
    }
}

/// A write in progress, see [`EepromTlv::start_transaction`].
pub struct Transaction<'t, T: Platform> {
    region: EepromRegion<'t, T>,
    entry_address: EepromAddr,
    is_active: &'t mut bool,
    faulted: &'t mut bool,
}

impl<'t, T: Platform> Transaction<'t, T> {
    /// Region for the entry data, starting just past the entry header.
    pub fn region(&mut self) -> &mut EepromRegion<'t, T> {
        &mut self.region
    }

    /// Makes everything up to the cursor of the region visible as an entry with the given tag.
    ///
    /// Header and data are written first; the checksum and the end of data follow. A power loss
    /// before the checksum is written leaves the directory as it was.
    pub fn commit(mut self, tag: EepromTag) -> Result<(), Error> {
        let result = self.write_entry(tag);
        if let Err(Error::StorageError) = result {
            *self.faulted = true;
        }
        result
    }

    fn write_entry(&mut self, tag: EepromTag) -> Result<(), Error> {
        let length = self.region.cursor();
        let header = EntryHeader {
            tag,
            length: u8::try_from(length).map_err(|_| Error::ValueTooLong)?,
        };

        #[cfg(feature = "debug-logs")]
        println!(
            "tlv: commit {tag} at {}, {length} bytes",
            self.entry_address
        );

        let address = self.entry_address;
        let storage = self.region.storage_mut();
        storage.write_bytes(address, &header.to_bytes())?;

        let mut crc = Crc32::with_value(storage.get(ADDR_OF_CRC)?);
        crc.append(&header.to_bytes());
        append_checksum(storage, address + ENTRY_HEADER_SIZE, length, &mut crc)?;

        storage.put(ADDR_OF_CRC, crc.value())?;
        storage.put(ADDR_OF_END, address + header.stride())
    }

    /// Discards the transaction, same as dropping it.
    pub fn abort(self) {
        #[cfg(feature = "debug-logs")]
        println!("tlv: abort at {}", self.entry_address);
    }
}

impl<T: Platform> Drop for Transaction<'_, T> {
    fn drop(&mut self) {
        *self.is_active = false;
    }
}

/// Checks prefix, end of data, checksum and that the entries end exactly at the end of data, in
/// this order. `visit` sees every entry. Returns the end of data.
fn validate<T: Platform>(
    storage: &mut T,
    mut visit: impl FnMut(&EntryInfo),
) -> Result<EepromAddr, Error> {
    let length = storage.length();
    if length < FIRST_ENTRY_ADDR {
        return Err(Error::PrefixMissing);
    }

    let mut prefix = [0u8; PREFIX.len()];
    storage.read_into(ADDR_OF_PREFIX, &mut prefix)?;
    if prefix != PREFIX {
        return Err(Error::PrefixMissing);
    }

    let end: EepromAddr = storage.get(ADDR_OF_END)?;
    if end < FIRST_ENTRY_ADDR || end > length {
        #[cfg(feature = "defmt")]
        warn!(
            "tlv: end of data {} outside of {}..={}",
            end,
            FIRST_ENTRY_ADDR,
            length
        );
        #[cfg(feature = "debug-logs")]
        println!("tlv: end of data {end} outside of {FIRST_ENTRY_ADDR}..={length}");

        return Err(Error::EndAddressInvalid);
    }

    let stored: u32 = storage.get(ADDR_OF_CRC)?;
    let computed = checksum(storage, FIRST_ENTRY_ADDR, end)?;
    if stored != computed {
        #[cfg(feature = "defmt")]
        warn!(
            "tlv: crc mismatch: stored {:#x}, computed {:#x}",
            stored,
            computed
        );
        #[cfg(feature = "debug-logs")]
        println!("tlv: crc mismatch: stored {stored:#x}, computed {computed:#x}");

        return Err(Error::CrcMismatch);
    }

    let mut address = FIRST_ENTRY_ADDR;
    while address < end {
        if end - address < ENTRY_HEADER_SIZE {
            #[cfg(feature = "defmt")]
            warn!("tlv: truncated entry header at {}", address);

            return Err(Error::NotWellFormed);
        }

        let mut raw = [0u8; ENTRY_HEADER_SIZE as usize];
        storage.read_into(address, &mut raw)?;
        let header = EntryHeader::from_bytes(raw);

        if header.stride() > end - address {
            #[cfg(feature = "defmt")]
            warn!("tlv: entry at {} runs past the end of data", address);

            return Err(Error::NotWellFormed);
        }

        visit(&EntryInfo {
            tag: header.tag,
            address,
            length: header.length,
        });
        address += header.stride();
    }

    Ok(end)
}

fn checksum<T: Platform>(
    storage: &mut T,
    from: EepromAddr,
    to: EepromAddr,
) -> Result<u32, Error> {
    let mut crc = Crc32::new();
    append_checksum(storage, from, to - from, &mut crc)?;
    Ok(crc.value())
}

fn append_checksum<T: Platform>(
    storage: &mut T,
    address: EepromAddr,
    length: EepromAddr,
    crc: &mut Crc32,
) -> Result<(), Error> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut offset = 0;
    while offset < length {
        let chunk = ((length - offset) as usize).min(CHUNK_SIZE);
        storage.read_into(address + offset, &mut buf[..chunk])?;
        crc.append(&buf[..chunk]);
        offset += chunk as EepromAddr;
    }
    Ok(())
}

/// Copies `length` bytes from `from` down to `to` (`to <= from`) and adds them to `crc`.
fn move_bytes<T: Platform>(
    storage: &mut T,
    from: EepromAddr,
    to: EepromAddr,
    length: EepromAddr,
    crc: &mut Crc32,
) -> Result<(), Error> {
    debug_assert!(to <= from);

    let mut buf = [0u8; CHUNK_SIZE];
    let mut offset = 0;
    while offset < length {
        let chunk = ((length - offset) as usize).min(CHUNK_SIZE);
        storage.read_into(from + offset, &mut buf[..chunk])?;
        if from != to {
            storage.write_bytes(to + offset, &buf[..chunk])?;
        }
        crc.append(&buf[..chunk]);
        offset += chunk as EepromAddr;
    }
    Ok(())
}
