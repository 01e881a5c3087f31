use crate::error::Error;
use crate::value::RegionValue;
use crate::{EepromAddr, MAX_ADDRESS};
use embedded_storage::{ReadStorage, Storage};

/// Any byte addressable storage, e.g. an EEPROM driver or a [`Partition`] of a flash chip.
/// The directory assumes that writes of a single byte are atomic and that reads return the
/// last written value.
pub trait Platform: Storage {}

impl<T: Storage> Platform for T {}

/// Byte level helpers on top of [`Storage`]; every storage error is mapped to
/// [`Error::StorageError`].
pub(crate) trait ByteOps: Platform {
    /// Usable length of the storage, never more than [`MAX_ADDRESS`].
    fn length(&self) -> EepromAddr {
        self.capacity().min(MAX_ADDRESS as usize) as EepromAddr
    }

    fn read_byte(&mut self, address: EepromAddr) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.read_into(address, &mut buf)?;
        Ok(buf[0])
    }

    fn read_into(&mut self, address: EepromAddr, buf: &mut [u8]) -> Result<(), Error> {
        if buf.is_empty() {
            return Ok(());
        }
        self.read(address as u32, buf)
            .map_err(|_| Error::StorageError)
    }

    fn write_bytes(&mut self, address: EepromAddr, bytes: &[u8]) -> Result<(), Error> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.write(address as u32, bytes)
            .map_err(|_| Error::StorageError)
    }

    /// Writes `bytes` only if the storage holds something different, which saves write cycles
    /// on an EEPROM.
    fn update_bytes(&mut self, address: EepromAddr, bytes: &[u8]) -> Result<(), Error> {
        let mut current = [0u8; 8];
        let mut offset = 0;
        let mut differs = false;
        while offset < bytes.len() && !differs {
            let chunk = (bytes.len() - offset).min(current.len());
            self.read_into(address + offset as EepromAddr, &mut current[..chunk])?;
            differs = current[..chunk] != bytes[offset..offset + chunk];
            offset += chunk;
        }

        if differs {
            self.write_bytes(address, bytes)
        } else {
            Ok(())
        }
    }

    fn get<V: RegionValue>(&mut self, address: EepromAddr) -> Result<V, Error> {
        let mut bytes = V::Bytes::default();
        self.read_into(address, bytes.as_mut())?;
        Ok(V::from_bytes(bytes))
    }

    fn put<V: RegionValue>(&mut self, address: EepromAddr, value: V) -> Result<(), Error> {
        self.update_bytes(address, value.to_bytes().as_ref())
    }
}

impl<T: Platform> ByteOps for T {}

/// Errors of a [`Partition`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartitionError<E> {
    /// The access would cross the end of the partition.
    OutOfBounds,
    /// Error of the underlying storage.
    Storage(E),
}

/// Exposes the window `[offset, offset + size)` of a larger storage as a storage of its own,
/// starting at address zero. This allows hosting the directory in a partition of a flash chip.
pub struct Partition<S> {
    inner: S,
    offset: u32,
    size: EepromAddr,
}

impl<S: ReadStorage> Partition<S> {
    pub fn new(inner: S, offset: u32, size: usize) -> Result<Self, Error> {
        if size > MAX_ADDRESS as usize {
            return Err(Error::InvalidPartition);
        }

        let end = (offset as usize).checked_add(size);
        if end.is_none_or(|end| end > inner.capacity()) {
            return Err(Error::InvalidPartition);
        }

        Ok(Self {
            inner,
            offset,
            size: size as EepromAddr,
        })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn translate(&self, offset: u32, len: usize) -> Result<u32, PartitionError<S::Error>> {
        if offset as usize + len > self.size as usize {
            return Err(PartitionError::OutOfBounds);
        }
        Ok(self.offset + offset)
    }
}

impl<S: ReadStorage> ReadStorage for Partition<S> {
    type Error = PartitionError<S::Error>;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.translate(offset, bytes.len())?;
        self.inner
            .read(offset, bytes)
            .map_err(PartitionError::Storage)
    }

    fn capacity(&self) -> usize {
        self.size as usize
    }
}

impl<S: Storage> Storage for Partition<S> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = self.translate(offset, bytes.len())?;
        self.inner
            .write(offset, bytes)
            .map_err(PartitionError::Storage)
    }
}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
mod chip {
    use esp_storage::FlashStorage;

    use crate::platform::Partition;

    /// A partition of the ESP flash used in place of an EEPROM. `FlashStorage` takes care of
    /// the read-modify-erase-write cycle for single byte updates.
    pub type EspEeprom<'d> = Partition<FlashStorage<'d>>;
}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
pub use chip::*;
