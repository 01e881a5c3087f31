//! The `RegionValue` trait describes the fixed-width values that can be read from and written to
//! a region. All of them are stored little endian, independent of the target.
//!
//! [`EepromTlv::get`] and [`EepromTlv::set`] store a single value as an entry of its own.

use crate::error::Error;
use crate::platform::Platform;
use crate::region::EepromRegionReader;
use crate::tag::EepromTag;
use crate::tlv::EepromTlv;
use alloc::string::String;
use alloc::vec::Vec;

/// A fixed-width value with a defined byte representation in the storage.
pub trait RegionValue: Sized {
    /// `[u8; N]` with `N` being the stored size of the value.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    fn to_bytes(&self) -> Self::Bytes;

    fn from_bytes(bytes: Self::Bytes) -> Self;

    /// Number of bytes the value occupies in the storage.
    fn size() -> usize {
        Self::Bytes::default().as_ref().len()
    }
}

macro_rules! impl_region_value {
    ($($t:ty),*) => {
        $(
            impl RegionValue for $t {
                type Bytes = [u8; size_of::<$t>()];

                fn to_bytes(&self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                fn from_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_region_value!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Stored as a single byte; anything but zero reads back as `true`.
impl RegionValue for bool {
    type Bytes = [u8; 1];

    fn to_bytes(&self) -> Self::Bytes {
        [*self as u8]
    }

    fn from_bytes(bytes: Self::Bytes) -> Self {
        bytes[0] != 0
    }
}

impl<T: Platform> EepromTlv<'_, T> {
    /// Reads a value stored with [`EepromTlv::set`].
    pub fn get<V: RegionValue>(&mut self, tag: EepromTag) -> Result<V, Error> {
        self.find_entry(tag)?.read()
    }

    /// Stores a value as an entry of its own. Nothing is written if the entry already holds the
    /// same value.
    pub fn set<V: RegionValue>(&mut self, tag: EepromTag, value: V) -> Result<(), Error> {
        self.set_bytes(tag, value.to_bytes().as_ref())
    }

    pub fn get_bytes(&mut self, tag: EepromTag) -> Result<Vec<u8>, Error> {
        self.find_entry(tag)?.read_to_end()
    }

    /// Stores up to [`MAX_BLOCK_LENGTH`](crate::MAX_BLOCK_LENGTH) bytes as an entry. Nothing is written if the entry
    /// already holds the same bytes.
    pub fn set_bytes(&mut self, tag: EepromTag, data: &[u8]) -> Result<(), Error> {
        self.check_writable()?;

        let length = u8::try_from(data.len()).map_err(|_| Error::ValueTooLong)?;

        let unchanged = match self.find_entry(tag) {
            Ok(mut region) => holds(&mut region, data)?,
            Err(_) => false,
        };
        if unchanged {
            #[cfg(feature = "debug-logs")]
            println!("value: {tag} unchanged");

            return Ok(());
        }

        self.write_entry_to_cursor(tag, length, |region| region.write_bytes(data))
    }

    pub fn get_str(&mut self, tag: EepromTag) -> Result<String, Error> {
        let bytes = self.get_bytes(tag)?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    pub fn set_str(&mut self, tag: EepromTag, value: &str) -> Result<(), Error> {
        self.set_bytes(tag, value.as_bytes())
    }
}

/// True if the region holds exactly `data`.
fn holds<T: Platform>(region: &mut EepromRegionReader<'_, T>, data: &[u8]) -> Result<bool, Error> {
    if region.length() as usize != data.len() {
        return Ok(false);
    }

    let mut buf = [0u8; 16];
    for chunk in data.chunks(buf.len()) {
        let current = &mut buf[..chunk.len()];
        region.read_bytes(current)?;
        if current != chunk {
            return Ok(false);
        }
    }
    Ok(true)
}
