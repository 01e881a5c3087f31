use crate::error::Error;
use crate::platform::Platform;
use crate::tag::EepromTag;
use crate::tlv::EepromTlv;
use uuid::{Builder, Uuid};

/// Number of data bytes of a UUID entry.
pub const UUID_SIZE: usize = 16;

impl<T: Platform> EepromTlv<'_, T> {
    /// Reads the UUID stored under `tag`. Entries shorter than [`UUID_SIZE`] fail with
    /// [`Error::RegionExhausted`].
    pub fn read_uuid(&mut self, tag: EepromTag) -> Result<Uuid, Error> {
        let mut region = self.find_entry(tag)?;
        let mut bytes = [0u8; UUID_SIZE];
        region.read_bytes(&mut bytes)?;
        Ok(Uuid::from_bytes(bytes))
    }

    pub fn write_uuid(&mut self, tag: EepromTag, uuid: &Uuid) -> Result<(), Error> {
        self.write_entry_to_cursor(tag, UUID_SIZE as u8, |region| {
            region.write_bytes(uuid.as_bytes())
        })
    }

    /// Returns the UUID stored under `tag`. If there is none yet, a version 4 UUID is built from
    /// `random_bytes`, stored and read back.
    ///
    /// Device identities are created this way on first boot and stay stable afterwards.
    pub fn read_or_store_uuid(
        &mut self,
        tag: EepromTag,
        random_bytes: [u8; UUID_SIZE],
    ) -> Result<Uuid, Error> {
        match self.read_uuid(tag) {
            Err(Error::EntryNotFound) => {}
            other => return other,
        }

        let uuid = Builder::from_random_bytes(random_bytes).into_uuid();

        #[cfg(feature = "debug-logs")]
        println!("uuid: storing new {uuid} as {tag}");

        self.write_uuid(tag, &uuid)?;
        self.read_uuid(tag)
    }
}
