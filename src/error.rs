use thiserror::Error;

/// Errors that can occur while accessing the TLV directory or a region of the storage. The list
/// is marked as non-exhaustive to allow for future additions without breaking the API. Most
/// callers only need to look at [`Error::kind`]: `NotFound` is a normal outcome of a lookup,
/// `DataLoss` means the directory should be re-initialized and `ResourceExhausted` means
/// space has to be reclaimed or data dropped.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The internal error value is returned from the provided `&mut impl Storage`
    #[error("internal storage error")]
    StorageError,

    /// The storage can't even hold the fixed header of the directory.
    #[error("storage too small")]
    DeviceTooSmall,

    /// A partition has to fit into the underlying storage and into the 16-bit address space.
    #[error("invalid partition")]
    InvalidPartition,

    /// The storage doesn't start with the directory prefix, i.e. it was never initialized.
    #[error("prefix missing")]
    PrefixMissing,

    /// The stored end-of-data address lies outside of the storage.
    #[error("end address invalid")]
    EndAddressInvalid,

    /// The stored CRC doesn't match the entries.
    #[error("crc mismatch")]
    CrcMismatch,

    /// Walking the entries doesn't land exactly on the end-of-data address.
    #[error("entries not well formed")]
    NotWellFormed,

    /// No live entry with the requested tag exists.
    #[error("entry not found")]
    EntryNotFound,

    /// Not enough space left for the entry that should be written.
    #[error("directory full")]
    DirectoryFull,

    /// A region read or write would cross the end of the region.
    #[error("region exhausted")]
    RegionExhausted,

    /// The cursor of a region can only be set to `0..=length`.
    #[error("cursor out of range")]
    CursorOutOfRange,

    /// Entries are limited to `MAX_BLOCK_LENGTH` bytes of data, and a read has to fit into the
    /// provided buffer.
    #[error("value too long")]
    ValueTooLong,

    /// Stored string data is not valid UTF-8.
    #[error("invalid utf-8")]
    InvalidUtf8,

    /// A write transaction is still open on this handle.
    #[error("transaction active")]
    TransactionActive,
}

/// Coarse classification of an [`Error`].
#[derive(strum::Display, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    NotFound,
    DataLoss,
    ResourceExhausted,
    FailedPrecondition,
    InvalidArgument,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PrefixMissing | Error::EntryNotFound => ErrorKind::NotFound,
            Error::EndAddressInvalid
            | Error::CrcMismatch
            | Error::NotWellFormed
            | Error::InvalidUtf8 => ErrorKind::DataLoss,
            Error::DirectoryFull | Error::RegionExhausted => ErrorKind::ResourceExhausted,
            Error::TransactionActive | Error::DeviceTooSmall => ErrorKind::FailedPrecondition,
            Error::CursorOutOfRange | Error::ValueTooLong | Error::InvalidPartition => {
                ErrorKind::InvalidArgument
            }
            Error::StorageError => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Shorthand for `self.kind() == ErrorKind::DataLoss`.
    pub fn is_data_loss(&self) -> bool {
        self.kind() == ErrorKind::DataLoss
    }
}
