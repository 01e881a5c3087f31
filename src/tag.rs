//! Names of directory entries.
//!
//! The `domain` of an [`EepromTag`] gives each subsystem (e.g. a network driver or a device
//! implementation) an identifier that is distinct from the domain used by all other pieces of
//! code. Within its domain a subsystem is free to choose the `id`s, e.g. one per optional
//! attribute or one per I/O channel.
//!
//! Domains 0 and 255 are reserved: erased storage reads back as one of those two values and
//! the tombstones of deleted entries are built from them.
//!
//! Uniqueness of the domains used by a firmware is checked with a [`DomainRegistry`]:
//!
//! ```
//! use eeprom_tlv::{DomainRegistration, DomainRegistry, EepromDomain};
//!
//! const NETWORK: EepromDomain = EepromDomain::new(1);
//! const TELESCOPE: EepromDomain = EepromDomain::new(2);
//!
//! // fails to compile if a domain is registered twice
//! const DOMAINS: DomainRegistry = DomainRegistry::new(&[
//!     DomainRegistration::new(NETWORK, "network"),
//!     DomainRegistration::new(TELESCOPE, "telescope"),
//! ]);
//!
//! assert_eq!(DOMAINS.owner(TELESCOPE), Some("telescope"));
//! ```

use core::fmt;

const RESERVED_LOW: u8 = 0;
const RESERVED_HIGH: u8 = u8::MAX;

/// Namespace of a set of tags; 1 to 254 are valid.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EepromDomain(u8);

impl EepromDomain {
    /// Creates a domain for use in tags.
    ///
    /// Tip: use a const context so that a reserved value is rejected at compile time:
    ///   `const MY_DOMAIN: EepromDomain = EepromDomain::new(17);`
    pub const fn new(value: u8) -> Self {
        assert!(!is_reserved_value(value), "domains 0 and 255 are reserved");
        Self(value)
    }

    /// Domains read back from the storage may be anything, including the reserved values.
    pub(crate) const fn from_raw(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_reserved(self) -> bool {
        is_reserved_value(self.0)
    }
}

const fn is_reserved_value(value: u8) -> bool {
    value == RESERVED_LOW || value == RESERVED_HIGH
}

/// Identifies a single entry in the directory.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EepromTag {
    pub domain: EepromDomain,
    pub id: u8,
}

impl EepromTag {
    /// Written over the tag of a removed entry.
    pub(crate) const TOMBSTONE: EepromTag = EepromTag {
        domain: EepromDomain::from_raw(RESERVED_LOW),
        id: RESERVED_HIGH,
    };

    pub const fn new(domain: EepromDomain, id: u8) -> Self {
        Self { domain, id }
    }

    /// True for the two tombstone values `{0, 255}` and `{255, 0}`, which never name live data.
    pub const fn is_unused(&self) -> bool {
        (self.domain.0 == RESERVED_LOW && self.id == RESERVED_HIGH)
            || (self.domain.0 == RESERVED_HIGH && self.id == RESERVED_LOW)
    }

    pub(crate) const fn to_bytes(self) -> [u8; 2] {
        [self.domain.0, self.id]
    }

    pub(crate) const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            domain: EepromDomain::from_raw(bytes[0]),
            id: bytes[1],
        }
    }
}

impl fmt::Display for EepromTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{.domain={}, .id={}}}", self.domain.0, self.id)
    }
}

/// Records which subsystem owns a domain.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DomainRegistration {
    pub domain: EepromDomain,
    pub owner: &'static str,
}

impl DomainRegistration {
    pub const fn new(domain: EepromDomain, owner: &'static str) -> Self {
        Self { domain, owner }
    }
}

/// The set of domains used by a firmware, with every domain registered at most once.
#[derive(Copy, Clone, Debug)]
pub struct DomainRegistry<'r> {
    registrations: &'r [DomainRegistration],
}

impl<'r> DomainRegistry<'r> {
    /// Panics if two registrations share a domain value; in a const context that is a compile
    /// error.
    pub const fn new(registrations: &'r [DomainRegistration]) -> Self {
        if Self::find_collision(registrations).is_some() {
            panic!("domain registered more than once");
        }
        Self { registrations }
    }

    /// Returns the indices of the first two registrations with the same domain.
    pub const fn find_collision(registrations: &[DomainRegistration]) -> Option<(usize, usize)> {
        let mut i = 0;
        while i < registrations.len() {
            let mut j = i + 1;
            while j < registrations.len() {
                if registrations[i].domain.0 == registrations[j].domain.0 {
                    return Some((i, j));
                }
                j += 1;
            }
            i += 1;
        }
        None
    }

    pub fn owner(&self, domain: EepromDomain) -> Option<&'static str> {
        self.registrations
            .iter()
            .find(|registration| registration.domain == domain)
            .map(|registration| registration.owner)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainRegistration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
