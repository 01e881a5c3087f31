#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::{ReadStorage, Storage};
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

/// Size of the EEPROM of an ATmega2560, the default of the host test tools.
pub const DEFAULT_SIZE: usize = 4096;

/// RAM backed EEPROM that records every access and can fail on request.
#[derive(Default)]
pub struct Eeprom {
    pub buf: Vec<u8>,
    pub fail_after_write: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
}

impl Eeprom {
    /// Zero filled, like the memory of a simulated device.
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0u8; size],
            fail_after_write: usize::MAX,
            ..Default::default()
        }
    }

    /// Filled with 0xff, like a factory fresh EEPROM.
    pub fn new_erased(size: usize) -> Self {
        Self {
            buf: vec![0xffu8; size],
            fail_after_write: usize::MAX,
            ..Default::default()
        }
    }

    /// Every write after the first `fail_after_write` ones fails without changing anything,
    /// which simulates a power loss.
    pub fn new_with_fault(size: usize, fail_after_write: usize) -> Self {
        Self {
            buf: vec![0u8; size],
            fail_after_write,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_write = usize::MAX;
    }

    /// Fails every write from now on.
    pub fn fail_writes_now(&mut self) {
        self.fail_after_write = self.writes();
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    pub fn flip_bit(&mut self, bit: usize) {
        self.buf[bit / 8] ^= 1 << (bit % 8);
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug)]
pub struct EepromError;

impl ReadStorage for Eeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        println!(
            "    eeprom: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        let offset = offset as usize;
        if offset + bytes.len() > self.buf.len() {
            println!("    eeprom: OUT OF BOUNDS");
            return Err(EepromError);
        }

        self.operations.push(Operation::Read {
            offset: offset as u32,
            len: bytes.len(),
        });
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        println!(
            "    eeprom: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.writes() >= self.fail_after_write {
            println!("    eeprom: FAULT");
            return Err(EepromError);
        }
        assert!(!bytes.is_empty());

        let offset = offset as usize;
        if offset + bytes.len() > self.buf.len() {
            println!("    eeprom: OUT OF BOUNDS");
            return Err(EepromError);
        }

        self.operations.push(Operation::Write {
            offset: offset as u32,
            len: bytes.len(),
        });
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Gives the test access to an [`Eeprom`] while a directory handle borrows it, e.g. to corrupt
/// the contents behind the handle's back.
#[derive(Clone)]
pub struct Shared(pub Rc<RefCell<Eeprom>>);

impl Shared {
    pub fn new(eeprom: Eeprom) -> Self {
        Self(Rc::new(RefCell::new(eeprom)))
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Eeprom> {
        self.0.borrow_mut()
    }
}

impl ReadStorage for Shared {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.0.borrow_mut().read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.0.borrow().capacity()
    }
}

impl Storage for Shared {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.borrow_mut().write(offset, bytes)
    }
}
