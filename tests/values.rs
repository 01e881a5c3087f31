mod common;

use eeprom_tlv::{EepromDomain, EepromTag, EepromTlv};

const SETTINGS: EepromDomain = EepromDomain::new(17);
const IDENTITY: EepromDomain = EepromDomain::new(18);

fn tag(id: u8) -> EepromTag {
    EepromTag::new(SETTINGS, id)
}

mod set {
    use super::*;
    use eeprom_tlv::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitives() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        tlv.set(tag(0), false).unwrap();
        assert_eq!(tlv.get::<bool>(tag(0)).unwrap(), false);
        tlv.set(tag(0), true).unwrap();
        assert_eq!(tlv.get::<bool>(tag(0)).unwrap(), true);

        tlv.set(tag(1), 0xAAu8).unwrap();
        assert_eq!(tlv.get::<u8>(tag(1)).unwrap(), 0xAA);
        tlv.set(tag(2), -100i8).unwrap();
        assert_eq!(tlv.get::<i8>(tag(2)).unwrap(), -100);

        tlv.set(tag(3), 0xAAAAu16).unwrap();
        assert_eq!(tlv.get::<u16>(tag(3)).unwrap(), 0xAAAA);
        tlv.set(tag(4), -30000i16).unwrap();
        assert_eq!(tlv.get::<i16>(tag(4)).unwrap(), -30000);

        tlv.set(tag(5), 0xAAAAAAAAu32).unwrap();
        assert_eq!(tlv.get::<u32>(tag(5)).unwrap(), 0xAAAAAAAA);
        tlv.set(tag(6), -2000000000i32).unwrap();
        assert_eq!(tlv.get::<i32>(tag(6)).unwrap(), -2000000000);

        tlv.set(tag(7), 0xAAAAAAAAAAAAAAAAu64).unwrap();
        assert_eq!(tlv.get::<u64>(tag(7)).unwrap(), 0xAAAAAAAAAAAAAAAA);
        tlv.set(tag(8), -8000000000000000000i64).unwrap();
        assert_eq!(tlv.get::<i64>(tag(8)).unwrap(), -8000000000000000000);

        tlv.set(tag(9), 1.5f32).unwrap();
        assert_eq!(tlv.get::<f32>(tag(9)).unwrap(), 1.5);
        tlv.set(tag(10), -0.25f64).unwrap();
        assert_eq!(tlv.get::<f64>(tag(10)).unwrap(), -0.25);

        assert_eq!(tlv.get::<u8>(tag(11)), Err(Error::EntryNotFound));
    }

    #[test]
    fn value_too_short() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        tlv.set(tag(0), 7u8).unwrap();
        assert_eq!(tlv.get::<u32>(tag(0)), Err(Error::RegionExhausted));
    }

    #[test]
    fn string() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        tlv.set_str(tag(0), "X").unwrap();
        assert_eq!(tlv.get_str(tag(0)).unwrap(), "X");

        tlv.set_str(tag(1), "").unwrap();
        assert_eq!(tlv.get_str(tag(1)).unwrap(), "");

        let long = "ü".repeat(127);
        tlv.set_str(tag(2), &long).unwrap();
        assert_eq!(tlv.get_str(tag(2)).unwrap(), long);

        let too_long = "x".repeat(256);
        assert_eq!(tlv.set_str(tag(3), &too_long), Err(Error::ValueTooLong));
    }

    #[test]
    fn invalid_utf8() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        tlv.set_bytes(tag(0), &[0xff, 0xfe]).unwrap();
        assert_eq!(tlv.get_str(tag(0)), Err(Error::InvalidUtf8));
        assert_eq!(tlv.get_bytes(tag(0)).unwrap(), [0xff, 0xfe]);
    }

    #[test]
    fn bytes() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        let data: Vec<u8> = (0..255u8).collect();
        tlv.set_bytes(tag(0), &data).unwrap();
        assert_eq!(tlv.get_bytes(tag(0)).unwrap(), data);

        assert_eq!(tlv.set_bytes(tag(1), &[0; 256]), Err(Error::ValueTooLong));
        assert_eq!(tlv.get_bytes(tag(1)), Err(Error::EntryNotFound));
    }

    #[test]
    fn no_change() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();
        tlv.set(tag(0), 0x1234u16).unwrap();
        tlv.set_str(tag(1), "unchanged").unwrap();
        drop(tlv);

        let snapshot = eeprom.buf.clone();
        let writes = eeprom.writes();

        let mut tlv = EepromTlv::get_if_valid(&mut eeprom).unwrap();
        tlv.set(tag(0), 0x1234u16).unwrap();
        tlv.set_str(tag(1), "unchanged").unwrap();
        drop(tlv);

        assert_eq!(eeprom.buf, snapshot);
        assert_eq!(eeprom.writes(), writes);
    }

    #[test]
    fn change_of_length_is_written() {
        let mut eeprom = common::Eeprom::new(common::DEFAULT_SIZE);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();
        tlv.set(tag(0), 1u16).unwrap();
        tlv.set(tag(0), 1u32).unwrap();
        tlv.set(tag(0), 2u32).unwrap();

        assert_eq!(tlv.entries().unwrap().len(), 3);
        assert_eq!(tlv.get::<u32>(tag(0)).unwrap(), 2);
    }
}

mod identity {
    use super::*;
    use eeprom_tlv::UUID_SIZE;
    use eeprom_tlv::error::Error;
    use pretty_assertions::assert_eq;
    use uuid::{Uuid, Variant, Version};

    const DEVICE_ID: EepromTag = EepromTag::new(IDENTITY, 1);

    #[test]
    fn write_and_read() {
        let mut eeprom = common::Eeprom::new(128);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        let uuid = Uuid::from_bytes([
            0xa1, 0xa2, 0xa3, 0xa4, 0xb1, 0xb2, 0xc1, 0xc2, 0xd1, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6,
            0xd7, 0xd8,
        ]);
        tlv.write_uuid(DEVICE_ID, &uuid).unwrap();
        assert_eq!(tlv.read_uuid(DEVICE_ID).unwrap(), uuid);
        assert_eq!(
            tlv.read_uuid(DEVICE_ID).unwrap().to_string(),
            "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8"
        );
        assert_eq!(tlv.entries().unwrap()[0].length as usize, UUID_SIZE);
    }

    #[test]
    fn read_or_store() {
        let mut eeprom = common::Eeprom::new(128);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();
        assert_eq!(tlv.read_uuid(DEVICE_ID), Err(Error::EntryNotFound));

        let stored = tlv.read_or_store_uuid(DEVICE_ID, [0x5a; UUID_SIZE]).unwrap();
        assert_eq!(stored.get_version(), Some(Version::Random));
        assert_eq!(stored.get_variant(), Variant::RFC4122);
        assert_eq!(stored.as_bytes()[0], 0x5a);

        // the existing identity wins over new random bytes
        let again = tlv.read_or_store_uuid(DEVICE_ID, [0x00; UUID_SIZE]).unwrap();
        assert_eq!(again, stored);
        assert_eq!(tlv.entries().unwrap().len(), 1);
    }

    #[test]
    fn short_entry() {
        let mut eeprom = common::Eeprom::new(128);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();
        tlv.write_entry_to_cursor(DEVICE_ID, 0, |region| region.write_bytes(&[1, 2, 3]))
            .unwrap();

        assert_eq!(tlv.read_uuid(DEVICE_ID), Err(Error::RegionExhausted));
        assert_eq!(
            tlv.read_or_store_uuid(DEVICE_ID, [0x5a; UUID_SIZE]),
            Err(Error::RegionExhausted)
        );
    }

    #[test]
    fn no_room() {
        let mut eeprom = common::Eeprom::new(28);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();

        assert_eq!(
            tlv.read_or_store_uuid(DEVICE_ID, [0x5a; UUID_SIZE]),
            Err(Error::DirectoryFull)
        );

        // 10 bytes header, 3 bytes entry header, 16 bytes uuid
        let mut eeprom = common::Eeprom::new(29);
        let mut tlv = EepromTlv::clear_and_initialize(&mut eeprom).unwrap();
        assert!(tlv.read_or_store_uuid(DEVICE_ID, [0x5a; UUID_SIZE]).is_ok());
    }
}
