//! Schema checksum
//!
//! CRC-16 with polynomial 0x3D65, processed MSB first with no reflection and
//! no final xor. The schema checksum seeds the register with the protocol
//! version.

use crc::{Algorithm, Crc};

/// Protocol version; also the checksum carried by schema-transfer requests
pub const PROTOCOL_VERSION: u16 = 1;

pub const CRC16_POLYNOMIAL: u16 = 0x3d65;

/// CRC parameters of the schema checksum
pub const SCHEMA_CRC: Algorithm<u16> = Algorithm {
    width: 16,
    poly: CRC16_POLYNOMIAL,
    init: PROTOCOL_VERSION,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0xb0bc,
    residue: 0x0000,
};

const CRC16: Crc<u16> = Crc::<u16>::new(&SCHEMA_CRC);

/// Run `data` through the CRC register starting from `init`
pub fn crc16(init: u16, data: &[u8]) -> u16 {
    let mut digest = CRC16.digest_with_initial(init);
    digest.update(data);
    digest.finalize()
}

/// Checksum over the raw schema bytes, included in every frame
pub fn schema_checksum(schema: &[u8]) -> u16 {
    CRC16.checksum(schema)
}
