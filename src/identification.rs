/// JEDEC identification returned by the Read JEDEC ID (9Fh) instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identification {
    manufacturer_id: u8,
    device_id: [u8; 2],
}

impl Identification {
    /// ISSI IS25LQ080.
    pub const EXPECTED: Self = Self::new(0x9D, 0x13, 0x44);

    pub const fn new(manufacturer_id: u8, device_id1: u8, device_id2: u8) -> Self {
        Self {
            manufacturer_id,
            device_id: [device_id1, device_id2],
        }
    }

    /// Builds the identification from the bytes following the opcode slot.
    /// Missing bytes read as 0.
    pub fn from_jedec_id(bytes: &[u8]) -> Self {
        let byte = |i: usize| bytes.get(i).copied().unwrap_or(0);
        Self::new(byte(0), byte(1), byte(2))
    }

    pub const fn manufacturer_id(&self) -> u8 {
        self.manufacturer_id
    }

    pub const fn device_id(&self) -> [u8; 2] {
        self.device_id
    }

    /// Whether this is the chip the driver targets.
    pub fn is_expected(&self) -> bool {
        *self == Self::EXPECTED
    }
}
