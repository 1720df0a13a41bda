bitflags::bitflags! {
    /// Status register bits.
    ///
    /// Read fresh for every query: program and erase cycles change it behind
    /// the driver's back.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Status: u8 {
        /// **W**rite **I**n **P**rogress: a program, erase or status write
        /// cycle is still running.
        const WIP = 1 << 0;
        /// Status of the **W**rite **E**nable **L**atch.
        const WEL = 1 << 1;
        /// The 4 block protection bits.
        const BP = 0b0011_1100;
        /// Quad enable.
        const QE = 1 << 6;
        /// **S**tatus **R**egister **W**rite **D**isable bit.
        const SRWD = 1 << 7;
    }
}

pub const STATUS_WIP: u8 = Status::WIP.bits();
pub const STATUS_WEL: u8 = Status::WEL.bits();
pub const STATUS_SRWD: u8 = Status::SRWD.bits();

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Status({=u8:#010b})", self.bits())
    }
}
