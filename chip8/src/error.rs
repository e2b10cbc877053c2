//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::{constants::MAX_PROGRAM_SIZE, keypad::InvalidKeyCode};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    RomTooLarge { size: usize },
    /// `CALL` with every stack slot in use.
    StackOverflow,
    /// `RET` with an empty stack.
    StackUnderflow,
    /// Fetch, load or store outside of the 4KB address space.
    AddressOutOfRange { address: usize },
    /// Keypad index outside of 0x0-0xF.
    InvalidKey(InvalidKeyCode),
}

impl Chip8Error {
    /// Errors that end the current session.
    ///
    /// A rejected ROM load leaves the machine untouched, so the host
    /// can try another image.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StackOverflow | Self::StackUnderflow | Self::AddressOutOfRange { .. }
        )
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RomTooLarge { size } => write!(
                f,
                "program of {size} bytes too large for VM memory, maximum is {MAX_PROGRAM_SIZE}"
            ),
            Self::StackOverflow => write!(f, "call stack overflow"),
            Self::StackUnderflow => write!(f, "call stack underflow"),
            Self::AddressOutOfRange { address } => {
                write!(f, "address 0x{address:04X} out of range")
            }
            Self::InvalidKey(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<InvalidKeyCode> for Chip8Error {
    fn from(err: InvalidKeyCode) -> Self {
        Chip8Error::InvalidKey(err)
    }
}

/// Convenience for addresses held in the 16-bit registers.
#[inline]
pub(crate) fn out_of_range(address: impl Into<usize>) -> Chip8Error {
    Chip8Error::AddressOutOfRange {
        address: address.into(),
    }
}
