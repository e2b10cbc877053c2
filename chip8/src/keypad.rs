//! Hexadecimal keypad input.
use std::fmt;

use crate::constants::KEY_COUNT;

/// One of the 16 keys on the COSMAC VIP hex keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    pub const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0,
        Self::Key1,
        Self::Key2,
        Self::Key3,
        Self::Key4,
        Self::Key5,
        Self::Key6,
        Self::Key7,
        Self::Key8,
        Self::Key9,
        Self::KeyA,
        Self::KeyB,
        Self::KeyC,
        Self::KeyD,
        Self::KeyE,
        Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Parse a hexadecimal digit, as printed on the keypad.
    pub fn from_char(c: char) -> Result<Self, InvalidKeyCode> {
        match c.to_digit(16) {
            Some(d) => Self::try_from(d as u8),
            None => Err(InvalidKeyCode(KEY_COUNT)),
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode(key_id))
    }
}

/// Key identifier outside of the keypad range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidKeyCode(pub u8);

impl std::error::Error for InvalidKeyCode {}

impl fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "keycode must be in range 0 <= keycode < {KEY_COUNT}, got {}",
            self.0
        )
    }
}
