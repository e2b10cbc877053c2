//! Instruction decoding.
//!
//! Each instruction is two bytes, big endian, with the opcode identity
//! in the first 4-bit nibble.
use std::fmt;

use crate::constants::Address;

/// Extract the opcode family from the top nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand NNN, a 12-bit address.
#[inline(always)]
pub fn op_nnn(word: u16) -> Address {
    word & 0x0FFF
}

/// Extract operand NN (`kk`), the low byte.
#[inline(always)]
pub fn op_nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand VX.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand VY.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N, the low nibble.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}

/// Decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 0nnn (SYS addr)
    ///
    /// Call to a machine code routine on the original hardware.
    /// Treated as a jump.
    Sys { address: Address },
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VY is unused.
    ShiftRight { vx: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VY is unused.
    ShiftLeft { vx: u8 },

    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Misc
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a key press, store the value of the key in Vx.
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Set I to the location of the font sprite for digit Vx.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    ///
    /// Store the binary-coded decimal representation of Vx.
    Load_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },

    /// Word that doesn't encode any known instruction.
    Unknown(u16),
}

impl Op {
    /// Decode a 16-bit instruction word.
    pub fn decode(word: u16) -> Self {
        let address = op_nnn(word);
        let vx = op_x(word);
        let vy = op_y(word);
        let nn = op_nn(word);
        let n = op_n(word);

        match op_code(word) {
            0x0 => match word {
                0x00E0 => Op::ClearScreen,
                0x00EE => Op::Return,
                _ => Op::Sys { address },
            },
            0x1 => Op::JumpAddress { address },
            0x2 => Op::Call { address },
            0x3 => Op::Skip_Eq_Byte { vx, nn },
            0x4 => Op::Skip_NotEq_Byte { vx, nn },
            // The low nibble is not checked for 5xy0 and 9xy0.
            0x5 => Op::Skip_Eq { vx, vy },
            0x6 => Op::Load_Byte { vx, nn },
            0x7 => Op::Add_Byte { vx, nn },
            // Arithmetic instructions identified by n
            0x8 => match n {
                0x0 => Op::Load_Vx_Vy { vx, vy },
                0x1 => Op::Or_Vx_Vy { vx, vy },
                0x2 => Op::And_Vx_Vy { vx, vy },
                0x3 => Op::Xor_Vx_Vy { vx, vy },
                0x4 => Op::Add_Vx_Vy { vx, vy },
                0x5 => Op::Sub_Vx_Vy { vx, vy },
                0x6 => Op::ShiftRight { vx },
                0x7 => Op::SubReverse_Vx_Vy { vx, vy },
                0xE => Op::ShiftLeft { vx },
                _ => Op::Unknown(word),
            },
            0x9 => Op::Skip_NotEq { vx, vy },
            0xA => Op::Load_Address { address },
            0xB => Op::Jump_V0 { address },
            0xC => Op::Random { vx, nn },
            0xD => Op::Draw { vx, vy, n },
            // Keyboard instructions identified by nn
            0xE => match nn {
                0x9E => Op::Skip_Key { vx },
                0xA1 => Op::Skip_NotKey { vx },
                _ => Op::Unknown(word),
            },
            // Miscellaneous instructions identified by nn
            0xF => match nn {
                0x07 => Op::Load_Vx_Delay { vx },
                0x0A => Op::Load_Vx_Key { vx },
                0x15 => Op::Load_Delay_Vx { vx },
                0x18 => Op::Load_Sound_Vx { vx },
                0x1E => Op::Add_Address_Vx { vx },
                0x29 => Op::Load_Font { vx },
                0x33 => Op::Load_Bcd { vx },
                0x55 => Op::Store_Registers { vx },
                0x65 => Op::Load_Registers { vx },
                _ => Op::Unknown(word),
            },
            _ => unreachable!("opcode family is a single nibble"),
        }
    }

    /// Conventional assembly mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Sys { .. } => "SYS",
            Op::ClearScreen => "CLS",
            Op::Return => "RET",
            Op::JumpAddress { .. } | Op::Jump_V0 { .. } => "JP",
            Op::Call { .. } => "CALL",
            Op::Skip_Eq_Byte { .. } | Op::Skip_Eq { .. } => "SE",
            Op::Skip_NotEq_Byte { .. } | Op::Skip_NotEq { .. } => "SNE",
            Op::Load_Byte { .. }
            | Op::Load_Vx_Vy { .. }
            | Op::Load_Address { .. }
            | Op::Load_Vx_Delay { .. }
            | Op::Load_Vx_Key { .. }
            | Op::Load_Delay_Vx { .. }
            | Op::Load_Sound_Vx { .. }
            | Op::Load_Font { .. }
            | Op::Load_Bcd { .. }
            | Op::Store_Registers { .. }
            | Op::Load_Registers { .. } => "LD",
            Op::Add_Byte { .. } | Op::Add_Vx_Vy { .. } | Op::Add_Address_Vx { .. } => "ADD",
            Op::Or_Vx_Vy { .. } => "OR",
            Op::And_Vx_Vy { .. } => "AND",
            Op::Xor_Vx_Vy { .. } => "XOR",
            Op::Sub_Vx_Vy { .. } => "SUB",
            Op::ShiftRight { .. } => "SHR",
            Op::SubReverse_Vx_Vy { .. } => "SUBN",
            Op::ShiftLeft { .. } => "SHL",
            Op::Random { .. } => "RND",
            Op::Draw { .. } => "DRW",
            Op::Skip_Key { .. } => "SKP",
            Op::Skip_NotKey { .. } => "SKNP",
            Op::Unknown(_) => "???",
        }
    }
}

/// Short form with operands, used for tracing and diagnostics.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match *self {
            Op::ClearScreen | Op::Return => write!(f, "{name}"),
            Op::Sys { address } | Op::JumpAddress { address } | Op::Call { address } => {
                write!(f, "{name} 0x{address:03X}")
            }
            Op::Jump_V0 { address } => write!(f, "{name} v0, 0x{address:03X}"),
            Op::Load_Address { address } => write!(f, "{name} I, 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn }
            | Op::Skip_NotEq_Byte { vx, nn }
            | Op::Load_Byte { vx, nn }
            | Op::Add_Byte { vx, nn }
            | Op::Random { vx, nn } => write!(f, "{name} v{vx:X}, 0x{nn:02X}"),
            Op::Skip_Eq { vx, vy }
            | Op::Skip_NotEq { vx, vy }
            | Op::Load_Vx_Vy { vx, vy }
            | Op::Or_Vx_Vy { vx, vy }
            | Op::And_Vx_Vy { vx, vy }
            | Op::Xor_Vx_Vy { vx, vy }
            | Op::Add_Vx_Vy { vx, vy }
            | Op::Sub_Vx_Vy { vx, vy }
            | Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "{name} v{vx:X}, v{vy:X}"),
            Op::ShiftRight { vx }
            | Op::ShiftLeft { vx }
            | Op::Skip_Key { vx }
            | Op::Skip_NotKey { vx } => write!(f, "{name} v{vx:X}"),
            Op::Draw { vx, vy, n } => write!(f, "{name} v{vx:X}, v{vy:X}, {n}"),
            Op::Load_Vx_Delay { vx } => write!(f, "{name} v{vx:X}, DT"),
            Op::Load_Vx_Key { vx } => write!(f, "{name} v{vx:X}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "{name} DT, v{vx:X}"),
            Op::Load_Sound_Vx { vx } => write!(f, "{name} ST, v{vx:X}"),
            Op::Add_Address_Vx { vx } => write!(f, "{name} I, v{vx:X}"),
            Op::Load_Font { vx } => write!(f, "{name} F, v{vx:X}"),
            Op::Load_Bcd { vx } => write!(f, "{name} B, v{vx:X}"),
            Op::Store_Registers { vx } => write!(f, "{name} [I], v{vx:X}"),
            Op::Load_Registers { vx } => write!(f, "{name} v{vx:X}, [I]"),
            Op::Unknown(word) => write!(f, "0x{word:04X}"),
        }
    }
}
