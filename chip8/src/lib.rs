mod clock;
pub mod constants;
mod cpu;
mod display;
mod error;
mod keypad;
pub mod op;
mod vm;

pub use self::{
    clock::{Clock, Hz},
    cpu::{Chip8Cpu, CpuMode},
    display::Framebuffer,
    error::{Chip8Error, Chip8Result},
    keypad::{InvalidKeyCode, KeyCode},
    vm::{check_program_size, Chip8Conf, Chip8Vm, Flow},
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        clock::{Clock, Hz},
        cpu::{Chip8Cpu, CpuMode},
        display::Framebuffer,
        error::{Chip8Error, Chip8Result},
        keypad::KeyCode,
        op::Op,
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
