//! CPU and memory state.
use crate::{
    constants::*,
    display::Framebuffer,
    error::{out_of_range, Chip8Result},
};

/// Execution state of the virtual CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMode {
    /// Fetching and executing instructions.
    Running,
    /// Suspended by `Fx0A` (`LD Vx, K`) until a key goes down.
    ///
    /// The program counter already points past the instruction.
    WaitingForKey { vx: u8 },
}

/// Core state for a chip8 interpreter.
///
/// Only the interpreter writes to this state, except for the key state
/// which is written by the input device, and the timers which are
/// counted down by the driver's 60Hz clock.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: usize,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses are 12 bits, only the
    /// lowest (rightmost) bits are used.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,
    pub(crate) mode: CpuMode,
    /// Key that went down while waiting in `Fx0A`.
    pub(crate) key_latch: Option<u8>,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to.
    pub(crate) display: Framebuffer,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_state: 0,
            mode: CpuMode::Running,
            key_latch: None,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Framebuffer::new(),
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Zero all state and reload the builtin font.
    ///
    /// Reuses the existing memory allocation.
    pub fn reset(&mut self) {
        self.pc = MEM_START;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_state = 0;
        self.mode = CpuMode::Running;
        self.key_latch = None;

        self.clear_memory();
        self.load_font();
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.clear();
    }

    fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    pub fn clear_display(&mut self) {
        self.display.clear();
    }

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Retrieve the value of the first key that is pressed down.
    #[inline]
    pub fn first_key(&self) -> Option<u8> {
        if self.any_key() {
            Some(self.key_state.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Ensure `len` bytes starting at `addr` lie within memory.
    #[inline]
    pub(crate) fn check_range(&self, addr: usize, len: usize) -> Chip8Result<()> {
        if addr + len > MEM_SIZE {
            Err(out_of_range(addr.max(MEM_SIZE)))
        } else {
            Ok(())
        }
    }

    /// Extract the instruction word at the current program counter.
    #[inline]
    pub fn instr(&self) -> Chip8Result<u16> {
        self.check_range(self.pc, 2)?;
        Ok(u16::from_be_bytes([self.ram[self.pc], self.ram[self.pc + 1]]))
    }
}

/// Read access for hosts and debugging.
impl Chip8Cpu {
    #[inline(always)]
    pub fn pc(&self) -> usize {
        self.pc
    }

    #[inline(always)]
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Value of register `Vx`.
    ///
    /// # Panics
    ///
    /// When `index` is not a register number (0x0-0xF).
    #[inline(always)]
    pub fn register(&self, index: usize) -> u8 {
        self.registers[index]
    }

    #[inline(always)]
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Index register `I`.
    #[inline(always)]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline(always)]
    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    #[inline(always)]
    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    #[inline(always)]
    pub fn mode(&self) -> CpuMode {
        self.mode
    }

    #[inline(always)]
    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.ram
    }

    /// Return addresses currently on the stack, oldest first.
    #[inline]
    pub fn stack(&self) -> &[Address] {
        &self.stack[..self.sp]
    }
}
