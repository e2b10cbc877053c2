//! Virtual machine.
use std::fmt::{self, Write};

use log::{debug, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    clock::Hz,
    constants::*,
    cpu::{Chip8Cpu, CpuMode},
    display::Framebuffer,
    error::{Chip8Error, Chip8Result},
    keypad::KeyCode,
    op::Op,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
pub struct Chip8Conf {
    /// Instructions per second the driver should execute.
    pub clock_frequency: Option<Hz>,
    /// Seed for the `RND` instruction. Seeded from system entropy when empty.
    pub rng_seed: Option<u64>,
}

/// Outcome of a single interpreter step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 0nnn (`SYS addr`)
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer changed.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The word at the program counter is not a known instruction.
    ///
    /// It was skipped, and execution can continue.
    Unknown(u16),
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let mut vm = Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng: Self::seed_rng(&conf),
            conf,
        };
        vm.reset();
        vm
    }

    fn seed_rng(conf: &Chip8Conf) -> StdRng {
        match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Machine state, read only.
    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    /// Clear all machine state in preparation for a fresh session.
    ///
    /// The builtin font is loaded into low memory, and the program
    /// counter points to the start of program memory.
    pub fn reset(&mut self) {
        debug!("reset");
        self.cpu.reset();
        self.rng = Self::seed_rng(&self.conf);
    }

    /// Copy a ROM image into program memory, starting at `0x200`.
    ///
    /// Memory is not cleared first, see [`Chip8Vm::reset`]. A program that
    /// doesn't fit is rejected and the machine is left untouched.
    pub fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::RomTooLarge {
                size: bytecode.len(),
            });
        }

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);
        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.cpu.display
    }

    /// The buzzer should be on while the sound timer counts down.
    pub fn sound_active(&self) -> bool {
        self.cpu.sound_timer > 0
    }

    /// Check whether the machine is suspended on `Fx0A`.
    pub fn is_waiting_for_key(&self) -> bool {
        matches!(self.cpu.mode, CpuMode::WaitingForKey { .. })
    }
}

/// Check that the program fits in the addressable program memory.
#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MAX_PROGRAM_SIZE
}

/// Input and timers
impl Chip8Vm {
    /// Sets the keyboard key input state.
    ///
    /// If the VM is waiting for keyboard input, a key going from up to down
    /// is latched, and the next step stores it and resumes execution.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        let key_id = key.as_u8();
        let was_pressed = self.cpu.key_state(key_id);
        self.cpu.set_key_state(key_id, pressed);

        let key_down = pressed && !was_pressed;
        if key_down && self.is_waiting_for_key() && self.cpu.key_latch.is_none() {
            debug!("key {key} released the key wait");
            self.cpu.key_latch = Some(key_id);
        }
    }

    /// Sets the keyboard input state by raw key index.
    pub fn set_key_index(&mut self, key_id: u8, pressed: bool) -> Chip8Result<()> {
        let key = KeyCode::try_from(key_id)?;
        self.set_key(key, pressed);
        Ok(())
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers.
    ///
    /// Must be called at 60Hz, independently of how often the VM is stepped.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }
}

/// Interpreter
impl Chip8Vm {
    /// Step the VM up to `step_count` instructions.
    ///
    /// Stops early when the machine starts waiting for a key, since further
    /// steps can't make progress until the host delivers input.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
            if flow == Flow::KeyWait {
                break;
            }
        }

        Ok(flow)
    }

    /// Execute a single instruction.
    ///
    /// While waiting for a key, no instruction is fetched. Once a key was
    /// pressed the step stores it and returns without executing anything else.
    ///
    /// On error the machine state is left as it was before the step.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if let CpuMode::WaitingForKey { vx } = self.cpu.mode {
            return Ok(self.resume_key_wait(vx));
        }

        let word = self.cpu.instr()?;
        let op = Op::decode(word);
        op_trace(&self.cpu, word, &op);

        let pc = self.cpu.pc;
        self.cpu.pc += 2;

        match self.exec(op) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                // Rewind so the failed instruction has no effect.
                self.cpu.pc = pc;
                Err(err)
            }
        }
    }

    fn resume_key_wait(&mut self, vx: u8) -> Flow {
        match self.cpu.key_latch.take() {
            Some(key_id) => {
                self.cpu.registers[vx as usize] = key_id;
                self.cpu.mode = CpuMode::Running;
                Flow::Ok
            }
            None => Flow::KeyWait,
        }
    }

    #[inline]
    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.cpu.pc += 2;
        }
    }

    /// Execute a decoded instruction.
    ///
    /// The program counter already points to the next instruction.
    /// Each instruction validates before mutating state.
    fn exec(&mut self, op: Op) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;

        match op {
            // 0nnn (SYS addr)
            //
            // Machine code routines can't be run, so this is a jump.
            // 1nnn (JP addr)
            //
            // Jump to address.
            Op::Sys { address } | Op::JumpAddress { address } => {
                self.cpu.pc = address as usize;
                control_flow = Flow::Jump;
            }
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                self.cpu.clear_display();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Subtract 1 from the stack pointer.
            // Set the program counter to the value at the top of the stack.
            Op::Return => {
                if self.cpu.sp == 0 {
                    return Err(Chip8Error::StackUnderflow);
                }
                self.cpu.sp -= 1;
                self.cpu.pc = self.cpu.stack[self.cpu.sp] as usize;
                control_flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at NNN.
            // The return address is the instruction after the call.
            Op::Call { address } => {
                if self.cpu.sp >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow);
                }
                self.cpu.stack[self.cpu.sp] = self.cpu.pc as Address;
                self.cpu.sp += 1;
                self.cpu.pc = address as usize;
                control_flow = Flow::Jump;
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Op::Skip_Eq_Byte { vx, nn } => {
                self.skip_if(self.cpu.registers[vx as usize] == nn);
            }
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Op::Skip_NotEq_Byte { vx, nn } => {
                self.skip_if(self.cpu.registers[vx as usize] != nn);
            }
            // 5xy0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            Op::Skip_Eq { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                self.skip_if(x == y);
            }
            // 6xnn (LD Vx, byte)
            //
            // Set register VX to value NN.
            Op::Load_Byte { vx, nn } => {
                self.cpu.registers[vx as usize] = nn;
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x.wrapping_add(nn);
            }
            // Arithmetic instructions
            Op::Load_Vx_Vy { .. }
            | Op::Or_Vx_Vy { .. }
            | Op::And_Vx_Vy { .. }
            | Op::Xor_Vx_Vy { .. }
            | Op::Add_Vx_Vy { .. }
            | Op::Sub_Vx_Vy { .. }
            | Op::ShiftRight { .. }
            | Op::SubReverse_Vx_Vy { .. }
            | Op::ShiftLeft { .. } => self.exec_math(op),
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            Op::Skip_NotEq { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                self.skip_if(x != y);
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            Op::Load_Address { address } => {
                self.cpu.address = address;
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to location nnn + V0.
            Op::Jump_V0 { address } => {
                self.cpu.pc = address as usize + self.cpu.registers[0] as usize;
                control_flow = Flow::Jump;
            }
            // Cxnn (RND Vx, byte)
            //
            // Generate random number.
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                self.cpu.registers[vx as usize] = nn & self.rng.gen::<u8>();
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the sprite is drawn outside of the display area, it is wrapped around to the other side.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            Op::Draw { vx, vy, n } => {
                let addr = self.cpu.address as usize;
                self.cpu.check_range(addr, n as usize)?;

                let (x, y) = (
                    self.cpu.registers[vx as usize] as usize,
                    self.cpu.registers[vy as usize] as usize,
                );
                let mut is_erased = false;

                // Iteration from pointer in address register I to number of rows specified by opcode value N.
                for (r, row) in self.cpu.ram[addr..addr + n as usize].iter().enumerate() {
                    is_erased |= self.cpu.display.draw_row(x, y + r, *row);
                }

                // If a pixel was erased, then a collision occurred.
                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
                control_flow = Flow::Draw;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip the next instruction if the key with the value of Vx is down.
            Op::Skip_Key { vx } => {
                let key_id = self.cpu.registers[vx as usize];
                self.skip_if(self.cpu.key_state(key_id));
            }
            // ExA1 (SKNP Vx)
            //
            // Skip the next instruction if the key with the value of Vx is up.
            Op::Skip_NotKey { vx } => {
                let key_id = self.cpu.registers[vx as usize];
                self.skip_if(!self.cpu.key_state(key_id));
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            Op::Load_Vx_Delay { vx } => {
                self.cpu.registers[vx as usize] = self.cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // The machine is suspended rather than blocked, so the driver
            // keeps polling input, rendering and counting down timers.
            Op::Load_Vx_Key { vx } => {
                debug!("waiting for key into v{vx:X}");
                self.cpu.mode = CpuMode::WaitingForKey { vx };
                self.cpu.key_latch = None;
                control_flow = Flow::KeyWait;
            }
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            Op::Load_Delay_Vx { vx } => {
                self.cpu.delay_timer = self.cpu.registers[vx as usize];
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            Op::Load_Sound_Vx { vx } => {
                self.cpu.sound_timer = self.cpu.registers[vx as usize];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I. VF is not affected.
            Op::Add_Address_Vx { vx } => {
                let x = self.cpu.registers[vx as usize] as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Font { vx } => {
                let x = self.cpu.registers[vx as usize] as Address;
                self.cpu.address = FONTSET_START + x * FONTSET_HEIGHT as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Load_Bcd { vx } => {
                let addr = self.cpu.address as usize;
                self.cpu.check_range(addr, 3)?;

                let x = self.cpu.registers[vx as usize];
                self.cpu.ram[addr]     = x / 100;
                self.cpu.ram[addr + 1] = x / 10  % 10;
                self.cpu.ram[addr + 2] = x       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I is left unchanged.
            Op::Store_Registers { vx } => {
                let addr = self.cpu.address as usize;
                let count = vx as usize + 1;
                self.cpu.check_range(addr, count)?;

                self.cpu.ram[addr..addr + count].copy_from_slice(&self.cpu.registers[..count]);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            // I is left unchanged.
            Op::Load_Registers { vx } => {
                let addr = self.cpu.address as usize;
                let count = vx as usize + 1;
                self.cpu.check_range(addr, count)?;

                self.cpu.registers[..count].copy_from_slice(&self.cpu.ram[addr..addr + count]);
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            Op::Unknown(word) => {
                warn!(
                    "unknown opcode 0x{word:04X} at 0x{:04X}",
                    self.cpu.pc.wrapping_sub(2)
                );
                control_flow = Flow::Unknown(word);
            }
        }

        Ok(control_flow)
    }

    /// Execute an arithmetic instruction
    ///
    /// The result is written before the flag, so when Vx is VF the
    /// flag wins.
    #[inline]
    fn exec_math(&mut self, op: Op) {
        match op {
            // 8xy0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            Op::Load_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] = self.cpu.registers[vy as usize];
            }
            // 8xy1 (OR Vx, Vy)
            //
            // Performs bitwise OR on VX and VY, and stores the result in VX.
            Op::Or_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] |= self.cpu.registers[vy as usize];
            }
            // 8xy2 (AND Vx, Vy)
            //
            // Performs bitwise AND on VX and VY, and stores the result in VX.
            Op::And_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] &= self.cpu.registers[vy as usize];
            }
            // 8xy3 (XOR Vx, Vy)
            //
            // Performs bitwise XOR on VX and VY, and stores the result in VX.
            Op::Xor_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] ^= self.cpu.registers[vy as usize];
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // ADDs VX to VY, and stores the result in VX.
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let (x, y) = (
                    self.cpu.registers[vx as usize],
                    self.cpu.registers[vy as usize],
                );
                let (result, carry) = x.overflowing_add(y);
                self.cpu.registers[vx as usize] = result;
                self.cpu.registers[FLAG_REGISTER] = carry as u8;
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (
                    self.cpu.registers[vx as usize],
                    self.cpu.registers[vy as usize],
                );
                self.cpu.registers[vx as usize] = x.wrapping_sub(y);
                self.cpu.registers[FLAG_REGISTER] = (x >= y) as u8;
            }
            // 8xy6 (SHR Vx)
            //
            // If the least-significant bit of Vx is 1, then VF is set to 1, otherwise 0.
            // Shift VX right by 1.
            Op::ShiftRight { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x >> 1;
                self.cpu.registers[FLAG_REGISTER] = x & 1;
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (
                    self.cpu.registers[vx as usize],
                    self.cpu.registers[vy as usize],
                );
                self.cpu.registers[vx as usize] = y.wrapping_sub(x);
                self.cpu.registers[FLAG_REGISTER] = (y >= x) as u8;
            }
            // 8xyE (SHL Vx)
            //
            // If the most-significant bit of Vx is 1, then VF is set to 1, otherwise 0.
            // Shift VX left by 1.
            Op::ShiftLeft { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x << 1;
                self.cpu.registers[FLAG_REGISTER] = (x >> 7) & 1;
            }
            _ => unreachable!("not an arithmetic instruction: {op:?}"),
        }
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            let lo = self.cpu.ram.get(i + 1).copied().unwrap_or_default();
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, lo)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> String {
        self.cpu.display.to_string()
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, "k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(cpu: &Chip8Cpu, word: u16, op: &Op) {
    log::trace!("{:04X}: {:04X} {}", cpu.pc, word, op);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: &Chip8Cpu, _: u16, _: &Op) {}
