use chip8_machine::{constants::*, prelude::*, InvalidKeyCode};

fn vm_with(program: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_program(program).unwrap();
    vm
}

#[test]
fn test_reset_state() {
    let mut vm = vm_with(&[0x60, 0x01, 0xA0, 0x00, 0xD0, 0x05]);
    vm.run_steps(3).unwrap();
    assert!(!vm.framebuffer().is_blank());

    vm.reset();
    vm.reset();

    let cpu = vm.cpu();
    assert!(vm.framebuffer().is_blank());
    assert_eq!(&cpu.memory()[..FONTSET_DATA_LENGTH], &FONTSET[..]);
    assert!(cpu.memory()[MEM_START..].iter().all(|b| *b == 0));
    assert_eq!(cpu.pc(), MEM_START);
    assert_eq!(cpu.sp(), 0);
    assert_eq!(cpu.address(), 0);
    assert_eq!(cpu.registers(), &[0; REGISTER_COUNT]);
    assert_eq!(cpu.mode(), CpuMode::Running);
}

#[test]
fn test_load_program() {
    let rom: Vec<u8> = (0..MAX_PROGRAM_SIZE).map(|i| (i * 7) as u8).collect();
    let vm = vm_with(&rom);
    assert_eq!(&vm.cpu().memory()[MEM_START..], rom.as_slice());

    let mut vm = vm_with(&[]);
    assert!(vm.cpu().memory()[MEM_START..].iter().all(|b| *b == 0));
    vm.load_program(&[0xAB, 0xCD]).unwrap();
    assert_eq!(&vm.cpu().memory()[MEM_START..MEM_START + 2], &[0xAB, 0xCD]);
}

#[test]
fn test_load_program_too_large() {
    // LD v0, 5
    // LD I, 0x300
    let mut vm = vm_with(&[0x60, 0x05, 0xA3, 0x00]);
    vm.run_steps(2).unwrap();

    let memory = vm.cpu().memory().to_vec();
    let registers = *vm.cpu().registers();
    let (pc, address) = (vm.cpu().pc(), vm.cpu().address());

    let rom = vec![0xFF; MAX_PROGRAM_SIZE + 1];
    assert_eq!(
        vm.load_program(&rom),
        Err(Chip8Error::RomTooLarge {
            size: MAX_PROGRAM_SIZE + 1
        })
    );
    assert_eq!(vm.cpu().memory().as_slice(), memory.as_slice());
    assert_eq!(vm.cpu().registers(), &registers);
    assert_eq!(vm.cpu().pc(), pc);
    assert_eq!(vm.cpu().address(), address);
}

#[test]
#[rustfmt::skip]
fn test_add_carry() {
    let mut vm = vm_with(&[
        0x60, 0xFF, // LD v0, 0xFF
        0x61, 0x01, // LD v1, 0x01
        0x80, 0x14, // ADD v0, v1
        0x62, 0x01, // LD v2, 0x01
        0x63, 0x01, // LD v3, 0x01
        0x82, 0x34, // ADD v2, v3
    ]);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(0), 0x00);
    assert_eq!(vm.cpu().register(0xF), 1);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(2), 0x02);
    assert_eq!(vm.cpu().register(0xF), 0);
}

#[test]
#[rustfmt::skip]
fn test_sub_borrow() {
    let mut vm = vm_with(&[
        0x60, 0x05, // LD v0, 0x05
        0x61, 0x03, // LD v1, 0x03
        0x80, 0x15, // SUB v0, v1
        0x62, 0x03, // LD v2, 0x03
        0x63, 0x05, // LD v3, 0x05
        0x82, 0x35, // SUB v2, v3
    ]);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(0), 0x02);
    assert_eq!(vm.cpu().register(0xF), 1);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(2), 0xFE);
    assert_eq!(vm.cpu().register(0xF), 0);
}

#[test]
#[rustfmt::skip]
fn test_sub_reverse_borrow() {
    let mut vm = vm_with(&[
        0x60, 0x03, // LD v0, 0x03
        0x61, 0x05, // LD v1, 0x05
        0x80, 0x17, // SUBN v0, v1
        0x62, 0x05, // LD v2, 0x05
        0x63, 0x03, // LD v3, 0x03
        0x82, 0x37, // SUBN v2, v3
        0x64, 0x04, // LD v4, 0x04
        0x84, 0x47, // SUBN v4, v4
    ]);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(0), 0x02);
    assert_eq!(vm.cpu().register(0xF), 1);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(2), 0xFE);
    assert_eq!(vm.cpu().register(0xF), 0);

    // Equal operands don't borrow.
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().register(4), 0x00);
    assert_eq!(vm.cpu().register(0xF), 1);
}

#[test]
#[rustfmt::skip]
fn test_bitwise() {
    let mut vm = vm_with(&[
        0x60, 0b1100, // LD v0, 0b1100
        0x61, 0b1010, // LD v1, 0b1010
        0x82, 0x00,   // LD v2, v0
        0x82, 0x11,   // OR v2, v1
        0x83, 0x00,   // LD v3, v0
        0x83, 0x12,   // AND v3, v1
        0x84, 0x00,   // LD v4, v0
        0x84, 0x13,   // XOR v4, v1
        0x75, 0xFF,   // ADD v5, 0xFF
        0x75, 0x02,   // ADD v5, 0x02
    ]);
    vm.run_steps(10).unwrap();

    assert_eq!(vm.cpu().register(2), 0b1110);
    assert_eq!(vm.cpu().register(3), 0b1000);
    assert_eq!(vm.cpu().register(4), 0b0110);
    // Wrapping add leaves the flag alone.
    assert_eq!(vm.cpu().register(5), 0x01);
    assert_eq!(vm.cpu().register(0xF), 0);
}

#[test]
#[rustfmt::skip]
fn test_call_return() {
    let mut program = vec![0u8; 0x102];
    program[0x000..0x002].copy_from_slice(&[0x23, 0x00]); // 0x200: CALL 0x300
    program[0x100..0x102].copy_from_slice(&[0x00, 0xEE]); // 0x300: RET
    let mut vm = vm_with(&program);

    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x300);
    assert_eq!(vm.cpu().sp(), 1);
    assert_eq!(vm.cpu().stack(), &[0x202]);

    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x202);
    assert_eq!(vm.cpu().sp(), 0);
}

#[test]
fn test_return_underflow() {
    let mut vm = vm_with(&[0x00, 0xEE]);
    assert_eq!(vm.step(), Err(Chip8Error::StackUnderflow));
    assert_eq!(vm.cpu().pc(), MEM_START);
    assert_eq!(vm.cpu().sp(), 0);

    // The failure is repeatable, nothing was consumed.
    assert_eq!(vm.step(), Err(Chip8Error::StackUnderflow));
}

#[test]
fn test_call_overflow() {
    // 0x200: CALL 0x200, recursing forever.
    let mut vm = vm_with(&[0x22, 0x00]);
    for depth in 1..=STACK_SIZE {
        assert_eq!(vm.step(), Ok(Flow::Jump));
        assert_eq!(vm.cpu().sp(), depth);
    }

    let stack = vm.cpu().stack().to_vec();
    assert_eq!(vm.step(), Err(Chip8Error::StackOverflow));
    assert_eq!(vm.cpu().pc(), MEM_START);
    assert_eq!(vm.cpu().sp(), STACK_SIZE);
    assert_eq!(vm.cpu().stack(), stack.as_slice());
}

#[test]
#[rustfmt::skip]
fn test_skips() {
    let mut vm = vm_with(&[
        0x60, 0x05, // 0x200: LD v0, 5
        0x30, 0x05, // 0x202: SE v0, 5      ; skip
        0x00, 0x00, // 0x204:
        0x40, 0x05, // 0x206: SNE v0, 5     ; no skip
        0x61, 0x05, // 0x208: LD v1, 5
        0x50, 0x10, // 0x20A: SE v0, v1     ; skip
        0x00, 0x00, // 0x20C:
        0x90, 0x10, // 0x20E: SNE v0, v1    ; no skip
        0x62, 0x42, // 0x210: LD v2, 0x42
    ]);

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0x206);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().pc(), 0x20E);
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0x212);
    assert_eq!(vm.cpu().register(2), 0x42);
}

#[test]
#[rustfmt::skip]
fn test_jumps() {
    let mut vm = vm_with(&[
        0x60, 0x04, // 0x200: LD v0, 4
        0xB2, 0x00, // 0x202: JP v0, 0x200
        0x00, 0x00, // 0x204:
        0x02, 0x00, // 0x206: SYS 0x200
    ]);

    vm.step().unwrap();
    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x204);

    // 0000 is a jump to address zero.
    assert_eq!(vm.step(), Ok(Flow::Jump));
    assert_eq!(vm.cpu().pc(), 0x000);
}

#[test]
#[rustfmt::skip]
fn test_draw_twice_collides() {
    let mut vm = vm_with(&[
        0xA2, 0x0A, // LD I, .sprite
        0x60, 0x08, // LD v0, 8
        0x61, 0x03, // LD v1, 3
        0xD0, 0x11, // DRW v0, v1, 1
        0xD0, 0x11, // DRW v0, v1, 1
        // .sprite
        0xFF, 0x00,
    ]);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert_eq!(vm.cpu().register(0xF), 0);
    for x in 8..16 {
        assert!(vm.framebuffer().pixel(x, 3));
    }

    assert_eq!(vm.step(), Ok(Flow::Draw));
    assert_eq!(vm.cpu().register(0xF), 1);
    assert!(vm.framebuffer().is_blank());
}

#[test]
#[rustfmt::skip]
fn test_draw_wraps() {
    let mut vm = vm_with(&[
        0xA2, 0x0A, // LD I, .sprite
        0x60, 0x3C, // LD v0, 60
        0x61, 0x1F, // LD v1, 31
        0xD0, 0x12, // DRW v0, v1, 2
        0x00, 0x00,
        // .sprite
        0xFF, 0x81,
    ]);
    vm.run_steps(4).unwrap();

    let fb = vm.framebuffer();
    let lit: Vec<usize> = (0..DISPLAY_WIDTH).filter(|x| fb.pixel(*x, 31)).collect();
    assert_eq!(lit, vec![0, 1, 2, 3, 60, 61, 62, 63]);

    // Second row wraps to the top of the screen.
    let lit: Vec<usize> = (0..DISPLAY_WIDTH).filter(|x| fb.pixel(*x, 0)).collect();
    assert_eq!(lit, vec![3, 60]);
    assert_eq!(vm.cpu().register(0xF), 0);
}

#[test]
#[rustfmt::skip]
fn test_draw_out_of_range() {
    let mut vm = vm_with(&[
        0xAF, 0xFE, // LD I, 0xFFE
        0xD0, 0x03, // DRW v0, v0, 3
    ]);
    vm.step().unwrap();
    assert_eq!(
        vm.step(),
        Err(Chip8Error::AddressOutOfRange { address: MEM_SIZE })
    );
    assert_eq!(vm.cpu().pc(), MEM_START + 2);
    assert!(vm.framebuffer().is_blank());
}

#[test]
#[rustfmt::skip]
fn test_memory_through_address_out_of_range() {
    // LD B, v2 / LD [I], v2 / LD v2, [I]
    for op in [[0xF2, 0x33], [0xF2, 0x55], [0xF2, 0x65]] {
        let mut vm = vm_with(&[
            0x60, 0x11, // LD v0, 0x11
            0x61, 0x22, // LD v1, 0x22
            0x62, 0xFE, // LD v2, 0xFE
            0xAF, 0xFE, // LD I, 0xFFE
            op[0], op[1],
        ]);
        vm.run_steps(4).unwrap();

        let memory = vm.cpu().memory().to_vec();
        let registers = *vm.cpu().registers();

        assert_eq!(
            vm.step(),
            Err(Chip8Error::AddressOutOfRange { address: MEM_SIZE }),
            "opcode {:02X}{:02X}", op[0], op[1]
        );
        assert_eq!(vm.cpu().pc(), MEM_START + 8);
        assert_eq!(vm.cpu().address(), 0xFFE);
        assert_eq!(vm.cpu().registers(), &registers);
        assert_eq!(vm.cpu().memory().as_slice(), memory.as_slice());
    }
}

#[test]
fn test_fetch_out_of_range() {
    // 0x200: JP 0xFFF
    let mut vm = vm_with(&[0x1F, 0xFF]);
    vm.step().unwrap();
    assert_eq!(
        vm.step(),
        Err(Chip8Error::AddressOutOfRange { address: MEM_SIZE })
    );
    assert_eq!(vm.cpu().pc(), 0xFFF);
}

#[test]
#[rustfmt::skip]
fn test_font_and_bcd() {
    let mut vm = vm_with(&[
        0x60, 0x0A, // LD v0, 0xA
        0xF0, 0x29, // LD F, v0
        0x61, 0xEA, // LD v1, 234
        0xA3, 0x00, // LD I, 0x300
        0xF1, 0x33, // LD B, v1
    ]);

    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().address(), 50);

    vm.run_steps(3).unwrap();
    assert_eq!(&vm.cpu().memory()[0x300..0x303], &[2, 3, 4]);
    assert_eq!(vm.cpu().address(), 0x300);
}

#[test]
#[rustfmt::skip]
fn test_store_load_registers() {
    let mut vm = vm_with(&[
        0x60, 0x11, // LD v0, 0x11
        0x61, 0x22, // LD v1, 0x22
        0x62, 0x33, // LD v2, 0x33
        0xA3, 0x00, // LD I, 0x300
        0xF1, 0x55, // LD [I], v1
        0xA3, 0x01, // LD I, 0x301
        0xF2, 0x65, // LD v2, [I]
    ]);

    vm.run_steps(5).unwrap();
    assert_eq!(&vm.cpu().memory()[0x300..0x303], &[0x11, 0x22, 0x00]);
    assert_eq!(vm.cpu().address(), 0x300);

    vm.run_steps(2).unwrap();
    assert_eq!(&vm.cpu().registers()[..3], &[0x22, 0x00, 0x00]);
    assert_eq!(vm.cpu().address(), 0x301);
}

#[test]
#[rustfmt::skip]
fn test_add_address() {
    let mut vm = vm_with(&[
        0xA0, 0xFF, // LD I, 0x0FF
        0x60, 0x02, // LD v0, 2
        0xF0, 0x1E, // ADD I, v0
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().address(), 0x101);
    assert_eq!(vm.cpu().register(0xF), 0);
}

#[test]
#[rustfmt::skip]
fn test_timers() {
    let mut vm = vm_with(&[
        0x60, 0x02, // LD v0, 2
        0xF0, 0x15, // LD DT, v0
        0xF0, 0x18, // LD ST, v0
        0xF1, 0x07, // LD v1, DT
    ]);

    vm.run_steps(2).unwrap();
    assert!(!vm.sound_active());
    assert_eq!(vm.step(), Ok(Flow::Sound));
    assert!(vm.sound_active());

    // Stepping doesn't count down the timers.
    assert_eq!(vm.cpu().delay_timer(), 2);
    vm.tick_timers();
    vm.step().unwrap();
    assert_eq!(vm.cpu().register(1), 1);

    vm.tick_timers();
    assert!(!vm.sound_active());
    vm.tick_timers();
    assert_eq!(vm.cpu().delay_timer(), 0);
    assert_eq!(vm.cpu().sound_timer(), 0);
}

#[test]
#[rustfmt::skip]
fn test_skip_key() {
    let mut vm = vm_with(&[
        0x60, 0x0E, // 0x200: LD v0, 0xE
        0xE0, 0x9E, // 0x202: SKP v0
        0xE0, 0xA1, // 0x204: SKNP v0
        0xE0, 0x9E, // 0x206: SKP v0
    ]);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().pc(), 0x208);

    vm.reset();
    vm.load_program(&[0x60, 0x0E, 0xE0, 0x9E, 0x00, 0x00, 0xE0, 0xA1]).unwrap();
    vm.set_key(KeyCode::KeyE, true);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().pc(), 0x208);
}

#[test]
#[rustfmt::skip]
fn test_key_wait_resumes() {
    let mut vm = vm_with(&[
        0xF4, 0x0A, // LD v4, K
        0x65, 0x01, // LD v5, 1
    ]);

    assert_eq!(vm.run_steps(10), Ok(Flow::KeyWait));
    assert!(vm.is_waiting_for_key());
    assert_eq!(vm.cpu().pc(), MEM_START + 2);

    // Timers keep running while the machine waits.
    vm.tick_timers();
    assert_eq!(vm.step(), Ok(Flow::KeyWait));
    assert_eq!(vm.cpu().pc(), MEM_START + 2);

    vm.set_key_index(0xB, true).unwrap();
    assert_eq!(vm.step(), Ok(Flow::Ok));
    assert_eq!(vm.cpu().register(4), 0xB);
    assert!(!vm.is_waiting_for_key());

    vm.step().unwrap();
    assert_eq!(vm.cpu().register(5), 1);
    assert_eq!(vm.cpu().pc(), MEM_START + 4);
}

#[test]
fn test_set_key_index_range() {
    let mut vm = vm_with(&[]);
    assert!(vm.set_key_index(0xF, true).is_ok());
    assert_eq!(
        vm.set_key_index(0x10, true),
        Err(Chip8Error::InvalidKey(InvalidKeyCode(0x10)))
    );
}
