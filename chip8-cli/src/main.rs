//! Entrypoint for CLI
use std::{env, error::Error, fs, time::Instant};

use chip8_machine::{prelude::*, IMPL_VERSION};
use log::{error, info, warn};

mod args;
mod error;

use self::{
    args::{Cmd, RunArgs},
    error::AppError,
};

static USAGE: &str = r#"
usage: chip8 run FILE [OPTIONS]

commands:
    run     Run the target ROM file headless, and print the final display

options:
    --hz N          Instructions executed per second, 0 runs unthrottled (default 500)
    --cycles N      Number of instructions to execute (default 2000)
    --seed N        Seed for the random number generator
    --keys HEX      Keys to press, in order, whenever the program waits for input

environment:
    RUST_LOG        Log level, eg. debug

examples:
    chip8 run maze.rom
    chip8 run pong.rom --hz 0 --cycles 10000 --keys 5
"#;

fn run_bytecode(args: RunArgs) -> Result<(), AppError> {
    let RunArgs {
        filepath,
        conf,
        cycles,
        mut keys,
    } = args;

    info!("running {filepath}");

    let bytecode = fs::read(&filepath)?;

    let mut vm = Chip8Vm::new(conf);
    vm.load_program(bytecode.as_slice())?;

    // Instruction execution and the 60Hz timers run on separate clocks.
    let mut cpu_clock = Clock::from_hz(vm.config().clock_frequency.unwrap_or_default());
    let mut timer_clock = Clock::timers();
    let mut buzzer = false;
    let mut held_key: Option<KeyCode> = None;
    let mut draw_count = 0_usize;

    let start = Instant::now();

    for _ in 0..cycles {
        cpu_clock.wait();

        while timer_clock.tick() {
            vm.tick_timers();
        }

        // Buzzer should be on while sound timer counts down,
        // then turned off when the timer reaches zero.
        if vm.sound_active() != buzzer {
            buzzer = vm.sound_active();
            info!("buzzer {}", if buzzer { "on" } else { "off" });
        }

        if vm.is_waiting_for_key() && held_key.is_none() {
            match keys.pop_front() {
                Some(key) => {
                    info!("pressing {key}");
                    vm.set_key(key, true);
                    held_key = Some(key);
                }
                None => {
                    warn!("program is waiting for input, but no keys are left");
                    break;
                }
            }
        }

        match vm.step() {
            Ok(Flow::Draw) => draw_count += 1,
            Ok(_) => {}
            Err(err) => {
                error!("halted at 0x{:04X}: {err}", vm.cpu().pc());
                println!("{}", vm.dump_display());
                return Err(err.into());
            }
        }

        // Release the key once the machine has taken it.
        if !vm.is_waiting_for_key() {
            if let Some(key) = held_key.take() {
                vm.set_key(key, false);
            }
        }
    }

    let end = Instant::now();

    println!(
        "time taken: {}ms, {} draws",
        end.duration_since(start).as_nanos() as f64 / 1000000.0,
        draw_count
    ); // to millis
    println!("{}", vm.dump_display());

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init()?;

    match args::parse_args(env::args().skip(1)) {
        Ok(Cmd::Run(args)) => run_bytecode(args)?,
        Err(err) if err.is_usage() => {
            eprintln!("{}", err.kind);
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}
