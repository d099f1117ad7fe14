//! LC-3 VM - CLI Entry Point
//!
//! `lc3-vm [OPTIONS] <IMAGE>...` loads each object image in order and runs
//! from the entry address until the program halts.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::{debug, warn};

use lc3::cpu::registers::PC_START;
use lc3::{
    load_image, CancelToken, Console, Cpu, CpuError, DeviceError, RawModeGuard, StopReason,
    StreamTerminal, Terminal, TrapTable,
};

/// Instructions executed between terminal pumps, which is how Ctrl-C is seen.
const SLICE: u64 = 10_000;

#[derive(Parser)]
#[command(name = "lc3-vm")]
#[command(version)]
#[command(about = "An interpreter for the LC-3 16-bit teaching computer")]
struct Cli {
    /// Object images to load, in order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Entry address, hex (x3000, 0x3000) or decimal
    #[arg(short, long, default_value = "x3000", value_parser = parse_address)]
    entry: u16,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_cycles: Option<u64>,

    /// Write a JSON snapshot of the registers here on exit
    #[arg(long)]
    dump_state: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Process exit statuses.
mod status {
    pub const HALTED: u8 = 0;
    pub const LOAD_FAILED: u8 = 1;
    pub const MACHINE_ERROR: u8 = 3;
    pub const BUDGET_EXHAUSTED: u8 = 4;
    pub const INTERRUPTED: u8 = 130;
}

fn parse_address(s: &str) -> Result<u16, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('x'))
        .or_else(|| s.strip_prefix('X'));
    match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse::<u16>(),
    }
    .map_err(|e| format!("invalid address `{}`: {}", s, e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut cpu = Cpu::new();
    for path in &cli.images {
        let loaded = load_image(path).and_then(|image| image.load_into(&mut cpu));
        if let Err(e) = loaded {
            eprintln!("Failed to load image {}: {}", path.display(), e);
            return ExitCode::from(status::LOAD_FAILED);
        }
    }

    if cli.entry != PC_START {
        debug!("entry point x{:04X}", cli.entry);
    }
    cpu.regs.pc = cli.entry;

    let cancel = CancelToken::new();
    let result = if std::io::stdin().is_terminal() {
        let _raw = RawModeGuard::enable()
            .map_err(|e| warn!("running without raw mode: {}", e))
            .ok();
        let mut host = TrapTable::new(Console::new(cancel.clone()));
        run(&mut cpu, &mut host, &cancel, cli.max_cycles)
    } else {
        debug!("stdin is not a terminal, reading console input from it directly");
        let mut host = TrapTable::new(StreamTerminal::stdio());
        run(&mut cpu, &mut host, &cancel, cli.max_cycles)
    };

    if let Some(path) = &cli.dump_state {
        dump_state(&cpu, path);
    }

    match result {
        Ok(StopReason::Halted) => ExitCode::from(status::HALTED),
        Ok(StopReason::Cancelled) | Err(CpuError::Device(DeviceError::Interrupted)) => {
            eprintln!();
            ExitCode::from(status::INTERRUPTED)
        }
        Ok(StopReason::BudgetExhausted) => {
            eprintln!(
                "Reached max cycles limit ({}) at PC=x{:04X}",
                cpu.cycles, cpu.regs.pc
            );
            ExitCode::from(status::BUDGET_EXHAUSTED)
        }
        Err(e) => {
            eprintln!("Machine error after {} cycles: {}", cpu.cycles, e);
            eprintln!("{:?}", cpu.regs);
            ExitCode::from(status::MACHINE_ERROR)
        }
    }
}

/// Run in slices, draining console events in between so Ctrl-C is seen
/// even by programs that never read the keyboard.
fn run<T: Terminal>(
    cpu: &mut Cpu,
    host: &mut TrapTable<T>,
    cancel: &CancelToken,
    max_cycles: Option<u64>,
) -> Result<StopReason, CpuError> {
    loop {
        let slice = match max_cycles {
            Some(max) if cpu.cycles >= max => return Ok(StopReason::BudgetExhausted),
            Some(max) => SLICE.min(max - cpu.cycles),
            None => SLICE,
        };

        match cpu.run_limited(host, cancel, slice)? {
            StopReason::BudgetExhausted => host.terminal_mut().pump()?,
            reason => return Ok(reason),
        }
    }
}

fn dump_state(cpu: &Cpu, path: &Path) {
    let written = serde_json::to_string_pretty(&cpu.snapshot())
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
    if let Err(e) = written {
        eprintln!("Failed to write state to {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("x3000"), Ok(0x3000));
        assert_eq!(parse_address("0x3000"), Ok(0x3000));
        assert_eq!(parse_address("0XFE00"), Ok(0xFE00));
        assert_eq!(parse_address("12288"), Ok(0x3000));
        assert!(parse_address("x10000").is_err());
        assert!(parse_address("start").is_err());
    }

    #[test]
    fn test_cli_requires_image() {
        assert!(Cli::try_parse_from(["lc3-vm"]).is_err());

        let cli = Cli::try_parse_from(["lc3-vm", "os.obj", "prog.obj", "-vv"]).unwrap();
        assert_eq!(cli.images.len(), 2);
        assert_eq!(cli.entry, 0x3000);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.max_cycles, None);
    }
}
