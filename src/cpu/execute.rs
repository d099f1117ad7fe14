//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::decode::{self, Instruction, Opcode, Operand};
use crate::cpu::host::{CancelToken, DeviceError, Host, TrapOutcome};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::{CondFlags, LINK_REGISTER};
use crate::cpu::{Memory, Registers};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (HALT trap).
    Halted,
    /// CPU stopped on a fatal error.
    Error,
}

/// Why a run loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The HALT routine stopped the machine.
    Halted,
    /// The cancel token was tripped.
    Cancelled,
    /// The step budget ran out first.
    BudgetExhausted,
}

/// The LC-3 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Last executed instruction (for diagnostics).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed memory, PC at x3000 and flags at Z.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to its power-on state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Copy a block of words into memory at `origin`.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) -> Result<(), MemoryError> {
        debug!("loading {} words at x{:04X}", program.len(), origin);
        self.mem.load(origin, program)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. Any error leaves the CPU in
    /// [`CpuState::Error`].
    pub fn step(&mut self, host: &mut dyn Host) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.fetch_and_execute(host) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(instr)
            }
            Err(e) => {
                warn!("machine stopped after {} cycles: {}", self.cycles, e);
                self.state = CpuState::Error;
                Err(e)
            }
        }
    }

    fn fetch_and_execute(&mut self, host: &mut dyn Host) -> Result<Instruction, CpuError> {
        // Fetch
        let addr = self.regs.advance_pc();
        let word = self.mem.read(addr, host)?;

        // Decode
        let instr = decode::decode(word);
        trace!("x{:04X}: x{:04X} {:?}", addr, word, instr);

        // Execute
        self.execute(instr, host)?;

        Ok(instr)
    }

    /// Run until the machine halts or `cancel` is tripped.
    pub fn run(&mut self, host: &mut dyn Host, cancel: &CancelToken) -> Result<StopReason, CpuError> {
        self.run_until(host, cancel, None)
    }

    /// Run for at most `max_steps` instructions.
    pub fn run_limited(
        &mut self,
        host: &mut dyn Host,
        cancel: &CancelToken,
        max_steps: u64,
    ) -> Result<StopReason, CpuError> {
        self.run_until(host, cancel, Some(max_steps))
    }

    fn run_until(
        &mut self,
        host: &mut dyn Host,
        cancel: &CancelToken,
        max_steps: Option<u64>,
    ) -> Result<StopReason, CpuError> {
        let limit = max_steps.map(|n| self.cycles.saturating_add(n));

        loop {
            if self.state == CpuState::Halted {
                return Ok(StopReason::Halted);
            }
            if cancel.is_cancelled() {
                debug!("run cancelled at PC=x{:04X}", self.regs.pc);
                return Ok(StopReason::Cancelled);
            }
            if limit.is_some_and(|limit| self.cycles >= limit) {
                return Ok(StopReason::BudgetExhausted);
            }
            self.step(host)?;
        }
    }

    /// Execute a decoded instruction. The PC already points past it.
    fn execute(&mut self, instr: Instruction, host: &mut dyn Host) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, operand } => {
                let result = self.regs.get(sr1).wrapping_add(self.operand(operand));
                self.regs.set_with_flags(dr, result);
            }

            Instruction::And { dr, sr1, operand } => {
                let result = self.regs.get(sr1) & self.operand(operand);
                self.regs.set_with_flags(dr, result);
            }

            Instruction::Not { dr, sr } => {
                let result = !self.regs.get(sr);
                self.regs.set_with_flags(dr, result);
            }

            // ==================== Control Flow ====================

            Instruction::Br { mask, offset } => {
                if mask.intersects(self.regs.cond) {
                    self.regs.pc = self.regs.pc.wrapping_add_signed(offset);
                }
            }

            Instruction::Jmp { base } => {
                self.regs.pc = self.regs.get(base);
            }

            Instruction::Jsr { offset } => {
                let link = self.regs.pc;
                self.regs.set(LINK_REGISTER, link);
                self.regs.pc = link.wrapping_add_signed(offset);
            }

            Instruction::Jsrr { base } => {
                // Read the target first so JSRR R7 jumps to the old R7.
                let target = self.regs.get(base);
                self.regs.set(LINK_REGISTER, self.regs.pc);
                self.regs.pc = target;
            }

            Instruction::Trap { vector } => {
                self.regs.set(LINK_REGISTER, self.regs.pc);
                debug!("trap x{:02X} at PC=x{:04X}", vector, self.regs.pc.wrapping_sub(1));
                if host.trap(vector, &mut self.regs, &mut self.mem)? == TrapOutcome::Halt {
                    debug!("halted after {} cycles", self.cycles + 1);
                    self.state = CpuState::Halted;
                }
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let addr = self.pc_relative(offset);
                let value = self.mem.read(addr, host)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldi { dr, offset } => {
                let addr = self.pc_relative(offset);
                let pointer = self.mem.read(addr, host)?;
                let value = self.mem.read(pointer, host)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldr { dr, base, offset } => {
                let addr = self.regs.get(base).wrapping_add_signed(offset);
                let value = self.mem.read(addr, host)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Lea { dr, offset } => {
                let addr = self.pc_relative(offset);
                self.regs.set_with_flags(dr, addr);
            }

            Instruction::St { sr, offset } => {
                let addr = self.pc_relative(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Sti { sr, offset } => {
                let addr = self.pc_relative(offset);
                let pointer = self.mem.read(addr, host)?;
                self.mem.write(pointer, self.regs.get(sr));
            }

            Instruction::Str { sr, base, offset } => {
                let addr = self.regs.get(base).wrapping_add_signed(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Unsupported(opcode) => {
                let addr = self.regs.pc.wrapping_sub(1);
                return Err(CpuError::BadOpcode { opcode, addr, word: self.mem.peek(addr) });
            }
        }

        Ok(())
    }

    #[inline]
    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Reg(r) => self.regs.get(r),
            Operand::Imm(imm) => imm as u16,
        }
    }

    #[inline]
    fn pc_relative(&self, offset: i16) -> u16 {
        self.regs.pc.wrapping_add_signed(offset)
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Capture registers and counters for reporting.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            registers: *self.regs.gprs(),
            pc: self.regs.pc,
            cond: self.regs.cond,
            state: self.state,
            cycles: self.cycles,
            last_instruction: self.last_instr,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Register-level view of a machine, written by `--dump-state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub registers: [u16; 8],
    pub pc: u16,
    pub cond: CondFlags,
    pub state: CpuState,
    pub cycles: u64,
    pub last_instruction: Option<Instruction>,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("bad opcode {opcode:?} (x{word:04X}) at x{addr:04X}")]
    BadOpcode { opcode: Opcode, addr: u16, word: u16 },

    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}
