//! A DS1302 simulated at the pin level.
//!
//! Three pins and a delay share one `Chip`. The delay advances virtual time
//! and the chip checks datasheet timings against it, so a driver that is too
//! fast or drives the I/O line against the chip shows up in `violations`.
#![allow(dead_code)]

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;

use ds1302_rtc::registers::{CLOCK_BURST_LEN, CLOCK_BURST_READ, CLOCK_BURST_WRITE, CLOCK_HALT};
use ds1302_rtc::{BitBangDs1302, IoLine};
use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::{ErrorType, InputPin, OutputPin};

const T_CC_NS: u64 = 4_000;
const T_CWH_NS: u64 = 4_000;
const T_CLOCK_NS: u64 = 1_000;
const T_DC_NS: u64 = 200;
const T_CDD_NS: u64 = 800;

/// Seconds .. control, then trickle charge.
const REGISTERS: usize = 9;
const CONTROL_INDEX: usize = 7;
const WRITE_PROTECT: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Command,
    Write,
    Read,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Io,
    Clk,
    Ce,
}

pub struct Chip {
    pub regs: [u8; REGISTERS],
    pub violations: Vec<&'static str>,
    pub contention: bool,
    /// Completed CE high periods.
    pub transfers: usize,
    /// Advance the clock after this many more data output edges.
    pub tick_after_read_edges: Option<u32>,

    now_ns: u64,
    ce: bool,
    clk: bool,
    host_level: bool,
    host_drives: bool,
    chip_out: Option<bool>,
    out_valid_ns: u64,
    io_changed_ns: u64,
    ce_rise_ns: u64,
    ce_fall_ns: Option<u64>,
    clk_edge_ns: Option<u64>,
    first_clk_pending: bool,

    phase: Phase,
    cmd: u8,
    shift: u8,
    bits: u8,
    out_bits: u8,
    byte_index: usize,
    latch: [u8; CLOCK_BURST_LEN],
}

impl Chip {
    /// Power on state: clock halted and write protected.
    pub fn new() -> Rc<RefCell<Chip>> {
        Rc::new(RefCell::new(Chip {
            regs: [0x80, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00, 0x80, 0x5C],
            violations: Vec::new(),
            contention: false,
            transfers: 0,
            tick_after_read_edges: None,
            now_ns: 0,
            ce: false,
            clk: false,
            host_level: false,
            host_drives: false,
            chip_out: None,
            out_valid_ns: 0,
            io_changed_ns: 0,
            ce_rise_ns: 0,
            ce_fall_ns: None,
            clk_edge_ns: None,
            first_clk_pending: false,
            phase: Phase::Idle,
            cmd: 0,
            shift: 0,
            bits: 0,
            out_bits: 0,
            byte_index: 0,
            latch: [0; CLOCK_BURST_LEN],
        }))
    }

    /// One second passes, unless the clock is halted. Carries up to the date.
    pub fn tick(&mut self) {
        if self.regs[0] & CLOCK_HALT != 0 {
            return;
        }
        let (s, carry) = bcd_increment(self.regs[0], 0x59);
        self.regs[0] = s;
        if !carry {
            return;
        }
        let (m, carry) = bcd_increment(self.regs[1], 0x59);
        self.regs[1] = m;
        if !carry {
            return;
        }
        let (h, carry) = bcd_increment(self.regs[2], 0x23);
        self.regs[2] = h;
        if carry {
            self.regs[3] = bcd_increment(self.regs[3], 0x99).0;
        }
    }

    fn advance(&mut self, ns: u64) {
        self.now_ns += ns;
    }

    fn violation(&mut self, what: &'static str) {
        self.violations.push(what);
    }

    fn drive(&mut self, line: Line, level: bool) {
        match line {
            Line::Ce => self.set_ce(level),
            Line::Clk => self.set_clk(level),
            Line::Io => {
                if self.host_level != level {
                    self.io_changed_ns = self.now_ns;
                }
                self.host_level = level;
            }
        }
    }

    fn set_direction(&mut self, output: bool) {
        if output && self.ce && self.chip_out.is_some() {
            self.contention = true;
        }
        if output && !self.host_drives {
            self.io_changed_ns = self.now_ns;
        }
        self.host_drives = output;
    }

    fn sample(&mut self) -> bool {
        if self.host_drives {
            return self.host_level;
        }
        if self.chip_out.is_some() && self.now_ns < self.out_valid_ns {
            self.violation("tCDD");
        }
        // internal pull-down
        self.chip_out.unwrap_or(false)
    }

    fn set_ce(&mut self, level: bool) {
        if level == self.ce {
            return;
        }
        self.ce = level;
        if level {
            if let Some(fall) = self.ce_fall_ns {
                if self.now_ns - fall < T_CWH_NS {
                    self.violation("tCWH");
                }
            }
            if self.clk {
                self.violation("SCLK high at CE rise");
            }
            self.ce_rise_ns = self.now_ns;
            self.first_clk_pending = true;
            self.clk_edge_ns = None;
            self.phase = Phase::Command;
            self.shift = 0;
            self.bits = 0;
        } else {
            self.ce_fall_ns = Some(self.now_ns);
            self.phase = Phase::Idle;
            self.chip_out = None;
            self.transfers += 1;
        }
    }

    fn set_clk(&mut self, level: bool) {
        if level == self.clk {
            return;
        }
        self.clk = level;
        if !self.ce {
            return;
        }
        if let Some(edge) = self.clk_edge_ns {
            if self.now_ns - edge < T_CLOCK_NS {
                self.violation("tCH/tCL");
            }
        }
        self.clk_edge_ns = Some(self.now_ns);
        if level {
            self.rising();
        } else {
            self.falling();
        }
    }

    fn rising(&mut self) {
        if self.first_clk_pending {
            self.first_clk_pending = false;
            if self.now_ns - self.ce_rise_ns < T_CC_NS {
                self.violation("tCC");
            }
        }
        if !matches!(self.phase, Phase::Command | Phase::Write) {
            return;
        }
        if self.host_drives && self.now_ns - self.io_changed_ns < T_DC_NS {
            self.violation("tDC");
        }
        let bit = self.host_drives && self.host_level;
        self.shift |= u8::from(bit) << self.bits;
        self.bits += 1;
        if self.bits == 8 {
            let byte = self.shift;
            self.shift = 0;
            self.bits = 0;
            self.byte_done(byte);
        }
    }

    fn byte_done(&mut self, byte: u8) {
        match self.phase {
            Phase::Command => {
                self.cmd = byte;
                self.byte_index = 0;
                self.out_bits = 0;
                if byte & 0x80 == 0 {
                    self.phase = Phase::Idle;
                } else if byte & 0x01 != 0 {
                    if byte == CLOCK_BURST_READ {
                        self.latch.copy_from_slice(&self.regs[..CLOCK_BURST_LEN]);
                    }
                    self.phase = Phase::Read;
                } else {
                    self.phase = Phase::Write;
                }
            }
            Phase::Write => {
                if self.cmd == CLOCK_BURST_WRITE {
                    if self.byte_index < CLOCK_BURST_LEN {
                        self.store(self.byte_index, byte);
                    }
                } else if self.byte_index == 0 {
                    self.store(register_index(self.cmd), byte);
                }
                self.byte_index += 1;
            }
            _ => {}
        }
    }

    fn store(&mut self, index: usize, byte: u8) {
        if index >= REGISTERS {
            return;
        }
        if index != CONTROL_INDEX && self.regs[CONTROL_INDEX] & WRITE_PROTECT != 0 {
            return;
        }
        self.regs[index] = byte;
    }

    fn falling(&mut self) {
        if self.phase != Phase::Read {
            return;
        }
        let byte = if self.cmd == CLOCK_BURST_READ {
            self.latch.get(self.byte_index).copied().unwrap_or(0)
        } else {
            self.regs.get(register_index(self.cmd)).copied().unwrap_or(0)
        };
        if self.host_drives {
            self.contention = true;
        }
        self.chip_out = Some(byte & (1 << self.out_bits) != 0);
        self.out_valid_ns = self.now_ns + T_CDD_NS;
        self.out_bits += 1;
        if self.out_bits == 8 {
            self.out_bits = 0;
            self.byte_index += 1;
        }

        if let Some(n) = self.tick_after_read_edges {
            if n <= 1 {
                self.tick_after_read_edges = None;
                self.tick();
            } else {
                self.tick_after_read_edges = Some(n - 1);
            }
        }
    }
}

fn register_index(cmd: u8) -> usize {
    usize::from((cmd >> 1) & 0x1F)
}

/// Increments a BCD byte, wrapping to zero after `max`. Bit 7 is kept.
fn bcd_increment(byte: u8, max: u8) -> (u8, bool) {
    let flag = byte & 0x80;
    let value = byte & 0x7F;
    if value >= max {
        return (flag, true);
    }
    let next = if value & 0x0F == 9 {
        (value & 0xF0) + 0x10
    } else {
        value + 1
    };
    (flag | next, false)
}

pub struct SimPin {
    chip: Rc<RefCell<Chip>>,
    line: Line,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.chip.borrow_mut().drive(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.chip.borrow_mut().drive(self.line, true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.chip.borrow_mut().sample())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

impl IoLine for SimPin {
    fn set_as_output(&mut self) -> Result<(), Infallible> {
        self.chip.borrow_mut().set_direction(true);
        Ok(())
    }

    fn set_as_input(&mut self) -> Result<(), Infallible> {
        self.chip.borrow_mut().set_direction(false);
        Ok(())
    }
}

pub struct SimDelay {
    chip: Rc<RefCell<Chip>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.chip.borrow_mut().advance(u64::from(ns));
    }
}

pub type SimBus = BitBangDs1302<SimPin, SimPin, SimPin, SimDelay>;

pub fn bus(chip: &Rc<RefCell<Chip>>) -> SimBus {
    let pin = |line| SimPin {
        chip: chip.clone(),
        line,
    };
    BitBangDs1302::new(
        pin(Line::Io),
        pin(Line::Clk),
        pin(Line::Ce),
        SimDelay { chip: chip.clone() },
    )
}
