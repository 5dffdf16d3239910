// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! SHA-256 accelerator peripheral model.
//!
//! Models the memory-mapped SHA-256 accelerator as seen by a guest: a 4 KiB
//! register window that buffers a message, runs the compression when the
//! control register is written, and exposes the digest through an output
//! window. The register file lives in ordinary memory because the peripheral
//! is modeled rather than physical; accesses arrive through [`read`] and
//! [`write`] the way a system bus would deliver them.
//!
//! Register map (byte offsets within the window):
//!
//! - `0x0000` ID: constant [`DEVICE_ID`], read-only
//! - `0x0008` CTRL: write 1 to hash, 0 to reset
//! - `0x000C` STATUS: 0 idle, 1 digest ready, read-only
//! - `0x0010` INPUT: 1024-byte message window
//! - `0x0410` OUTPUT: 32-byte digest window, read-only
//!
//! The hash runs synchronously: the CTRL write returns only once the digest
//! is in the output window, so a guest never observes a busy state. The
//! hashed message is the prefix of the input window up to the first zero
//! byte. Invalid accesses are logged as guest errors; reads answer
//! [`BAD_ACCESS`] truncated to the access size and nothing changes.
//!
//! [`read`]: Sha256Accel::read
//! [`write`]: Sha256Accel::write

#![no_std]

use log::{debug, warn};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

pub use sha256_soft::DIGEST_LEN;

/// Device identification constant, read back from the ID register.
pub const DEVICE_ID: u32 = 0xFEED_CAFE;
/// Answer to an invalid read, truncated to the access size.
pub const BAD_ACCESS: u32 = 0xDEAD_BEEF;
/// Size of the register window in bytes.
pub const MMIO_LEN: u64 = 0x1000;
/// Capacity of the message input window in bytes.
pub const INPUT_LEN: usize = 1024;

/// CTRL value that starts a hash.
pub const CTRL_START: u32 = 1;
/// CTRL value that resets the accelerator.
pub const CTRL_RESET: u32 = 0;

/// STATUS value while idle.
pub const STATUS_IDLE: u32 = 0;
/// STATUS value once the digest is ready.
pub const STATUS_READY: u32 = 1;

/// Register offsets within the MMIO window.
pub mod regs {
    pub const ID: u64 = 0x0000;
    pub const CTRL: u64 = 0x0008;
    pub const STATUS: u64 = 0x000C;
    pub const INPUT: u64 = 0x0010;
    pub const OUTPUT: u64 = 0x0410;
}

register_bitfields![u32,
    STATUS [
        /// Set once the digest in the output window is valid.
        READY OFFSET(0) NUMBITS(1) []
    ]
];

/// One SHA-256 accelerator instance.
pub struct Sha256Accel {
    input: [u8; INPUT_LEN],
    output: [u8; DIGEST_LEN],
    control: InMemoryRegister<u32>,
    status: InMemoryRegister<u32, STATUS::Register>,
}

impl Sha256Accel {
    pub fn new() -> Sha256Accel {
        Sha256Accel {
            input: [0; INPUT_LEN],
            output: [0; DIGEST_LEN],
            control: InMemoryRegister::new(0),
            status: InMemoryRegister::new(0),
        }
    }

    /// Cold reset, as issued by the embedding machine: both windows
    /// cleared, control and status idle.
    pub fn reset(&mut self) {
        self.control.set(CTRL_RESET);
        self.clear();
    }

    /// Whether the digest in the output window is valid.
    pub fn ready(&self) -> bool {
        self.status.is_set(STATUS::READY)
    }

    /// Handles a guest read of `size` bytes at `offset`.
    ///
    /// Register offsets return the register value masked to the access
    /// size. Window reads assemble bytes little-endian and must lie fully
    /// inside the window. Anything else is a guest error: logged, answered
    /// with [`BAD_ACCESS`], no state change.
    pub fn read(&self, offset: u64, size: usize) -> u64 {
        if !matches!(size, 1 | 2 | 4) {
            warn!("sha256-accel: invalid read size {} at {:#06x}", size, offset);
            return truncate(BAD_ACCESS, size);
        }

        match offset {
            regs::ID => truncate(DEVICE_ID, size),
            regs::CTRL => truncate(self.control.get(), size),
            regs::STATUS => truncate(self.status.get(), size),
            _ if window_contains(regs::INPUT, INPUT_LEN, offset) => {
                match read_window(&self.input, regs::INPUT, offset, size) {
                    Some(value) => value,
                    None => {
                        warn!("sha256-accel: input read out of bounds at {:#06x}", offset);
                        truncate(BAD_ACCESS, size)
                    }
                }
            }
            _ if window_contains(regs::OUTPUT, DIGEST_LEN, offset) => {
                match read_window(&self.output, regs::OUTPUT, offset, size) {
                    Some(value) => value,
                    None => {
                        warn!("sha256-accel: output read out of bounds at {:#06x}", offset);
                        truncate(BAD_ACCESS, size)
                    }
                }
            }
            _ => {
                warn!("sha256-accel: invalid read address {:#06x}", offset);
                truncate(BAD_ACCESS, size)
            }
        }
    }

    /// Handles a guest write of `size` bytes at `offset`.
    ///
    /// A CTRL write of [`CTRL_START`] hashes the current effective input
    /// into the output window before returning; [`CTRL_RESET`] clears both
    /// windows; any other value is stored with no further effect. Input
    /// window writes store bytes little-endian and must lie fully inside
    /// the window, so no partial write is ever observable. Writes anywhere
    /// else (including the read-only registers) are guest errors: logged
    /// and dropped.
    pub fn write(&mut self, offset: u64, value: u64, size: usize) {
        if !matches!(size, 1 | 2 | 4) {
            warn!("sha256-accel: invalid write size {} at {:#06x}", size, offset);
            return;
        }

        match offset {
            regs::CTRL => {
                let value = value as u32;
                self.control.set(value);
                match value {
                    CTRL_START => self.start(),
                    CTRL_RESET => self.clear(),
                    _ => {}
                }
            }
            _ if window_contains(regs::INPUT, INPUT_LEN, offset) => {
                let at = (offset - regs::INPUT) as usize;
                if at + size > INPUT_LEN {
                    warn!("sha256-accel: input write out of bounds at {:#06x}", offset);
                    return;
                }
                for i in 0..size {
                    self.input[at + i] = (value >> (8 * i)) as u8;
                }
            }
            _ => {
                warn!("sha256-accel: invalid write address {:#06x}", offset);
            }
        }
    }

    // The hashed message: the prefix of the input window up to the first
    // zero byte, or the whole window when none is present.
    fn effective_input(&self) -> &[u8] {
        match self.input.iter().position(|&byte| byte == 0) {
            Some(length) => &self.input[..length],
            None => &self.input[..],
        }
    }

    fn start(&mut self) {
        let message = self.effective_input();
        debug!("sha256-accel: hashing {} bytes", message.len());
        let digest = sha256_soft::hash(message);
        self.output = digest;
        self.status.write(STATUS::READY::SET);
    }

    fn clear(&mut self) {
        debug!("sha256-accel: reset");
        self.input = [0; INPUT_LEN];
        self.output = [0; DIGEST_LEN];
        self.status.set(STATUS_IDLE);
    }
}

impl Default for Sha256Accel {
    fn default() -> Sha256Accel {
        Sha256Accel::new()
    }
}

fn window_contains(base: u64, length: usize, offset: u64) -> bool {
    offset >= base && offset < base + length as u64
}

// Assembles a little-endian read from a byte window, or None when the
// access does not lie fully inside it.
fn read_window(window: &[u8], base: u64, offset: u64, size: usize) -> Option<u64> {
    let at = (offset - base) as usize;
    if at + size > window.len() {
        return None;
    }
    let mut value = 0;
    for (i, byte) in window[at..at + size].iter().enumerate() {
        value |= u64::from(*byte) << (8 * i);
    }
    Some(value)
}

fn truncate(value: u32, size: usize) -> u64 {
    let value = match size {
        1 => value & 0xff,
        2 => value & 0xffff,
        _ => value,
    };
    u64::from(value)
}
