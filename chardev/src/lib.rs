// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Character-device front end for the SHA-256 accelerator.
//!
//! Translates a byte-oriented stream session into register accesses on
//! [`Sha256Accel`], the way the character-device driver exposes the
//! peripheral to user programs: a client opens a session, streams up to
//! 1024 message bytes into the input window, issues `START_HASH`, and
//! streams up to 32 digest bytes back out. Control commands cover device
//! identification, status polling, starting a hash, and reset.
//!
//! A session is an exclusive hold on the device; a second open while one is
//! alive fails with [`Error::DeviceUnavailable`]. All accesses the session
//! issues are byte-granular, the canonical access width of the input and
//! output windows. The `START_HASH` command returns only after the digest
//! is in the output window, so a client never needs to poll.

use std::cell::{RefCell, RefMut};

use log::debug;
use sha256_accel::{regs, Sha256Accel, CTRL_RESET, CTRL_START, DIGEST_LEN, INPUT_LEN};
use thiserror::Error;

/// Control command: store the 32-bit device id through the argument.
pub const CMD_GET_ID: u32 = 0;
/// Control command: store the current status through the argument.
pub const CMD_GET_STATUS: u32 = 1;
/// Control command: hash the current input window.
pub const CMD_START_HASH: u32 = 2;
/// Control command: clear the device.
pub const CMD_RESET: u32 = 3;

/// Errors surfaced to clients of the character device.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The device is already held by a session.
    #[error("device unavailable")]
    DeviceUnavailable,
    /// A client-supplied buffer could not be accessed. This cannot arise
    /// for in-process slices; the kind exists for transports that cross an
    /// address-space boundary.
    #[error("user buffer inaccessible")]
    BadUserspace,
    /// A control command outside the defined set.
    #[error("unknown control command {0:#x}")]
    UnknownControl(u32),
}

/// The device node. Owns the accelerator and hands out sessions.
pub struct Chardev {
    device: RefCell<Sha256Accel>,
}

impl Chardev {
    pub fn new(device: Sha256Accel) -> Chardev {
        Chardev {
            device: RefCell::new(device),
        }
    }

    /// Opens a session. At most one session is alive at a time; the borrow
    /// on the device is the busy flag.
    pub fn open(&self) -> Result<Session<'_>, Error> {
        let device = self
            .device
            .try_borrow_mut()
            .map_err(|_| Error::DeviceUnavailable)?;
        debug!("sha256-chardev: session opened");
        Ok(Session { device, cursor: 0 })
    }

    /// Tears down the node, returning the accelerator.
    pub fn into_inner(self) -> Sha256Accel {
        self.device.into_inner()
    }
}

/// One open of the device: an exclusive hold on the accelerator plus the
/// stream cursor. Dropping the session closes it; close has no device-side
/// effect.
pub struct Session<'a> {
    device: RefMut<'a, Sha256Accel>,
    cursor: usize,
}

impl Session<'_> {
    /// Streams `buf` into the input window at the session cursor, one byte
    /// per access, and advances the cursor. At most [`INPUT_LEN`] bytes are
    /// accepted per call; returns the count actually streamed. Successive
    /// writes continue where the last one stopped.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let count = buf.len().min(INPUT_LEN);
        for (i, byte) in buf[..count].iter().enumerate() {
            self.device
                .write(regs::INPUT + (self.cursor + i) as u64, u64::from(*byte), 1);
        }
        self.cursor += count;
        Ok(count)
    }

    /// Streams the digest out of the output window into `buf`, one byte per
    /// access. The cursor rewinds to 0 first, so every read starts at the
    /// beginning of the digest; at most [`DIGEST_LEN`] bytes are returned.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.cursor = 0;
        let count = buf.len().min(DIGEST_LEN);
        for (i, byte) in buf[..count].iter_mut().enumerate() {
            *byte = self.device.read(regs::OUTPUT + i as u64, 1) as u8;
        }
        self.cursor = count;
        Ok(count)
    }

    /// Raw control entry. `CMD_GET_ID` and `CMD_GET_STATUS` store a 32-bit
    /// register read through `arg`; `CMD_START_HASH` returns only once the
    /// digest is ready; `CMD_RESET` clears the device. Any other command
    /// code fails with [`Error::UnknownControl`].
    pub fn control(&mut self, cmd: u32, arg: &mut u32) -> Result<(), Error> {
        match cmd {
            CMD_GET_ID => *arg = self.device.read(regs::ID, 4) as u32,
            CMD_GET_STATUS => *arg = self.device.read(regs::STATUS, 4) as u32,
            CMD_START_HASH => {
                self.device.write(regs::CTRL, u64::from(CTRL_START), 4);
                debug!("sha256-chardev: hash started");
            }
            CMD_RESET => {
                self.device.write(regs::CTRL, u64::from(CTRL_RESET), 4);
                debug!("sha256-chardev: device reset");
            }
            _ => return Err(Error::UnknownControl(cmd)),
        }
        Ok(())
    }

    pub fn get_id(&mut self) -> Result<u32, Error> {
        let mut id = 0;
        self.control(CMD_GET_ID, &mut id)?;
        Ok(id)
    }

    pub fn get_status(&mut self) -> Result<u32, Error> {
        let mut status = 0;
        self.control(CMD_GET_STATUS, &mut status)?;
        Ok(status)
    }

    pub fn start_hash(&mut self) -> Result<(), Error> {
        let mut unused = 0;
        self.control(CMD_START_HASH, &mut unused)
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        let mut unused = 0;
        self.control(CMD_RESET, &mut unused)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        debug!("sha256-chardev: session closed");
    }
}
