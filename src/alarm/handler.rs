// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The SIGALRM handler and the lock-free state it shares with the main
//! line of execution.
//!
//! The handler may interrupt arbitrary code, so its body is restricted to
//! async-signal-safe operations: raw `read`/`write`, atomics, and copies
//! into a fixed buffer. Anything that allocates, locks, or touches stdio
//! happens on the main line instead, via [`take_message`] and
//! [`fired_count`].
//!
//! The registration is persistent: once armed, the handler stays armed
//! across deliveries, and each new alarm request reuses it. [`disarm`] is
//! the explicit opt-out.

use std::{
    cell::UnsafeCell,
    os::fd::{BorrowedFd, FromRawFd, IntoRawFd, OwnedFd},
    sync::atomic::{AtomicI32, AtomicU8, AtomicUsize, Ordering},
};

use nix::{
    sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal},
    unistd::{read, write},
};

use crate::alarm::{
    channel::MAX_MESSAGE_LEN,
    errors::{AlarmError, AlarmResult},
};

const SLOT_EMPTY: u8 = 0;
const SLOT_READY: u8 = 1;

/// Fixed-size hand-off cell, written by the signal handler and drained by
/// the main line of execution.
struct MessageSlot {
    state: AtomicU8,
    len: AtomicUsize,
    bytes: UnsafeCell<[u8; MAX_MESSAGE_LEN]>,
}

// Single writer: the handler, with SIGALRM masked while it runs. Readers
// synchronize on `state`.
unsafe impl Sync for MessageSlot {}

impl MessageSlot {
    const fn new() -> MessageSlot {
        MessageSlot {
            state: AtomicU8::new(SLOT_EMPTY),
            len: AtomicUsize::new(0),
            bytes: UnsafeCell::new([0; MAX_MESSAGE_LEN]),
        }
    }

    /// Store `msg`, truncating at the slot size. Async-signal-safe.
    fn store(&self, msg: &[u8]) {
        let count = msg.len().min(MAX_MESSAGE_LEN);
        // SAFETY: the handler is the only writer and cannot interrupt
        // itself, so the buffer is never written concurrently.
        unsafe {
            (&mut (*self.bytes.get()))[..count].copy_from_slice(&msg[..count]);
        }
        self.len.store(count, Ordering::Relaxed);
        self.state.store(SLOT_READY, Ordering::Release);
    }

    fn take(&self) -> Option<Vec<u8>> {
        if self.state.swap(SLOT_EMPTY, Ordering::Acquire) != SLOT_READY {
            return None;
        }
        let count = self.len.load(Ordering::Relaxed);
        // SAFETY: SLOT_READY was observed, so the store above
        // happened-before this read; with one pending alarm at a time
        // there is no concurrent writer.
        Some(unsafe { (&(*self.bytes.get()))[..count].to_vec() })
    }
}

// The read end of the current message channel; -1 while none is
// published. Replaced wholesale by each new alarm request.
static CHANNEL_FD: AtomicI32 = AtomicI32::new(-1);
static FIRED: AtomicUsize = AtomicUsize::new(0);
static SLOT: MessageSlot = MessageSlot::new();

/// The SIGALRM handler. Runs in the interrupted context.
extern "C" fn alarm_handler(signal: libc::c_int) {
    if signal != Signal::SIGALRM as libc::c_int {
        // A stray registration must not make us surface stale state.
        return;
    }

    let mut buf = [0u8; MAX_MESSAGE_LEN];
    let fd = CHANNEL_FD.load(Ordering::Acquire);
    let count = if fd < 0 {
        0
    } else {
        // SAFETY: the fd stays valid until the next request replaces it.
        let channel = unsafe { BorrowedFd::borrow_raw(fd) };
        read(channel, &mut buf).unwrap_or(0)
    };

    if count > 0 {
        SLOT.store(&buf[..count]);
        // SAFETY: stdout is open for the life of the process.
        let stdout = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };
        let _ = write(stdout, b"ALARM: ");
        let _ = write(stdout, &buf[..count]);
        let _ = write(stdout, b"\n");
    } else {
        // The notification arrived without a payload. Report the
        // condition rather than surface garbage.
        // SAFETY: stderr is open for the life of the process.
        let stderr = unsafe { BorrowedFd::borrow_raw(libc::STDERR_FILENO) };
        let _ = write(stderr, b"alarm fired with no readable message\n");
    }

    FIRED.fetch_add(1, Ordering::Release);
}

/// Register the handler for SIGALRM. Idempotent; `create_alarm_process`
/// calls this before every fork so the handler is in place even for a
/// zero-second delay.
pub fn arm() -> AlarmResult<()> {
    let action = SigAction::new(
        SigHandler::Handler(alarm_handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: alarm_handler restricts itself to async-signal-safe
    // operations.
    unsafe { sigaction(Signal::SIGALRM, &action) }?;
    Ok(())
}

/// Unregister the handler. A notification arriving afterwards is
/// discarded.
///
/// SIG_IGN rather than SIG_DFL: SIGALRM's default action terminates the
/// process, and a timer already in flight must be dropped instead.
pub fn disarm() -> AlarmResult<()> {
    let action = SigAction::new(SigHandler::SigIgn, SaFlags::SA_RESTART, SigSet::empty());
    // SAFETY: SIG_IGN carries no handler code.
    unsafe { sigaction(Signal::SIGALRM, &action) }?;
    Ok(())
}

/// Publish the read end of a fresh channel, closing the previous one.
/// Called before the fork so that even a zero-delay timer finds the
/// channel in place.
pub(super) fn publish_channel(fd: OwnedFd) {
    let old = CHANNEL_FD.swap(fd.into_raw_fd(), Ordering::AcqRel);
    if old >= 0 {
        // SAFETY: the old value was produced by into_raw_fd above and no
        // longer has another owner once swapped out.
        drop(unsafe { OwnedFd::from_raw_fd(old) });
    }
}

/// Number of notifications the handler has fired for so far.
pub fn fired_count() -> usize {
    FIRED.load(Ordering::Acquire)
}

/// Drain the most recently delivered message.
///
/// Returns `Ok(None)` when no delivery is pending. The bytes are exactly
/// those the timer process wrote; non-UTF-8 content is reported as a
/// corrupt channel rather than surfaced as a message.
pub fn take_message() -> AlarmResult<Option<String>> {
    match SLOT.take() {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|err| AlarmError::CorruptChannel(err.to_string())),
        None => Ok(None),
    }
}
