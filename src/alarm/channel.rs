// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// The message side channel. A raw signal carries no payload, so each alarm
// request gets a fresh pipe: the timer process writes the message to the
// write end, the signal handler drains the read end. A single write of at
// most PIPE_BUF bytes is atomic, so the handler can never observe a
// partially written message once the signal has arrived.

use std::os::fd::OwnedFd;

use nix::{fcntl::OFlag, unistd::pipe2};

use crate::alarm::errors::AlarmResult;

/// Largest message the channel can carry.
///
/// Bounded by PIPE_BUF so that the timer process delivers the whole
/// message with one atomic write.
pub const MAX_MESSAGE_LEN: usize = libc::PIPE_BUF;

/// A one-shot pipe carrying a single alarm message across the fork
/// boundary.
///
/// Both ends are non-blocking: the write end because a message of at most
/// `MAX_MESSAGE_LEN` bytes always fits into an empty pipe, the read end
/// because the handler must never block inside a signal context.
#[derive(Debug)]
pub struct MessageChannel {
    read: OwnedFd,
    write: OwnedFd,
}

impl MessageChannel {
    pub fn create() -> AlarmResult<MessageChannel> {
        let (read, write) = pipe2(OFlag::O_NONBLOCK | OFlag::O_CLOEXEC)?;
        Ok(MessageChannel { read, write })
    }

    /// Split into (read end, write end).
    pub fn split(self) -> (OwnedFd, OwnedFd) {
        (self.read, self.write)
    }
}

#[cfg(test)]
mod tests {
    use nix::unistd::{read, write};

    use super::*;

    #[test]
    /// Create a channel.
    /// Write a message on the write end and read it back from the read
    /// end. Verify the bytes survive unchanged and arrive in one read.
    fn test_channel_carries_message() {
        let (read_end, write_end) = MessageChannel::create().unwrap().split();

        let msg = b"wake up";
        assert_eq!(write(&write_end, msg).unwrap(), msg.len());

        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let count = read(&read_end, &mut buf).unwrap();
        assert_eq!(&buf[..count], msg);
    }

    #[test]
    /// Reading from an empty channel must not block; it fails with EAGAIN.
    fn test_empty_channel_does_not_block() {
        let (read_end, _write_end) = MessageChannel::create().unwrap().split();

        let mut buf = [0u8; 16];
        assert_eq!(
            read(&read_end, &mut buf).unwrap_err(),
            nix::errno::Errno::EAGAIN
        );
    }
}
