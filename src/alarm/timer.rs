// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// The child-side timer routine. The timer process is a fork of a possibly
// multi-threaded parent, so everything here must stay async-signal-safe:
// no allocation, no locks, no stdio, no logging.

use std::os::fd::OwnedFd;

use nix::{
    sys::signal::{kill, signal, SigHandler, Signal},
    unistd::{sleep, write, Pid},
};

use crate::alarm::types::AlarmRequest;

/// Exit status of a timer process whose notification reached the parent.
pub(super) const EXIT_DELIVERED: i32 = 0;
/// Exit status when the parent was gone at fire time.
pub(super) const EXIT_LOST: i32 = 1;

/// Wait out the delay, write the message, then raise the notification.
///
/// The write strictly precedes the kill, so by the time the signal can
/// arrive the whole payload is in the pipe. If the parent is gone (EPIPE
/// on the write, ESRCH on the kill) the notification is dropped silently;
/// there is no caller left to report to.
pub(super) fn run_timer(request: &AlarmRequest, target: Pid, channel: OwnedFd) -> i32 {
    // EPIPE instead of death by SIGPIPE when the parent has already
    // closed its read end.
    // SAFETY: SIG_IGN carries no handler code.
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) };

    let mut remaining = request.delay_seconds();
    while remaining > 0 {
        // sleep(2) reports the unslept remainder when interrupted.
        remaining = sleep(remaining);
    }

    let payload = request.message().as_bytes();
    match write(&channel, payload) {
        Ok(count) if count == payload.len() => {}
        Ok(_) | Err(_) => return EXIT_LOST,
    }

    match kill(target, Signal::SIGALRM) {
        Ok(()) => EXIT_DELIVERED,
        Err(_) => EXIT_LOST,
    }
}

#[cfg(test)]
mod tests {
    use nix::unistd::read;

    use crate::alarm::channel::{MessageChannel, MAX_MESSAGE_LEN};

    use super::*;

    #[test]
    /// Run the timer routine in-process with a zero delay and a target
    /// pid that cannot exist. The message must land on the channel in
    /// full before the (failed) notification, and the failure must be
    /// reported as a lost delivery.
    fn test_timer_writes_before_notifying() {
        let request = AlarmRequest::new(0, "nobody home").unwrap();
        let (read_end, write_end) = MessageChannel::create().unwrap().split();

        // Far above any real pid_max, so the kill reports ESRCH.
        let no_such_pid = Pid::from_raw(i32::MAX - 1);
        assert_eq!(run_timer(&request, no_such_pid, write_end), EXIT_LOST);

        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let count = read(&read_end, &mut buf).unwrap();
        assert_eq!(&buf[..count], b"nobody home");
    }
}
