// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Alarm scheduling: validate the request, arm the handler, set up the
//! message channel, and fork the timer process.

use log::debug;

use nix::{
    errno::Errno,
    sys::{
        signal::{kill, Signal},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::{fork, getpid, ForkResult, Pid},
};

use crate::alarm::{
    channel::MessageChannel,
    errors::{AlarmError, AlarmResult},
    handler,
    timer::{self, EXIT_DELIVERED},
    types::{AlarmRequest, Delivery},
};

/// Handle on a spawned timer process.
///
/// Dropping the handle does not reap the timer; call [`wait`] or
/// [`cancel`] to avoid leaving a zombie behind.
///
/// [`wait`]: AlarmHandle::wait
/// [`cancel`]: AlarmHandle::cancel
#[derive(Debug)]
pub struct AlarmHandle {
    pid: Pid,
}

impl AlarmHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Block until the timer process exits and report what became of the
    /// notification.
    pub fn wait(&self) -> AlarmResult<Delivery> {
        match waitpid(self.pid, None)? {
            WaitStatus::Exited(_, code) if code == EXIT_DELIVERED => Ok(Delivery::Delivered),
            WaitStatus::Exited(_, _) | WaitStatus::Signaled(_, _, _) => Ok(Delivery::Lost),
            status => Err(AlarmError::Msg(format!(
                "timer process {} changed state unexpectedly: {:?}",
                self.pid, status
            ))),
        }
    }

    /// Non-blocking variant of [`wait`](AlarmHandle::wait); `None` while
    /// the timer is still sleeping.
    pub fn try_wait(&self) -> AlarmResult<Option<Delivery>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::StillAlive => Ok(None),
            WaitStatus::Exited(_, code) if code == EXIT_DELIVERED => {
                Ok(Some(Delivery::Delivered))
            }
            WaitStatus::Exited(_, _) | WaitStatus::Signaled(_, _, _) => Ok(Some(Delivery::Lost)),
            status => Err(AlarmError::Msg(format!(
                "timer process {} changed state unexpectedly: {:?}",
                self.pid, status
            ))),
        }
    }

    /// Best-effort cancellation: terminate the timer process and reap it.
    ///
    /// Not atomic against a notification already in flight; a request
    /// cancelled in that window is still delivered.
    pub fn cancel(self) -> AlarmResult<()> {
        match kill(self.pid, Signal::SIGTERM) {
            // Already exited on its own.
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(err) => return Err(AlarmError::Nix(err)),
        }
        waitpid(self.pid, None)?;
        Ok(())
    }
}

/// Schedule delivery of `message` after `delay_seconds`.
///
/// The SIGALRM handler is armed and a fresh message channel published
/// before the fork, so even a zero-second delay cannot outrun the
/// registration. Returns as soon as the timer process is running; the
/// caller is never blocked for the delay itself.
pub fn create_alarm_process(delay_seconds: i64, message: &str) -> AlarmResult<AlarmHandle> {
    spawn_alarm(AlarmRequest::new(delay_seconds, message)?)
}

/// [`create_alarm_process`] for a pre-validated request.
pub fn spawn_alarm(request: AlarmRequest) -> AlarmResult<AlarmHandle> {
    handler::arm()?;
    let (read_end, write_end) = MessageChannel::create()?.split();
    handler::publish_channel(read_end);

    // Captured before the fork; getppid() in the child would race with
    // parent death and re-parenting.
    let target = getpid();

    // SAFETY: the child branch calls only async-signal-safe functions
    // (sleep, write, kill, _exit) before exiting.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            drop(write_end);
            debug!(
                "timer process {} spawned: {}s delay, {} byte message",
                child,
                request.delay_seconds(),
                request.message().len()
            );
            Ok(AlarmHandle { pid: child })
        }
        Ok(ForkResult::Child) => {
            let status = timer::run_timer(&request, target, write_end);
            // _exit: no atexit handlers and no unwinding in a fork child.
            unsafe { libc::_exit(status) }
        }
        Err(err) => Err(AlarmError::Spawn(err)),
    }
}
