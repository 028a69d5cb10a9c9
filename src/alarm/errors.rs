// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{error::Error, fmt};

pub type AlarmResult<T> = Result<T, AlarmError>;

#[derive(Debug)]
pub enum AlarmError {
    Msg(String),
    /// The request could not be accepted; nothing was spawned.
    InvalidArgument(String),
    /// Creating the timer process failed.
    Spawn(nix::Error),
    /// The handler-side channel held no usable message.
    CorruptChannel(String),
    Nix(nix::Error),
}

impl fmt::Display for AlarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AlarmError::Msg(ref s) => write!(f, "Error: {}", s),
            AlarmError::InvalidArgument(ref s) => write!(f, "Invalid argument: {}", s),
            AlarmError::Spawn(ref err) => write!(f, "Failed to spawn timer process: {}", err),
            AlarmError::CorruptChannel(ref s) => write!(f, "Corrupt message channel: {}", s),
            AlarmError::Nix(ref err) => write!(f, "Nix error: {}", err),
        }
    }
}

impl Error for AlarmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            AlarmError::Msg(_)
            | AlarmError::InvalidArgument(_)
            | AlarmError::CorruptChannel(_) => None,
            AlarmError::Spawn(ref err) | AlarmError::Nix(ref err) => Some(err),
        }
    }
}

impl From<nix::Error> for AlarmError {
    fn from(err: nix::Error) -> AlarmError {
        AlarmError::Nix(err)
    }
}
