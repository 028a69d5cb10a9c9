// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub use self::{
    channel::MAX_MESSAGE_LEN,
    errors::{AlarmError, AlarmResult},
    handler::{arm, disarm, fired_count, take_message},
    spawn::{create_alarm_process, spawn_alarm, AlarmHandle},
    types::{AlarmRequest, Delivery},
};

mod channel;
mod errors;
mod handler;
mod spawn;
mod timer;
mod types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
