// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use crate::alarm::{
    channel::MAX_MESSAGE_LEN,
    errors::{AlarmError, AlarmResult},
};

/// A validated alarm request: deliver `message` after `delay_seconds`.
///
/// Immutable once constructed; the fork hands the timer process its own
/// copy and nothing mutates it afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlarmRequest {
    delay_seconds: u32,
    message: String,
}

impl AlarmRequest {
    /// Validate and construct a request.
    ///
    /// The delay is taken as a signed value so that a caller handing over
    /// unchecked input gets `InvalidArgument` back rather than a silent
    /// wraparound. The message must be non-empty and fit the channel.
    pub fn new(delay_seconds: i64, message: &str) -> AlarmResult<AlarmRequest> {
        if delay_seconds < 0 {
            return Err(AlarmError::InvalidArgument(format!(
                "delay must be non-negative, got {}",
                delay_seconds
            )));
        }
        let delay_seconds = u32::try_from(delay_seconds).map_err(|_| {
            AlarmError::InvalidArgument(format!(
                "delay of {} seconds exceeds the maximum of {}",
                delay_seconds,
                u32::MAX
            ))
        })?;
        if message.is_empty() {
            // A zero-byte payload on the pipe is indistinguishable from a
            // missing payload.
            return Err(AlarmError::InvalidArgument(
                "message must not be empty".into(),
            ));
        }
        if message.len() > MAX_MESSAGE_LEN {
            return Err(AlarmError::InvalidArgument(format!(
                "message of {} bytes exceeds the channel limit of {} bytes",
                message.len(),
                MAX_MESSAGE_LEN
            )));
        }
        Ok(AlarmRequest {
            delay_seconds,
            message: message.to_owned(),
        })
    }

    pub fn delay_seconds(&self) -> u32 {
        self.delay_seconds
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a single alarm request, as reported by the timer process's
/// exit status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
    /// The notification was raised against a live parent.
    Delivered,
    /// The parent was gone at fire time; the notification went nowhere.
    Lost,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Delivery::Delivered => write!(f, "delivered"),
            Delivery::Lost => write!(f, "lost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;

    #[test]
    /// A negative delay is rejected before anything is spawned.
    fn test_negative_delay_rejected() {
        assert_matches!(
            AlarmRequest::new(-1, "too late"),
            Err(AlarmError::InvalidArgument(_))
        );
    }

    #[test]
    /// An empty message cannot be represented on the channel.
    fn test_empty_message_rejected() {
        assert_matches!(
            AlarmRequest::new(5, ""),
            Err(AlarmError::InvalidArgument(_))
        );
    }

    #[test]
    /// A message one byte over the channel limit is rejected; one at the
    /// limit is accepted.
    fn test_message_length_limit() {
        let at_limit = "a".repeat(MAX_MESSAGE_LEN);
        assert_matches!(AlarmRequest::new(0, &at_limit), Ok(_));

        let over_limit = "a".repeat(MAX_MESSAGE_LEN + 1);
        assert_matches!(
            AlarmRequest::new(0, &over_limit),
            Err(AlarmError::InvalidArgument(_))
        );
    }

    proptest! {
        #[test]
        /// For any delay in the representable range and any non-empty
        /// message within the channel limit, construction succeeds and
        /// preserves both fields exactly.
        fn test_valid_requests_roundtrip(
            delay in 0..i64::from(u32::MAX),
            message in "[ -~]{1,64}"
        ) {
            let request = AlarmRequest::new(delay, &message).unwrap();
            prop_assert_eq!(i64::from(request.delay_seconds()), delay);
            prop_assert_eq!(request.message(), message.as_str());
        }

        #[test]
        /// Any negative delay is an InvalidArgument, whatever the message.
        fn test_negative_delays_always_rejected(
            delay in i64::MIN..0,
            message in "[ -~]{1,64}"
        ) {
            prop_assert!(matches!(
                AlarmRequest::new(delay, &message),
                Err(AlarmError::InvalidArgument(_))
            ));
        }
    }
}
