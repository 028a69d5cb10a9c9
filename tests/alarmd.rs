// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// End-to-end tests through the alarmd binary.

use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
/// A zero-delay alarm prints its message and exits cleanly.
fn test_zero_delay_surfaces_message() {
    Command::cargo_bin("alarmd")
        .unwrap()
        .args(["0", "tea is ready"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("ALARM: tea is ready"));
}

#[test]
/// A short delay is waited out before the message appears.
fn test_short_delay_surfaces_message() {
    Command::cargo_bin("alarmd")
        .unwrap()
        .args(["1", "kettle"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("ALARM: kettle"));
}

#[test]
/// A negative delay is rejected before any timer process is spawned.
fn test_negative_delay_is_rejected() {
    Command::cargo_bin("alarmd")
        .unwrap()
        .args(["-5", "never"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative"));
}
