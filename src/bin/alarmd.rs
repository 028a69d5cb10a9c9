// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{env, error::Error, str::FromStr, thread, time::Duration};

use clap::{Arg, Command};
use env_logger::Builder;
use log::{info, warn, LevelFilter};

use alarmd::alarm::{create_alarm_process, fired_count, Delivery, VERSION};

fn parse_args() -> Command {
    Command::new("alarmd")
        .version(VERSION)
        .about("Delivers a message after a delay via a forked timer process and SIGALRM")
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Sets level for generation of log messages"),
        )
        .arg(
            Arg::new("seconds")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64))
                .value_name("SECONDS")
                .help("Delay in seconds before the alarm fires"),
        )
        .arg(
            Arg::new("message")
                .required(true)
                .value_name("MESSAGE")
                .help("Message to deliver when the alarm fires"),
        )
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args().get_matches();

    let mut builder = Builder::new();
    if let Some(log_level) = args.get_one::<String>("log_level") {
        builder.filter(
            Some("alarmd"),
            LevelFilter::from_str(log_level)
                .expect("argument parser only accepts valid log levels"),
        );
    } else if let Ok(s) = env::var("RUST_LOG") {
        builder.parse_filters(&s);
    }
    builder.init();

    let seconds = *args
        .get_one::<i64>("seconds")
        .expect("'seconds' is a mandatory argument");
    let message = args
        .get_one::<String>("message")
        .expect("'message' is a mandatory argument");

    let handle = create_alarm_process(seconds, message)?;
    info!(
        "alarm scheduled in {} second(s), timer process {}",
        seconds,
        handle.pid()
    );

    // The handler does the surfacing; the main line only waits for it.
    // Polling try_wait as well keeps this from spinning forever if the
    // timer process dies without ever notifying.
    let delivery = loop {
        if fired_count() > 0 {
            break handle.wait()?;
        }
        if let Some(delivery) = handle.try_wait()? {
            break delivery;
        }
        thread::sleep(Duration::from_millis(50));
    };

    match delivery {
        Delivery::Delivered => info!("alarm delivered"),
        Delivery::Lost => warn!("timer process reported a lost notification"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    #[test]
    fn test_alarmd_parse_args() {
        parse_args().debug_assert();
    }
}
