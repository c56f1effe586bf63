//! Utilities shared by the rest of the workspace:
//!
//! - Timer (a mix of logging and profiling)
//! - JSON IO helpers
//! - Small collections helpers

#[macro_use]
extern crate log;

mod collections;
mod io;
pub mod logger;
mod time;

pub use crate::collections::MultiMap;
pub use crate::io::{read_json, write_json};
pub use crate::time::{elapsed_seconds, prettyprint_time, prettyprint_usize, Timer};

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;

// Thanks https://stackoverflow.com/a/49806368
#[macro_export]
macro_rules! skip_fail {
    ($res:expr) => {
        match $res {
            Some(val) => val,
            None => {
                continue;
            }
        }
    };
}
