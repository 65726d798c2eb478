#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::future_not_send,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::option_if_let_else,
    clippy::similar_names,
)]

pub mod cli;
pub mod config;
pub mod cookies;
pub mod decision;
pub mod error;
pub mod fetch;
pub mod login;
pub mod notify;
pub mod parse;
pub mod scrape;

#[cfg(test)]
mod testing;

pub use decision::{Attendance, Clock, FixedClock, SystemClock, is_present_today};
pub use error::{Error, Result};
pub use fetch::{Fetcher, SessionState, check_attendance};
pub use parse::AttendanceMap;
pub use scrape::Session;
