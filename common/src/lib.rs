#![forbid(unsafe_code)]

#[cfg(feature = "config")]
pub mod config;
#[cfg(feature = "database")]
pub mod database;
#[cfg(feature = "logging")]
pub mod logging;
#[cfg(feature = "signal")]
pub mod signal;

#[cfg(test)]
mod tests;
