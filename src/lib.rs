//! Nikon IR remote trigger for the ESP32.
//!
//! The [`generator`] module holds the pulse-train generator; everything it
//! needs from the chip goes through the [`timer`] and [`output`] traits so the
//! sequencing can be tested on the host. The esp-idf implementations live in
//! [`services`] and [`peripherals`], built for `target_os = "espidf"` only.

pub mod control;
pub mod errors;
pub mod generator;
pub mod global_settings;
pub mod output;
pub mod pulse;
pub mod remote;
pub mod settings;
pub mod timer;

#[cfg(target_os = "espidf")]
pub mod peripherals;
#[cfg(target_os = "espidf")]
pub mod services;
#[cfg(target_os = "espidf")]
mod utils;

#[cfg(test)]
mod testing;

pub use generator::{Generator, GeneratorConfig};
pub use remote::Remote;
