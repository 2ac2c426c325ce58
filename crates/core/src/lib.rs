#![forbid(unsafe_code)]

pub mod achievement;
pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod model;
pub mod resources;
pub mod time;

pub use time::Clock;
