//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 并发协调模块。

pub mod single_flight;

pub use single_flight::{Flight, InFlightRegistry};
