//! Request handlers, grouped by audience.

pub mod driver;
pub mod management;
pub mod system;
pub mod tracking;
