pub mod config;
pub mod error;
pub mod event;
pub mod kite;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod session;
