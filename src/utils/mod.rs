//! Process-level helpers.

pub mod signal;

pub use signal::setup_ctrl_c_handler;
