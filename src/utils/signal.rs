//! Ctrl-C handling for the mission binary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{MissionError, Result};

/// Install a Ctrl-C handler that clears the returned flag.
///
/// The same flag is handed to the coordinator and every simulation thread,
/// so one interrupt stops the whole process.
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        tracing::warn!("Interrupt received, stopping mission");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| MissionError::Config(format!("Failed to install Ctrl-C handler: {}", e)))?;
    Ok(running)
}
