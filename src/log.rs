use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to control per-sample debug logging
pub static SINK_DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set per-sample debug logging on/off
pub fn set_sink_debug(enabled: bool) {
    SINK_DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    println!(
        "🔧 Sink debug logging {}",
        if enabled { "ENABLED" } else { "DISABLED" }
    );
}

/// Check if per-sample debug logging is enabled
pub fn is_sink_debug_enabled() -> bool {
    SINK_DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Sink debug macro - only prints if sink debug is enabled
///
/// The submit and dequeue paths run once per buffer; unconditional logging
/// there would flood the output at audio rates.
#[macro_export]
macro_rules! sink_debug {
    ($($arg:tt)*) => {
        if $crate::log::SINK_DEBUG_ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            println!($($arg)*);
        }
    };
}
