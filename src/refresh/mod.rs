//! Auto-refresh support
//!
//! A page (or a terminal view of one) reloads itself on a fixed cadence while
//! the user keeps the live toggle switched on. The decision logic lives in
//! [`AutoRefreshController`]; the host supplies the two capabilities it needs:
//! something that can show or hide the live badge ([`Indicator`]) and a
//! recurring timer that performs the reload ([`RefreshTimer`]).

mod controller;
#[cfg(not(target_arch = "wasm32"))]
mod tokio_timer;

pub use controller::{AutoRefreshController, Indicator, RefreshState, RefreshTimer};
#[cfg(not(target_arch = "wasm32"))]
pub use tokio_timer::TokioIntervalTimer;

use std::time::Duration;

/// Reload cadence used by the attendance pages
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(5000);

/// CSS class that suppresses the live indicator
pub const HIDDEN_CLASS: &str = "d-none";
