// =============================================================================
// Market Data Module
// =============================================================================
//
// Everything that sits between the detectors and the outside world:
// - Interval helpers (minutes per bar, rolling window size)
// - The `BarProvider` abstraction and its error type
// - A Yahoo Finance chart API implementation

pub mod interval;
pub mod provider;
pub mod yahoo;

pub use interval::window_size_for;
pub use provider::{BarProvider, ProviderError};
pub use yahoo::YahooProvider;
