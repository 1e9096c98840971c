// =============================================================================
// HTTP API
// =============================================================================

pub mod rest;
