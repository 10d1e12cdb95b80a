//! Engine configuration.

use sealink_encoding::DecodeLimits;

/// Configuration for the protocol engine and manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bounds applied when decoding received wire messages.
    pub decode_limits: DecodeLimits,
    /// Validate every protocol step catalog when the manager is built.
    pub strict_catalog: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { decode_limits: DecodeLimits::default(), strict_catalog: true }
    }
}
