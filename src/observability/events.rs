//! Observable engine events
//!
//! Events are explicit and typed; each maps to one log line.

use std::fmt;

/// Observable events emitted by the validation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A validator was compiled and cached
    ValidatorCompiled,
    /// A cached validator was reused
    CacheHit,
    /// Entries were evicted to make room
    CacheEvicted,
    /// Validation run finished without errors
    ValidationPassed,
    /// Validation run finished with errors
    ValidationFailed,
    /// A system fault was reported inside a result
    ValidationFault,
    /// Cache and counters were reset
    EngineReset,
}

impl Event {
    /// Stable event name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ValidatorCompiled => "VALIDATOR_COMPILED",
            Event::CacheHit => "CACHE_HIT",
            Event::CacheEvicted => "CACHE_EVICTED",
            Event::ValidationPassed => "VALIDATION_PASSED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::ValidationFault => "VALIDATION_FAULT",
            Event::EngineReset => "ENGINE_RESET",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_stable() {
        assert_eq!(Event::ValidatorCompiled.as_str(), "VALIDATOR_COMPILED");
        assert_eq!(Event::CacheHit.as_str(), "CACHE_HIT");
        assert_eq!(Event::EngineReset.as_str(), "ENGINE_RESET");
    }

    #[test]
    fn test_event_display() {
        assert_eq!(Event::ValidationFailed.to_string(), "VALIDATION_FAILED");
    }
}
