//! Reader lifecycle state

use serde::{Deserialize, Serialize};

/// Connection state of a reader
///
/// `Disconnected -> Connecting -> Listening -> (Disconnected | Error)`.
/// `Error` is transient: an I/O failure moves on to `Disconnected` right
/// after the error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReaderState {
    #[default]
    Disconnected,
    Connecting,
    Listening,
    Error,
}

impl ReaderState {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Listening => "Listening",
            Self::Error => "Error",
        }
    }

    /// Whether a `connected` event has been announced for this session
    pub fn is_announced(&self) -> bool {
        matches!(self, Self::Listening | Self::Error)
    }
}

impl std::fmt::Display for ReaderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ReaderState::default(), ReaderState::Disconnected);
    }

    #[test]
    fn test_announced_states() {
        assert!(!ReaderState::Disconnected.is_announced());
        assert!(!ReaderState::Connecting.is_announced());
        assert!(ReaderState::Listening.is_announced());
        assert!(ReaderState::Error.is_announced());
    }
}
