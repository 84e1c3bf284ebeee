use dashboard_core::Room;
use thiserror::Error;

/// All errors generated in `dashboard-sync`.
///
/// None of these propagate as an unhandled fault: transport errors drive the
/// reconnect state machine, decode errors drop the offending frame, and pull
/// failures leave the last good snapshot in place. Only
/// [`SyncError::RetriesExhausted`] is terminal.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("failed to decode inbound payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("pull request failed: {0}")]
    Rest(#[from] reqwest::Error),

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("room {room} gave up after {attempts} reconnect attempts")]
    RetriesExhausted { room: Room, attempts: u32 },
}

impl SyncError {
    /// Determine if an error ends automatic recovery for its connection.
    ///
    /// Terminal errors surface to the UI layer as a "disconnected, give up"
    /// state that requires an explicit manual re-subscribe.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncError::RetriesExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exhausted_retries_is_terminal() {
        struct TestCase {
            input: SyncError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: transport failures are retryable
                input: SyncError::Transport("connection reset".to_string()),
                expected: false,
            },
            TestCase {
                // TC1: decode failures drop the frame only
                input: SyncError::Decode(
                    serde_json::from_str::<serde_json::Value>("not json").unwrap_err(),
                ),
                expected: false,
            },
            TestCase {
                // TC2: exhausted retries end automatic recovery
                input: SyncError::RetriesExhausted {
                    room: Room::Signals,
                    attempts: 8,
                },
                expected: true,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_terminal(), test.expected, "TC{index} failed");
        }
    }
}
