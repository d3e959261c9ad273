use tokio::sync::watch;

/// Lifecycle of a push or pull session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Idle,

    /// Dialed, waiting for the `connect` result
    AwaitingConnect,

    /// Waiting for the `createStream` result
    AwaitingCreateStream,

    /// `publish`/`play` sent, waiting for the start status
    AwaitingStreamAck,

    /// Media flowing
    Streaming,

    /// Connection torn down
    Closed,
}

impl SessionState {
    /// Check if media is flowing
    pub fn is_streaming(&self) -> bool {
        *self == SessionState::Streaming
    }

    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }

    /// Validate transition
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (*self, next) {
            (SessionState::Idle, SessionState::AwaitingConnect) => true,
            (SessionState::AwaitingConnect, SessionState::AwaitingCreateStream) => true,
            (SessionState::AwaitingCreateStream, SessionState::AwaitingStreamAck) => true,
            (SessionState::AwaitingStreamAck, SessionState::Streaming) => true,
            (SessionState::Closed, _) => false,
            (_, SessionState::Closed) => true,
            _ => false,
        }
    }
}

/// Publishes the session state to watchers
#[derive(Debug, Clone)]
pub(crate) struct StateCell {
    tx: watch::Sender<SessionState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Idle);
        StateCell { tx }
    }

    pub fn get(&self) -> SessionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Move to `next`; illegal transitions are ignored and reported as false
    pub fn transition(&self, next: SessionState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let cell = StateCell::new();
        for next in [
            SessionState::AwaitingConnect,
            SessionState::AwaitingCreateStream,
            SessionState::AwaitingStreamAck,
            SessionState::Streaming,
            SessionState::Closed,
        ] {
            assert!(cell.transition(next));
            assert_eq!(cell.get(), next);
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        let cell = StateCell::new();
        assert!(cell.transition(SessionState::Closed));
        assert!(!cell.transition(SessionState::AwaitingConnect));
        assert!(!cell.transition(SessionState::Closed));
        assert!(cell.get().is_closed());
    }

    #[test]
    fn test_cannot_skip_steps() {
        let cell = StateCell::new();
        assert!(!cell.transition(SessionState::Streaming));
        assert_eq!(cell.get(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_watchers_see_changes() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();
        cell.transition(SessionState::AwaitingConnect);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::AwaitingConnect);
    }
}
