use std::fmt::Display;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// no connection was ever requested
    #[default]
    Idle,
    /// a transport is being opened
    Connecting,
    /// transport open, subscriptions issued
    Connected,
    /// no transport; a retry may be pending
    Disconnected,
    /// attempt ceiling reached, only a forced reconnect leaves this state
    GivenUp,
}

impl ConnectionState {
    /// get state name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::GivenUp => "given-up",
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One logical attempt to stay connected.
#[derive(Debug, Default)]
pub(crate) struct ConnectionHandle {
    pub state: ConnectionState,
    /// attempts since the last successful connect
    pub attempt_count: u32,
    pub last_token: Option<String>,
    /// bumped whenever a transport is opened or abandoned; events carrying an older
    /// value belong to a dead transport
    pub generation: u64,
}

impl ConnectionHandle {
    pub fn move_to(&mut self, state: ConnectionState) {
        if self.state != state {
            log::debug!("Move to {} state", state);
            self.state = state;
        }
    }

    /// Start a new attempt, returning its generation.
    pub fn begin_attempt(&mut self, token: &str) -> u64 {
        self.attempt_count += 1;
        self.generation += 1;
        self.last_token = Some(token.to_string());
        self.move_to(ConnectionState::Connecting);
        self.generation
    }

    /// Invalidate the current transport without starting another.
    pub fn abandon(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn on_open(&mut self) {
        self.attempt_count = 0;
        self.move_to(ConnectionState::Connected);
    }
}
