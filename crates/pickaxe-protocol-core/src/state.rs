use std::fmt;

/// The lifecycle phase of a connection; packet ids are only meaningful
/// relative to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Handshake,
    Status,
    Login,
    Configuration,
    Play,
}

impl State {
    pub fn from_handshake_next(next: i32) -> Option<Self> {
        match next {
            1 => Some(State::Status),
            2 => Some(State::Login),
            _ => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Handshake => "HANDSHAKE",
            State::Status => "STATUS",
            State::Login => "LOGIN",
            State::Configuration => "CONFIGURATION",
            State::Play => "PLAY",
        };
        f.write_str(name)
    }
}

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server to client. Walks the chain from the server end (tail) to the client end (head).
    Clientbound,
    /// Client to server. Walks the chain from head to tail.
    Serverbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Clientbound => f.write_str("CLIENTBOUND"),
            Direction::Serverbound => f.write_str("SERVERBOUND"),
        }
    }
}
