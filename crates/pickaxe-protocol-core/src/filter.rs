use crate::envelope::Envelope;
use crate::error::ProtocolResult;
use crate::state::{Direction, State};
use crate::user::UserConnection;
use bytes::BytesMut;

/// A packet as it left the server, before anything decoded it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub direction: Direction,
    pub state: State,
    pub id: i32,
    pub payload: BytesMut,
}

impl RawFrame {
    pub fn into_envelope(self) -> Envelope {
        Envelope::from_raw(self.direction, self.state, self.id, self.payload)
    }
}

/// Lets a translator next to the server take over a raw frame, typically
/// to split it into several packets before the chain sees it.
pub trait PacketFilter: Send + Sync {
    fn is_filtered(&self, frame: &RawFrame) -> bool;

    /// Handle a claimed frame. Replacement envelopes go to `out`, in the
    /// order they must be transformed; the frame itself is dropped.
    fn filter(&self, user: &UserConnection, frame: RawFrame, out: &mut Vec<Envelope>) -> ProtocolResult<()>;
}
