use crate::envelope::Envelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::filter::RawFrame;
use crate::state::{Direction, State};
use crate::translator::{Translator, TranslatorId};
use crate::user::UserConnection;
use std::sync::{Arc, RwLock};
use tracing::info;

pub type Chain = Arc<[Arc<Translator>]>;

/// What the host does with a transformed packet.
#[derive(Debug)]
pub enum Outcome {
    Deliver(Envelope),
    /// Drop silently. Not an error.
    Cancelled,
}

/// The result of one [`Pipeline::transform`] call.
///
/// `injected` holds fully transformed envelopes produced along the way
/// (replayed queue entries, packets emitted by handlers). The host writes
/// them, in order and each in its own direction, before the delivered
/// envelope and before any later live packet.
#[derive(Debug)]
pub struct Transformed {
    pub outcome: Outcome,
    pub injected: Vec<Envelope>,
}

impl Transformed {
    pub fn delivered(&self) -> Option<&Envelope> {
        match &self.outcome {
            Outcome::Deliver(envelope) => Some(envelope),
            Outcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, Outcome::Cancelled)
    }
}

/// Handed to every handler: the connection, and the handler's position in
/// the chain for sending packets onward.
pub struct PacketContext<'a> {
    user: &'a UserConnection,
    chain: &'a [Arc<Translator>],
    position: usize,
    injected: &'a mut Vec<Envelope>,
}

impl<'a> PacketContext<'a> {
    pub fn user(&self) -> &UserConnection {
        self.user
    }

    /// The translator whose handler is running.
    pub fn translator(&self) -> &Translator {
        &self.chain[self.position]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Send `envelope` on through the rest of the chain in its own
    /// direction. With `skip_current` it starts after this translator,
    /// otherwise at it. Delivered results are collected as injected packets.
    pub fn send(&mut self, mut envelope: Envelope, skip_current: bool) -> ProtocolResult<()> {
        envelope.reset_reader();
        let start = if skip_current {
            next_position(envelope.direction(), self.position, self.chain.len())
        } else {
            Some(self.position)
        };
        if let Some(start) = start {
            apply_chain(&mut envelope, start, self.chain, self.user, self.injected)?;
        }
        if !envelope.is_cancelled() {
            self.injected.push(envelope);
        }
        Ok(())
    }
}

/// Clientbound packets enter at the server end (tail), serverbound ones at
/// the client end (head).
pub fn first_position(direction: Direction, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match direction {
        Direction::Clientbound => Some(len - 1),
        Direction::Serverbound => Some(0),
    }
}

pub fn next_position(direction: Direction, position: usize, len: usize) -> Option<usize> {
    match direction {
        Direction::Clientbound => position.checked_sub(1),
        Direction::Serverbound => (position + 1 < len).then_some(position + 1),
    }
}

/// Walk the chain from `start` in the envelope's direction, stopping as
/// soon as it is cancelled.
pub fn apply_chain(
    envelope: &mut Envelope,
    start: usize,
    chain: &[Arc<Translator>],
    user: &UserConnection,
    injected: &mut Vec<Envelope>,
) -> ProtocolResult<()> {
    let direction = envelope.direction();
    let mut position = Some(start);
    while let Some(index) = position {
        let translator = &chain[index];
        let mut ctx = PacketContext {
            user,
            chain,
            position: index,
            injected: &mut *injected,
        };
        match translator.bridge() {
            Some(bridge) => bridge.apply(translator, envelope, &mut ctx)?,
            None => translator.dispatch(envelope, &mut ctx)?,
        }
        if envelope.is_cancelled() {
            return Ok(());
        }
        envelope.reset_reader();
        position = next_position(direction, index, chain.len());
    }
    Ok(())
}

/// The translator chain of one connection, ordered from the client end to
/// the server end. Base translators always sit at the server end.
///
/// The chain is never mutated in place: writers build a new list and swap
/// it in, readers work on the snapshot they took when they started.
pub struct Pipeline {
    user: Arc<UserConnection>,
    chain: RwLock<Option<Chain>>,
}

impl Pipeline {
    pub fn new(user: Arc<UserConnection>) -> Self {
        Self {
            user,
            chain: RwLock::new(None),
        }
    }

    pub fn user(&self) -> &Arc<UserConnection> {
        &self.user
    }

    pub fn initialize(&self, bases: Vec<Arc<Translator>>) -> ProtocolResult<()> {
        if bases.iter().any(|t| !t.is_base()) {
            return Err(ProtocolError::Precondition("pipeline must be initialized with base translators"));
        }
        if self.chain.read().unwrap().is_some() {
            return Err(ProtocolError::Precondition("pipeline initialized twice"));
        }
        for translator in &bases {
            translator.init(&self.user);
        }
        let mut chain = self.chain.write().unwrap();
        if chain.is_some() {
            return Err(ProtocolError::Precondition("pipeline initialized twice"));
        }
        *chain = Some(bases.into());
        Ok(())
    }

    pub fn append(&self, translator: Arc<Translator>) -> ProtocolResult<()> {
        self.append_many(vec![translator])
    }

    /// Add several translators with a single swap, so no reader ever sees
    /// a base translator anywhere but the tail.
    pub fn append_many(&self, translators: Vec<Arc<Translator>>) -> ProtocolResult<()> {
        if self.chain.read().unwrap().is_none() {
            return Err(ProtocolError::Precondition("translator appended before the pipeline was initialized"));
        }
        for translator in &translators {
            translator.init(&self.user);
        }

        let mut chain = self.chain.write().unwrap();
        let current = chain
            .as_ref()
            .ok_or(ProtocolError::Precondition("translator appended before the pipeline was initialized"))?;
        let next: Vec<Arc<Translator>> = current.iter().cloned().chain(translators).collect();
        *chain = Some(move_bases_to_tail(next));
        Ok(())
    }

    pub fn snapshot(&self) -> Option<Chain> {
        self.chain.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().map_or(0, |chain| chain.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transform(&self, direction: Direction, state: State, mut envelope: Envelope) -> ProtocolResult<Transformed> {
        if envelope.direction() != direction {
            return Err(ProtocolError::Precondition("envelope direction does not match transform direction"));
        }
        let chain = self
            .snapshot()
            .ok_or(ProtocolError::Precondition("transform on an uninitialized pipeline"))?;

        envelope.set_state(state);
        let original_id = envelope.id();
        let mut injected = Vec::new();
        if let Some(start) = first_position(direction, chain.len()) {
            apply_chain(&mut envelope, start, &chain, &self.user, &mut injected)?;
        }

        if envelope.is_cancelled() {
            return Ok(Transformed {
                outcome: Outcome::Cancelled,
                injected,
            });
        }
        if self.user.config().debug {
            self.log_packet(direction, state, original_id, &envelope);
        }
        Ok(Transformed {
            outcome: Outcome::Deliver(envelope),
            injected,
        })
    }

    fn log_packet(&self, direction: Direction, state: State, original_id: i32, envelope: &Envelope) {
        let (username, client_protocol) = {
            let info = self.user.info();
            (info.username.clone(), info.client_protocol)
        };
        let username = username.map(|name| format!("{} ", name)).unwrap_or_default();
        info!(
            "{}{} {}: {} (0x{:x}) -> {} (0x{:x}) [{}]",
            username,
            direction,
            state,
            original_id,
            original_id,
            envelope.id(),
            envelope.id(),
            client_protocol
        );
    }

    pub fn contains(&self, id: TranslatorId) -> bool {
        self.lookup(id).is_some()
    }

    pub fn lookup(&self, id: TranslatorId) -> Option<Arc<Translator>> {
        self.snapshot()?.iter().find(|t| t.id() == id).cloned()
    }

    /// Drop every non-base translator and all translator storage.
    pub fn reset(&self) -> ProtocolResult<()> {
        let bases: Vec<Arc<Translator>> = {
            let mut chain = self.chain.write().unwrap();
            let current = chain
                .as_ref()
                .ok_or(ProtocolError::Precondition("reset before the pipeline was initialized"))?;
            let bases: Vec<Arc<Translator>> = current.iter().filter(|t| t.is_base()).cloned().collect();
            *chain = Some(bases.clone().into());
            bases
        };
        self.user.clear_storage();
        for translator in &bases {
            translator.init(&self.user);
        }
        Ok(())
    }

    /// Offer a raw frame from the server to the translators before it is
    /// decoded. Only translators whose server side is the connection's
    /// server version may claim it; the first that does writes its
    /// replacement envelopes to `out` and the frame itself is not forwarded.
    pub fn filter(&self, frame: RawFrame, out: &mut Vec<Envelope>) -> ProtocolResult<bool> {
        let Some(chain) = self.snapshot() else {
            return Ok(false);
        };
        let server_protocol = self.user.info().server_protocol;
        for translator in chain.iter() {
            let Some(filter) = translator.filter() else {
                continue;
            };
            if translator.server_version().number != server_protocol || !filter.is_filtered(&frame) {
                continue;
            }
            filter.filter(&self.user, frame, out)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Stable partition: relative order inside both groups is kept.
fn move_bases_to_tail(translators: Vec<Arc<Translator>>) -> Chain {
    let (mut ordered, bases): (Vec<_>, Vec<_>) = translators.into_iter().partition(|t| !t.is_base());
    ordered.extend(bases);
    ordered.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{base_translator, BASE};
    use crate::config::PipelineConfig;
    use crate::filter::PacketFilter;
    use crate::translator::{HandlerKey, Target, TranslatorBuilder};
    use crate::user::ProtocolInfo;
    use crate::value::FieldValue;
    use bytes::BytesMut;
    use pickaxe_types::ProtocolVersion;

    fn pipeline() -> Pipeline {
        let user = UserConnection::new(Arc::new(PipelineConfig::default()), ProtocolInfo::new(751, 736));
        let pipeline = Pipeline::new(Arc::new(user));
        pipeline
            .initialize(vec![Arc::new(base_translator(ProtocolVersion::V1_16_1).unwrap())])
            .unwrap();
        pipeline
    }

    fn builder(id: &'static str) -> TranslatorBuilder {
        TranslatorBuilder::new(TranslatorId(id), ProtocolVersion::V1_16_2, ProtocolVersion::V1_16_1)
    }

    fn mapping(id: &'static str, direction: Direction, from: i32, to: i32) -> Arc<Translator> {
        let mut builder = builder(id);
        builder.map(State::Play, direction, from, to);
        Arc::new(builder.build().unwrap())
    }

    fn ids(pipeline: &Pipeline) -> Vec<&'static str> {
        pipeline.snapshot().unwrap().iter().map(|t| t.id().0).collect()
    }

    #[test]
    fn test_passthrough_chain_leaves_packet_alone() {
        let pipeline = pipeline();
        pipeline.append(Arc::new(builder("noop").build().unwrap())).unwrap();

        let fields = vec![FieldValue::VarInt(3), FieldValue::String("x".into())];
        let envelope = Envelope::with_fields(Direction::Clientbound, State::Play, 0x20, fields.clone());
        let result = pipeline.transform(Direction::Clientbound, State::Play, envelope).unwrap();

        let delivered = result.delivered().unwrap();
        assert_eq!(delivered.id(), 0x20);
        assert_eq!(delivered.fields().cloned().collect::<Vec<_>>(), fields);
        assert!(result.injected.is_empty());
    }

    #[test]
    fn test_ids_compose_across_translators() {
        let pipeline = pipeline();
        pipeline
            .append_many(vec![
                mapping("first", Direction::Serverbound, 5, 7),
                mapping("second", Direction::Serverbound, 7, 9),
            ])
            .unwrap();

        let envelope = Envelope::new(Direction::Serverbound, State::Play, 5);
        let result = pipeline.transform(Direction::Serverbound, State::Play, envelope).unwrap();
        assert_eq!(result.delivered().unwrap().id(), 9);
    }

    #[test]
    fn test_held_snapshot_keeps_the_old_chain() {
        let pipeline = pipeline();
        let before = pipeline.snapshot().unwrap();
        pipeline
            .append_many(vec![
                mapping("first", Direction::Serverbound, 5, 7),
                mapping("second", Direction::Serverbound, 7, 9),
            ])
            .unwrap();

        assert_eq!(before.iter().map(|t| t.id().0).collect::<Vec<_>>(), vec![BASE.0]);
        assert_eq!(ids(&pipeline), vec!["first", "second", BASE.0]);
    }

    #[test]
    fn test_transform_never_sees_half_an_append() {
        for _ in 0..50 {
            let pipeline = pipeline();
            let done = std::sync::atomic::AtomicBool::new(false);
            std::thread::scope(|scope| {
                let reader = scope.spawn(|| {
                    let mut seen = Vec::new();
                    while !done.load(std::sync::atomic::Ordering::Acquire) {
                        let envelope = Envelope::new(Direction::Serverbound, State::Play, 5);
                        let result = pipeline.transform(Direction::Serverbound, State::Play, envelope).unwrap();
                        seen.push(result.delivered().unwrap().id());
                    }
                    seen
                });
                pipeline
                    .append_many(vec![
                        mapping("first", Direction::Serverbound, 5, 7),
                        mapping("second", Direction::Serverbound, 7, 9),
                    ])
                    .unwrap();
                done.store(true, std::sync::atomic::Ordering::Release);
                let seen = reader.join().unwrap();
                assert!(seen.iter().all(|&id| id == 5 || id == 9), "{:?}", seen);
            });
            let envelope = Envelope::new(Direction::Serverbound, State::Play, 5);
            let result = pipeline.transform(Direction::Serverbound, State::Play, envelope).unwrap();
            assert_eq!(result.delivered().unwrap().id(), 9);
        }
    }

    #[test]
    fn test_inverse_handlers_round_trip() {
        let mut builder = builder("reshape");
        builder
            .register(HandlerKey::id(State::Play, Direction::Serverbound, 0x10), Target::Id(0x11), |envelope, _| {
                let value = envelope.read_varint()?;
                envelope.write(FieldValue::Int(value));
                Ok(())
            })
            .register(HandlerKey::id(State::Play, Direction::Clientbound, 0x11), Target::Id(0x10), |envelope, _| {
                let value = envelope.read_int()?;
                envelope.write(FieldValue::VarInt(value));
                Ok(())
            });
        let pipeline = pipeline();
        pipeline.append(Arc::new(builder.build().unwrap())).unwrap();

        let original = vec![FieldValue::VarInt(42), FieldValue::Bool(true)];
        let sent = Envelope::with_fields(Direction::Serverbound, State::Play, 0x10, original.clone());
        let result = pipeline.transform(Direction::Serverbound, State::Play, sent).unwrap();
        let forward = result.delivered().unwrap();
        assert_eq!(forward.id(), 0x11);

        let echoed = Envelope::with_fields(
            Direction::Clientbound,
            State::Play,
            forward.id(),
            forward.fields().cloned().collect(),
        );
        let back = pipeline.transform(Direction::Clientbound, State::Play, echoed).unwrap();
        let back = back.delivered().unwrap();
        assert_eq!(back.id(), 0x10);
        assert_eq!(back.fields().cloned().collect::<Vec<_>>(), original);
    }

    #[test]
    fn test_base_translators_end_up_at_the_tail() {
        let pipeline = pipeline();
        let extra_base = {
            let mut builder = builder("extra_base");
            builder.base();
            Arc::new(builder.build().unwrap())
        };
        pipeline
            .append_many(vec![
                mapping("a", Direction::Clientbound, 1, 2),
                extra_base,
                mapping("b", Direction::Clientbound, 3, 4),
            ])
            .unwrap();
        assert_eq!(ids(&pipeline), vec!["a", "b", BASE.0, "extra_base"]);

        pipeline.append(mapping("c", Direction::Clientbound, 5, 6)).unwrap();
        assert_eq!(ids(&pipeline), vec!["a", "b", "c", BASE.0, "extra_base"]);
        assert!(pipeline.contains(TranslatorId("b")));
        assert!(pipeline.lookup(TranslatorId("missing")).is_none());
    }

    #[test]
    fn test_cancel_stops_the_chain() {
        const CLIENT_SIDE: TranslatorId = TranslatorId("client_side");
        let mut client_side = TranslatorBuilder::new(CLIENT_SIDE, ProtocolVersion::V1_16_2, ProtocolVersion::V1_16_1);
        client_side.register(HandlerKey::id(State::Play, Direction::Clientbound, 0x30), Target::Keep, |_, ctx| {
            ctx.user().put(CLIENT_SIDE, 1u32);
            Ok(())
        });
        let mut server_side = builder("server_side");
        server_side.cancel(HandlerKey::id(State::Play, Direction::Clientbound, 0x30));

        let pipeline = pipeline();
        pipeline
            .append_many(vec![Arc::new(client_side.build().unwrap()), Arc::new(server_side.build().unwrap())])
            .unwrap();

        let envelope = Envelope::new(Direction::Clientbound, State::Play, 0x30);
        let result = pipeline.transform(Direction::Clientbound, State::Play, envelope).unwrap();
        assert!(result.is_cancelled());
        assert!(!pipeline.user().has::<u32>(CLIENT_SIDE));
    }

    #[test]
    fn test_sent_packets_continue_toward_the_client() {
        let mut server_side = builder("server_side");
        server_side.register(HandlerKey::id(State::Play, Direction::Clientbound, 0x40), Target::Keep, |_, ctx| {
            let extra = Envelope::with_fields(Direction::Clientbound, State::Play, 0x41, vec![FieldValue::Byte(1)]);
            ctx.send(extra, true)
        });
        let pipeline = pipeline();
        pipeline
            .append_many(vec![
                mapping("client_side", Direction::Clientbound, 0x41, 0x42),
                Arc::new(server_side.build().unwrap()),
            ])
            .unwrap();

        let envelope = Envelope::new(Direction::Clientbound, State::Play, 0x40);
        let result = pipeline.transform(Direction::Clientbound, State::Play, envelope).unwrap();
        assert_eq!(result.delivered().unwrap().id(), 0x40);
        assert_eq!(result.injected.len(), 1);
        assert_eq!(result.injected[0].id(), 0x42);
    }

    #[test]
    fn test_misuse_is_a_precondition_error() {
        let user = Arc::new(UserConnection::new(Arc::new(PipelineConfig::default()), ProtocolInfo::new(751, 736)));
        let pipeline = Pipeline::new(user);
        let envelope = Envelope::new(Direction::Clientbound, State::Play, 0);

        assert!(matches!(
            pipeline.append(mapping("early", Direction::Clientbound, 1, 2)),
            Err(ProtocolError::Precondition(_))
        ));
        assert!(matches!(
            pipeline.transform(Direction::Clientbound, State::Play, envelope.clone()),
            Err(ProtocolError::Precondition(_))
        ));
        assert!(matches!(
            pipeline.initialize(vec![mapping("not_base", Direction::Clientbound, 1, 2)]),
            Err(ProtocolError::Precondition(_))
        ));

        let pipeline = self::pipeline();
        assert!(matches!(pipeline.initialize(Vec::new()), Err(ProtocolError::Precondition(_))));
        assert!(matches!(
            pipeline.transform(Direction::Serverbound, State::Play, envelope),
            Err(ProtocolError::Precondition(_))
        ));
    }

    #[test]
    fn test_reset_keeps_only_bases() {
        const OWNER: TranslatorId = TranslatorId("stateful");
        let mut builder = TranslatorBuilder::new(OWNER, ProtocolVersion::V1_16_2, ProtocolVersion::V1_16_1);
        builder.on_init(|user| user.put(OWNER, 0u64));
        let pipeline = pipeline();
        pipeline.append(Arc::new(builder.build().unwrap())).unwrap();
        assert!(pipeline.user().has::<u64>(OWNER));

        pipeline.reset().unwrap();
        assert_eq!(ids(&pipeline), vec![BASE.0]);
        assert!(!pipeline.user().has::<u64>(OWNER));
    }

    struct SplitFrames;

    impl PacketFilter for SplitFrames {
        fn is_filtered(&self, frame: &RawFrame) -> bool {
            frame.state == State::Play && frame.id == 0x3B
        }

        fn filter(&self, _user: &UserConnection, frame: RawFrame, out: &mut Vec<Envelope>) -> ProtocolResult<()> {
            for byte in frame.payload.iter() {
                out.push(Envelope::with_fields(
                    frame.direction,
                    frame.state,
                    frame.id,
                    vec![FieldValue::UnsignedByte(*byte)],
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_filter_only_asks_translators_next_to_the_server() {
        let mut far = TranslatorBuilder::new(TranslatorId("far"), ProtocolVersion::V1_20_2, ProtocolVersion::V1_20);
        far.filter(SplitFrames);
        let mut near = builder("near");
        near.filter(SplitFrames);

        let frame = |id| RawFrame {
            direction: Direction::Clientbound,
            state: State::Play,
            id,
            payload: BytesMut::from(&[1u8, 2, 3][..]),
        };

        let pipeline = pipeline();
        pipeline.append(Arc::new(far.build().unwrap())).unwrap();
        let mut out = Vec::new();
        assert!(!pipeline.filter(frame(0x3B), &mut out).unwrap());

        pipeline.append(Arc::new(near.build().unwrap())).unwrap();
        assert!(pipeline.filter(frame(0x3B), &mut out).unwrap());
        assert_eq!(out.len(), 3);
        assert!(!pipeline.filter(frame(0x3C), &mut Vec::new()).unwrap());
    }
}
