//! Emulating a lifecycle phase one side of the connection does not know.
//!
//! A client that expects a configuration phase between login and play can
//! be put in front of a server that goes straight to play. After the server
//! confirms the profile the client stays in login until it acknowledges,
//! then spends the configuration phase talking to the bridge while the
//! server is already in play. Server packets that cannot be expressed in
//! the configuration phase are held back in arrival order and replayed once
//! the client catches up.

use crate::envelope::Envelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::packet_type::{PacketTable, PacketType};
use crate::pipeline::PacketContext;
use crate::state::{Direction, State};
use crate::translator::Translator;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgePhase {
    /// No emulation; packets flow normally.
    #[default]
    None,
    /// The server confirmed the profile and moved on; the client has not
    /// acknowledged yet.
    ProfileSent,
    /// The client is in the emulated phase.
    InBridgePhase,
}

#[derive(Debug, Clone)]
pub struct QueuedPacket {
    pub envelope: Envelope,
    /// Whether replay starts after the bridging translator instead of at it.
    pub skip_current: bool,
}

/// Per-connection bridge state, stored under the bridging translator's id.
#[derive(Debug, Default)]
pub struct PhaseBridge {
    phase: BridgePhase,
    finish_sent: bool,
    queue: VecDeque<QueuedPacket>,
}

impl PhaseBridge {
    pub fn phase(&self) -> BridgePhase {
        self.phase
    }

    /// The end of the emulated phase has been sent to the client; every
    /// further server packet waits for its acknowledgement.
    pub fn finish_sent(&self) -> bool {
        self.finish_sent
    }

    pub fn queue(&self) -> impl Iterator<Item = &QueuedPacket> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, packet: QueuedPacket, limit: usize) -> ProtocolResult<()> {
        if self.queue.len() >= limit {
            return Err(ProtocolError::violation(format!(
                "more than {} packets held back while bridging phases",
                limit
            )));
        }
        self.queue.push_back(packet);
        Ok(())
    }

    fn take_queue(&mut self) -> VecDeque<QueuedPacket> {
        std::mem::take(&mut self.queue)
    }

    pub fn reset(&mut self) {
        self.phase = BridgePhase::None;
        self.finish_sent = false;
        self.queue.clear();
    }
}

pub type FinishHook = Box<dyn Fn(Envelope, &PacketContext<'_>) -> ProtocolResult<Vec<Envelope>> + Send + Sync>;

/// How a translator bridges the configuration phase, by packet name.
pub struct BridgeRules {
    carry_over: Vec<(&'static str, &'static str)>,
    finish_trigger: &'static str,
    on_finish: FinishHook,
}

impl BridgeRules {
    /// `finish_trigger` names the server's play packet that ends the
    /// emulated phase. `on_finish` derives the configuration packets the
    /// client needs from it, ending with the finish packet.
    pub fn new<F>(finish_trigger: &'static str, on_finish: F) -> Self
    where
        F: Fn(Envelope, &PacketContext<'_>) -> ProtocolResult<Vec<Envelope>> + Send + Sync + 'static,
    {
        Self {
            carry_over: Vec::new(),
            finish_trigger,
            on_finish: Box::new(on_finish),
        }
    }

    /// A server play packet that has a configuration counterpart and can be
    /// sent to a bridged client right away.
    pub fn carry_over(mut self, play: &'static str, configuration: &'static str) -> Self {
        self.carry_over.push((play, configuration));
        self
    }

    pub(crate) fn resolve(self, translator: &'static str, server: &PacketTable, client: &PacketTable) -> ProtocolResult<Bridge> {
        let mut carry_over = HashMap::new();
        for (play, configuration) in self.carry_over {
            server.require(State::Play, Direction::Clientbound, play)?;
            let counterpart = client.require(State::Configuration, Direction::Clientbound, configuration)?;
            carry_over.insert(play, counterpart);
        }
        server.require(State::Play, Direction::Clientbound, self.finish_trigger)?;

        let configuration_ids: HashSet<i32> = client
            .types()
            .filter(|ty| ty.state == State::Configuration && ty.direction == Direction::Clientbound)
            .map(|ty| ty.id)
            .collect();
        if configuration_ids.is_empty() {
            return Err(ProtocolError::configuration(
                translator,
                format!("{} has no configuration phase to bridge", client.version),
            ));
        }

        Ok(Bridge {
            carry_over,
            finish_trigger: self.finish_trigger,
            on_finish: self.on_finish,
            configuration_ids,
        })
    }
}

/// Resolved bridge rules, evaluated at the bridging translator's position
/// before its own handlers.
pub struct Bridge {
    carry_over: HashMap<&'static str, PacketType>,
    finish_trigger: &'static str,
    on_finish: FinishHook,
    configuration_ids: HashSet<i32>,
}

impl Bridge {
    pub fn apply(&self, translator: &Translator, envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
        let state = ctx
            .user()
            .with(translator.id(), |bridge: &mut PhaseBridge| (bridge.phase, bridge.finish_sent));
        let (phase, finish_sent) = match state {
            Some(state) => state,
            None => return translator.dispatch(envelope, ctx),
        };
        if phase == BridgePhase::None {
            return translator.dispatch(envelope, ctx);
        }

        if envelope.direction() == Direction::Serverbound {
            // The client decides its own phase; nothing it sends is held here.
            if phase == BridgePhase::InBridgePhase {
                envelope.set_state(State::Configuration);
            }
            return translator.dispatch(envelope, ctx);
        }

        if phase == BridgePhase::ProfileSent || finish_sent {
            return self.hold(envelope, ctx);
        }

        if envelope.state() == State::Configuration {
            return translator.dispatch(envelope, ctx);
        }

        let snapshot = envelope.clone();
        let name = translator.resolve_type(envelope).map(|ty| ty.name);

        if let Some(counterpart) = name.and_then(|name| self.carry_over.get(name)) {
            trace!("Carrying {} over into the configuration phase", counterpart.name);
            envelope.set_packet_type(*counterpart);
            translator.dispatch(envelope, ctx)?;
            let in_phase = envelope.state() == State::Configuration && self.configuration_ids.contains(&envelope.id());
            if !envelope.is_cancelled() && !in_phase {
                debug!("Handler moved 0x{:02x} out of the configuration phase, holding it back", envelope.id());
                envelope.cancel();
                ctx.defer(snapshot, false)?;
            }
            return Ok(());
        }

        if name == Some(self.finish_trigger) {
            let emitted = (self.on_finish)(snapshot.clone(), ctx)?;
            ctx.update_bridge(|bridge| bridge.finish_sent = true)?;
            for packet in emitted {
                ctx.send(packet, true)?;
            }
            envelope.cancel();
            return ctx.defer(snapshot, false);
        }

        self.hold(envelope, ctx)
    }

    fn hold(&self, envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
        trace!("Holding back {} 0x{:02x} until the client changes phase", envelope.state(), envelope.id());
        let queued = envelope.clone();
        envelope.cancel();
        ctx.defer(queued, false)
    }
}

impl PacketContext<'_> {
    /// Run `f` on the current translator's bridge state.
    pub fn update_bridge<R>(&self, f: impl FnOnce(&mut PhaseBridge) -> R) -> ProtocolResult<R> {
        let owner = self.translator().id();
        self.user()
            .with(owner, f)
            .ok_or(ProtocolError::Precondition("translator has no phase bridge storage"))
    }

    pub fn bridge_phase(&self) -> Option<BridgePhase> {
        self.update_bridge(|bridge| bridge.phase).ok()
    }

    /// Queue a packet for replay at the next phase change.
    pub fn defer(&mut self, envelope: Envelope, skip_current: bool) -> ProtocolResult<()> {
        let limit = self.user().config().max_queued_packets;
        self.update_bridge(|bridge| bridge.push(QueuedPacket { envelope, skip_current }, limit))?
    }

    /// The server confirmed the profile. It is in play from now on; the
    /// client stays in login until it acknowledges.
    pub fn mark_profile_sent(&mut self) -> ProtocolResult<()> {
        self.update_bridge(|bridge| bridge.phase = BridgePhase::ProfileSent)?;
        let mut info = self.user().info();
        info.server_state = State::Play;
        info.set_client_state(State::Login);
        Ok(())
    }

    /// The client acknowledged the profile and is now in the configuration
    /// phase. Everything held back so far is replayed.
    pub fn enter_bridge_phase(&mut self) -> ProtocolResult<()> {
        let queue = self.update_bridge(|bridge| {
            bridge.phase = BridgePhase::InBridgePhase;
            bridge.take_queue()
        })?;
        {
            let mut info = self.user().info();
            info.server_state = State::Play;
            info.set_client_state(State::Configuration);
        }
        debug!("Client entered the configuration phase, replaying {} packets", queue.len());
        self.replay(queue)
    }

    /// The client finished the configuration phase and joins the server in
    /// play. Everything held back is replayed.
    pub fn finish_bridge_phase(&mut self) -> ProtocolResult<()> {
        let queue = self.update_bridge(|bridge| {
            let queue = bridge.take_queue();
            bridge.reset();
            queue
        })?;
        self.user().info().clear_client_state();
        debug!("Client left the configuration phase, replaying {} packets", queue.len());
        self.replay(queue)
    }

    fn replay(&mut self, queue: VecDeque<QueuedPacket>) -> ProtocolResult<()> {
        for packet in queue {
            self.send(packet.envelope, packet.skip_current)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::base_translator;
    use crate::config::PipelineConfig;
    use crate::packet_type::PacketSection;
    use crate::pipeline::Pipeline;
    use crate::translator::{HandlerKey, Target, TranslatorBuilder, TranslatorId};
    use crate::user::{ProtocolInfo, UserConnection};
    use crate::value::FieldValue;
    use pickaxe_types::ProtocolVersion;
    use std::sync::Arc;
    use uuid::Uuid;

    const BRIDGING: TranslatorId = TranslatorId("bridging");

    const LOGIN_CLIENTBOUND: &[&str] = &["DISCONNECT", "HELLO", "GAME_PROFILE"];
    const PLAY_CLIENTBOUND: &[&str] = &["KEEP_ALIVE", "CHUNK", "JOIN_GAME", "TAGS"];
    const PLAY_SERVERBOUND: &[&str] = &["KEEP_ALIVE", "CHAT"];

    fn server_table() -> PacketTable {
        PacketTable::new(
            "server",
            &[
                PacketSection { state: State::Login, direction: Direction::Clientbound, names: LOGIN_CLIENTBOUND },
                PacketSection { state: State::Login, direction: Direction::Serverbound, names: &["HELLO"] },
                PacketSection { state: State::Play, direction: Direction::Clientbound, names: PLAY_CLIENTBOUND },
                PacketSection { state: State::Play, direction: Direction::Serverbound, names: PLAY_SERVERBOUND },
            ],
        )
    }

    fn client_table() -> PacketTable {
        PacketTable::new(
            "client",
            &[
                PacketSection { state: State::Login, direction: Direction::Clientbound, names: LOGIN_CLIENTBOUND },
                PacketSection {
                    state: State::Login,
                    direction: Direction::Serverbound,
                    names: &["HELLO", "LOGIN_ACKNOWLEDGED"],
                },
                PacketSection {
                    state: State::Configuration,
                    direction: Direction::Clientbound,
                    names: &["KEEP_ALIVE", "UPDATE_TAGS", "REGISTRY_DATA", "FINISH_CONFIGURATION"],
                },
                PacketSection {
                    state: State::Configuration,
                    direction: Direction::Serverbound,
                    names: &["KEEP_ALIVE", "FINISH_CONFIGURATION"],
                },
                PacketSection { state: State::Play, direction: Direction::Clientbound, names: PLAY_CLIENTBOUND },
                PacketSection { state: State::Play, direction: Direction::Serverbound, names: PLAY_SERVERBOUND },
            ],
        )
    }

    fn bridging_translator() -> Translator {
        bridging_builder().build().unwrap()
    }

    fn bridging_builder() -> TranslatorBuilder {
        let server = Arc::new(server_table());
        let client = Arc::new(client_table());
        let registry_data = client.by_name(State::Configuration, Direction::Clientbound, "REGISTRY_DATA").unwrap();
        let finish = client
            .by_name(State::Configuration, Direction::Clientbound, "FINISH_CONFIGURATION")
            .unwrap();
        let play_keep_alive = server.by_name(State::Play, Direction::Serverbound, "KEEP_ALIVE").unwrap();

        let mut builder = TranslatorBuilder::new(BRIDGING, ProtocolVersion::V1_20_2, ProtocolVersion::V1_20);
        builder
            .packet_tables(server, client)
            .register(
                HandlerKey::named(State::Login, Direction::Clientbound, "GAME_PROFILE"),
                Target::Auto,
                |_, ctx| ctx.mark_profile_sent(),
            )
            .register(
                HandlerKey::named(State::Login, Direction::Serverbound, "LOGIN_ACKNOWLEDGED"),
                Target::Keep,
                |envelope, ctx| {
                    envelope.cancel();
                    ctx.enter_bridge_phase()
                },
            )
            .register(
                HandlerKey::named(State::Configuration, Direction::Serverbound, "FINISH_CONFIGURATION"),
                Target::Keep,
                |envelope, ctx| {
                    envelope.cancel();
                    ctx.finish_bridge_phase()
                },
            )
            .redirect(
                HandlerKey::named(State::Configuration, Direction::Serverbound, "KEEP_ALIVE"),
                Target::Type(play_keep_alive),
            )
            .bridge(
                BridgeRules::new("JOIN_GAME", move |_, _| {
                    Ok(vec![Envelope::from_type(registry_data), Envelope::from_type(finish)])
                })
                .carry_over("KEEP_ALIVE", "KEEP_ALIVE")
                .carry_over("TAGS", "UPDATE_TAGS"),
            );
        builder
    }

    fn pipeline(max_queued_packets: usize) -> Pipeline {
        pipeline_with(max_queued_packets, bridging_translator())
    }

    fn pipeline_with(max_queued_packets: usize, bridging: Translator) -> Pipeline {
        let config = PipelineConfig {
            max_queued_packets,
            ..PipelineConfig::default()
        };
        let user = UserConnection::new(Arc::new(config), ProtocolInfo::new(764, 763));
        user.info().set_state(State::Login);
        let pipeline = Pipeline::new(Arc::new(user));
        pipeline
            .initialize(vec![Arc::new(base_translator(ProtocolVersion::V1_20).unwrap())])
            .unwrap();
        pipeline.append(Arc::new(bridging)).unwrap();
        pipeline
    }

    fn clientbound(pipeline: &Pipeline, state: State, id: i32, fields: Vec<FieldValue>) -> crate::Transformed {
        let envelope = Envelope::with_fields(Direction::Clientbound, state, id, fields);
        pipeline.transform(Direction::Clientbound, state, envelope).unwrap()
    }

    fn serverbound(pipeline: &Pipeline, state: State, id: i32) -> crate::Transformed {
        let envelope = Envelope::new(Direction::Serverbound, state, id);
        pipeline.transform(Direction::Serverbound, state, envelope).unwrap()
    }

    fn phase(pipeline: &Pipeline) -> BridgePhase {
        pipeline.user().with(BRIDGING, |bridge: &mut PhaseBridge| bridge.phase()).unwrap()
    }

    fn send_profile(pipeline: &Pipeline) {
        let profile = vec![FieldValue::Uuid(Uuid::from_u128(7)), FieldValue::String("Steve".into())];
        let result = clientbound(pipeline, State::Login, 2, profile);
        assert_eq!(result.delivered().unwrap().name(), Some("GAME_PROFILE"));
    }

    #[test]
    fn test_held_packets_replay_at_acknowledgement() {
        let pipeline = pipeline(16);
        send_profile(&pipeline);
        assert_eq!(phase(&pipeline), BridgePhase::ProfileSent);
        {
            let info = pipeline.user().info();
            assert_eq!(info.server_state, State::Play);
            assert_eq!(info.client_state(), State::Login);
            assert_eq!(info.username.as_deref(), Some("Steve"));
        }

        let tags = clientbound(&pipeline, State::Play, 3, vec![FieldValue::VarInt(0)]);
        assert!(tags.is_cancelled());
        let keep_alive = clientbound(&pipeline, State::Play, 0, vec![FieldValue::Long(5)]);
        assert!(keep_alive.is_cancelled());

        let ack = serverbound(&pipeline, State::Login, 1);
        assert!(ack.is_cancelled());
        assert_eq!(phase(&pipeline), BridgePhase::InBridgePhase);
        assert_eq!(pipeline.user().info().client_state(), State::Configuration);

        let replayed: Vec<_> = ack.injected.iter().map(|e| (e.state(), e.name())).collect();
        assert_eq!(
            replayed,
            vec![
                (State::Configuration, Some("UPDATE_TAGS")),
                (State::Configuration, Some("KEEP_ALIVE")),
            ]
        );

        // Live packets now flow straight into the emulated phase.
        let live = clientbound(&pipeline, State::Play, 0, vec![FieldValue::Long(6)]);
        assert_eq!(live.delivered().unwrap().state(), State::Configuration);
    }

    #[test]
    fn test_join_game_ends_the_phase_in_order() {
        let pipeline = pipeline(16);
        send_profile(&pipeline);
        serverbound(&pipeline, State::Login, 1);

        // Play-only packets wait while the client is configuring.
        let chunk = clientbound(&pipeline, State::Play, 1, vec![FieldValue::Int(1)]);
        assert!(chunk.is_cancelled());

        let join = clientbound(&pipeline, State::Play, 2, vec![FieldValue::Int(99)]);
        assert!(join.is_cancelled());
        let emitted: Vec<_> = join.injected.iter().map(|e| e.name()).collect();
        assert_eq!(emitted, vec![Some("REGISTRY_DATA"), Some("FINISH_CONFIGURATION")]);
        assert!(pipeline.user().with(BRIDGING, |b: &mut PhaseBridge| b.finish_sent()).unwrap());

        // Even carry-over packets wait once the finish has gone out.
        let late = clientbound(&pipeline, State::Play, 0, vec![FieldValue::Long(1)]);
        assert!(late.is_cancelled());

        // Configuration keep alive answers become play ones.
        let answer = serverbound(&pipeline, State::Configuration, 0);
        let answer = answer.delivered().unwrap();
        assert_eq!((answer.state(), answer.name()), (State::Play, Some("KEEP_ALIVE")));

        let finish = serverbound(&pipeline, State::Configuration, 1);
        assert!(finish.is_cancelled());
        assert_eq!(phase(&pipeline), BridgePhase::None);
        assert_eq!(pipeline.user().info().client_state(), State::Play);

        let replayed: Vec<_> = finish
            .injected
            .iter()
            .map(|e| (e.state(), e.name(), e.fields().next().cloned()))
            .collect();
        assert_eq!(
            replayed,
            vec![
                (State::Play, Some("CHUNK"), Some(FieldValue::Int(1))),
                (State::Play, Some("JOIN_GAME"), Some(FieldValue::Int(99))),
                (State::Play, Some("KEEP_ALIVE"), Some(FieldValue::Long(1))),
            ]
        );

        let live = clientbound(&pipeline, State::Play, 1, vec![FieldValue::Int(2)]);
        assert_eq!(live.delivered().unwrap().name(), Some("CHUNK"));
    }

    #[test]
    fn test_carry_over_moved_into_play_waits_for_finish() {
        let play_tags = client_table()
            .by_name(State::Play, Direction::Clientbound, "TAGS")
            .unwrap();
        let mut builder = bridging_builder();
        builder.register(
            HandlerKey::named(State::Configuration, Direction::Clientbound, "UPDATE_TAGS"),
            Target::Type(play_tags),
            |_, _| Ok(()),
        );
        let pipeline = pipeline_with(16, builder.build().unwrap());
        send_profile(&pipeline);
        serverbound(&pipeline, State::Login, 1);

        let tags = clientbound(&pipeline, State::Play, 3, vec![FieldValue::VarInt(7)]);
        assert!(tags.is_cancelled());
        assert!(tags.injected.is_empty());

        // Other carry-over packets are unaffected.
        let keep_alive = clientbound(&pipeline, State::Play, 0, vec![FieldValue::Long(1)]);
        assert_eq!(keep_alive.delivered().unwrap().state(), State::Configuration);
        let chunk = clientbound(&pipeline, State::Play, 1, vec![FieldValue::Int(1)]);
        assert!(chunk.is_cancelled());

        let finish = serverbound(&pipeline, State::Configuration, 1);
        let replayed: Vec<_> = finish
            .injected
            .iter()
            .map(|e| (e.state(), e.name(), e.fields().next().cloned()))
            .collect();
        assert_eq!(
            replayed,
            vec![
                (State::Play, Some("TAGS"), Some(FieldValue::VarInt(7))),
                (State::Play, Some("CHUNK"), Some(FieldValue::Int(1))),
            ]
        );
    }

    #[test]
    fn test_queue_overflow_is_a_violation() {
        let pipeline = pipeline(2);
        send_profile(&pipeline);
        clientbound(&pipeline, State::Play, 1, Vec::new());
        clientbound(&pipeline, State::Play, 1, Vec::new());
        let envelope = Envelope::new(Direction::Clientbound, State::Play, 1);
        let err = pipeline.transform(Direction::Clientbound, State::Play, envelope).unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn test_bridge_needs_packet_tables() {
        let mut builder = TranslatorBuilder::new(BRIDGING, ProtocolVersion::V1_20_2, ProtocolVersion::V1_20);
        builder.bridge(BridgeRules::new("JOIN_GAME", |_, _| Ok(Vec::new())));
        assert!(matches!(builder.build(), Err(ProtocolError::Configuration { .. })));
    }
}
