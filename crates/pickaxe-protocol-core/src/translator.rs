use crate::bridge::{Bridge, BridgeRules, PhaseBridge};
use crate::envelope::Envelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::filter::PacketFilter;
use crate::packet_type::{PacketTable, PacketType};
use crate::pipeline::PacketContext;
use crate::rewriter::{EntityRewriter, EntityTracker};
use crate::state::{Direction, State};
use crate::user::UserConnection;
use pickaxe_mappings::MappingData;
use pickaxe_types::ProtocolVersion;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Names a translator. Used for chain membership queries and as the owner
/// key of per-connection storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslatorId(pub &'static str);

impl fmt::Display for TranslatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub type Handler = Box<dyn Fn(&mut Envelope, &mut PacketContext<'_>) -> ProtocolResult<()> + Send + Sync>;
pub type InitHook = Box<dyn Fn(&UserConnection) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKey {
    Id(i32),
    Named(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    pub state: State,
    pub direction: Direction,
    pub packet: PacketKey,
}

impl HandlerKey {
    pub fn id(state: State, direction: Direction, id: i32) -> Self {
        Self {
            state,
            direction,
            packet: PacketKey::Id(id),
        }
    }

    pub fn named(state: State, direction: Direction, name: &'static str) -> Self {
        Self {
            state,
            direction,
            packet: PacketKey::Named(name),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.packet {
            PacketKey::Id(id) => write!(f, "{} {} 0x{:02x}", self.direction, self.state, id),
            PacketKey::Named(name) => write!(f, "{} {} {}", self.direction, self.state, name),
        }
    }
}

/// Where a registered packet goes once this translator has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Follow the static id remap table.
    Auto,
    /// Leave id and state as they are.
    Keep,
    Id(i32),
    To { state: State, id: i32 },
    Type(PacketType),
}

struct Registration {
    target: Target,
    handler: Option<Handler>,
}

/// One version pair's packet rewriting rules.
///
/// Translators carry no per-connection state; whatever they need to
/// remember lives in [`UserConnection`] storage under their [`TranslatorId`].
pub struct Translator {
    id: TranslatorId,
    client_version: ProtocolVersion,
    server_version: ProtocolVersion,
    base: bool,
    registrations: HashMap<HandlerKey, Registration>,
    remap: HashMap<(State, Direction, i32), Target>,
    server_table: Option<Arc<PacketTable>>,
    client_table: Option<Arc<PacketTable>>,
    bridge: Option<Bridge>,
    mappings: Arc<MappingData>,
    entity_rewriter: Option<EntityRewriter>,
    init: Vec<InitHook>,
    filter: Option<Box<dyn PacketFilter>>,
}

impl Translator {
    pub fn id(&self) -> TranslatorId {
        self.id
    }

    pub fn client_version(&self) -> ProtocolVersion {
        self.client_version
    }

    pub fn server_version(&self) -> ProtocolVersion {
        self.server_version
    }

    /// Base translators stay at the server end of every chain.
    pub fn is_base(&self) -> bool {
        self.base
    }

    pub fn mappings(&self) -> &MappingData {
        &self.mappings
    }

    pub fn entity_rewriter(&self) -> Option<&EntityRewriter> {
        self.entity_rewriter.as_ref()
    }

    pub fn bridge(&self) -> Option<&Bridge> {
        self.bridge.as_ref()
    }

    pub fn filter(&self) -> Option<&dyn PacketFilter> {
        self.filter.as_deref()
    }

    pub fn server_table(&self) -> Option<&PacketTable> {
        self.server_table.as_deref()
    }

    pub fn client_table(&self) -> Option<&PacketTable> {
        self.client_table.as_deref()
    }

    pub fn has_registration(&self, key: &HandlerKey) -> bool {
        self.registrations.contains_key(key)
    }

    /// Create this translator's per-connection storage.
    pub fn init(&self, user: &UserConnection) {
        if self.bridge.is_some() {
            user.put(self.id, PhaseBridge::default());
        }
        if self.entity_rewriter.is_some() {
            user.put(self.id, EntityTracker::default());
        }
        for hook in &self.init {
            hook(user);
        }
    }

    /// The table packets arrive in for `direction`.
    fn input_table(&self, direction: Direction) -> Option<&PacketTable> {
        match direction {
            Direction::Clientbound => self.server_table.as_deref(),
            Direction::Serverbound => self.client_table.as_deref(),
        }
    }

    /// The table packets leave in for `direction`.
    fn output_table(&self, direction: Direction) -> Option<&PacketTable> {
        match direction {
            Direction::Clientbound => self.client_table.as_deref(),
            Direction::Serverbound => self.server_table.as_deref(),
        }
    }

    /// Resolve the envelope's symbolic type on this translator's input side,
    /// tagging the envelope when it was untyped.
    pub fn resolve_type(&self, envelope: &mut Envelope) -> Option<PacketType> {
        if let Some(ty) = envelope.packet_type() {
            if ty.state == envelope.state() && ty.id == envelope.id() && ty.direction == envelope.direction() {
                return Some(ty);
            }
        }
        let ty = self
            .input_table(envelope.direction())?
            .by_id(envelope.state(), envelope.direction(), envelope.id())?;
        envelope.set_packet_type(ty);
        Some(ty)
    }

    /// Run this translator's rules for one envelope: the registered target
    /// and handler if there is a registration, the static remap otherwise.
    pub fn dispatch(&self, envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
        let state = envelope.state();
        let direction = envelope.direction();
        let id = envelope.id();
        let name = self.resolve_type(envelope).map(|ty| ty.name);

        let registration = name
            .and_then(|name| self.registrations.get(&HandlerKey::named(state, direction, name)))
            .or_else(|| self.registrations.get(&HandlerKey::id(state, direction, id)));

        match registration {
            Some(registration) => {
                self.apply_target(envelope, registration.target);
                if let Some(handler) = &registration.handler {
                    handler(envelope, ctx)?;
                }
            }
            None => self.apply_target(envelope, Target::Auto),
        }

        if !envelope.is_cancelled() {
            self.retag(envelope);
        }
        Ok(())
    }

    fn apply_target(&self, envelope: &mut Envelope, target: Target) {
        match target {
            Target::Auto => {
                let key = (envelope.state(), envelope.direction(), envelope.id());
                if let Some(&mapped) = self.remap.get(&key) {
                    self.apply_target(envelope, mapped);
                }
            }
            Target::Keep => {}
            Target::Id(id) => envelope.set_id(id),
            Target::To { state, id } => {
                envelope.set_state(state);
                envelope.set_id(id);
            }
            Target::Type(ty) => envelope.set_packet_type(ty),
        }
    }

    /// Make the symbolic type describe the output side.
    fn retag(&self, envelope: &mut Envelope) {
        let Some(table) = self.output_table(envelope.direction()) else {
            return;
        };
        match table.by_id(envelope.state(), envelope.direction(), envelope.id()) {
            Some(ty) => envelope.set_packet_type(ty),
            None => envelope.clear_packet_type(),
        }
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("id", &self.id)
            .field("client", &self.client_version.name)
            .field("server", &self.server_version.name)
            .field("base", &self.base)
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

/// Collects a translator's tables and validates them in [`build`].
///
/// [`build`]: TranslatorBuilder::build
pub struct TranslatorBuilder {
    id: TranslatorId,
    client_version: ProtocolVersion,
    server_version: ProtocolVersion,
    base: bool,
    registrations: Vec<(HandlerKey, Registration)>,
    explicit: Vec<((State, Direction, i32), i32)>,
    tables: Option<(Arc<PacketTable>, Arc<PacketTable>)>,
    bridge: Option<BridgeRules>,
    mappings: Option<Arc<MappingData>>,
    entity_rewriter: Option<EntityRewriter>,
    init: Vec<InitHook>,
    filter: Option<Box<dyn PacketFilter>>,
}

impl TranslatorBuilder {
    pub fn new(id: TranslatorId, client_version: ProtocolVersion, server_version: ProtocolVersion) -> Self {
        Self {
            id,
            client_version,
            server_version,
            base: false,
            registrations: Vec::new(),
            explicit: Vec::new(),
            tables: None,
            bridge: None,
            mappings: None,
            entity_rewriter: None,
            init: Vec::new(),
            filter: None,
        }
    }

    pub fn id(&self) -> TranslatorId {
        self.id
    }

    /// Derive the static id remap from two packet tables by name.
    pub fn packet_tables(&mut self, server: Arc<PacketTable>, client: Arc<PacketTable>) -> &mut Self {
        self.tables = Some((server, client));
        self
    }

    pub fn server_table(&self) -> Option<&Arc<PacketTable>> {
        self.tables.as_ref().map(|(server, _)| server)
    }

    pub fn client_table(&self) -> Option<&Arc<PacketTable>> {
        self.tables.as_ref().map(|(_, client)| client)
    }

    /// An explicit static remap entry. Takes precedence over table-derived ones.
    pub fn map(&mut self, state: State, direction: Direction, from: i32, to: i32) -> &mut Self {
        self.explicit.push(((state, direction, from), to));
        self
    }

    pub fn register<F>(&mut self, key: HandlerKey, target: Target, handler: F) -> &mut Self
    where
        F: Fn(&mut Envelope, &mut PacketContext<'_>) -> ProtocolResult<()> + Send + Sync + 'static,
    {
        self.registrations.push((
            key,
            Registration {
                target,
                handler: Some(Box::new(handler)),
            },
        ));
        self
    }

    /// A registration that only moves the packet.
    pub fn redirect(&mut self, key: HandlerKey, target: Target) -> &mut Self {
        self.registrations.push((key, Registration { target, handler: None }));
        self
    }

    pub fn register_clientbound<F>(&mut self, name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(&mut Envelope, &mut PacketContext<'_>) -> ProtocolResult<()> + Send + Sync + 'static,
    {
        self.register(HandlerKey::named(State::Play, Direction::Clientbound, name), Target::Auto, handler)
    }

    pub fn register_serverbound<F>(&mut self, name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(&mut Envelope, &mut PacketContext<'_>) -> ProtocolResult<()> + Send + Sync + 'static,
    {
        self.register(HandlerKey::named(State::Play, Direction::Serverbound, name), Target::Auto, handler)
    }

    pub fn cancel(&mut self, key: HandlerKey) -> &mut Self {
        self.register(key, Target::Keep, |envelope, _| {
            envelope.cancel();
            Ok(())
        })
    }

    pub fn cancel_clientbound(&mut self, name: &'static str) -> &mut Self {
        self.cancel(HandlerKey::named(State::Play, Direction::Clientbound, name))
    }

    pub fn cancel_serverbound(&mut self, name: &'static str) -> &mut Self {
        self.cancel(HandlerKey::named(State::Play, Direction::Serverbound, name))
    }

    pub fn bridge(&mut self, rules: BridgeRules) -> &mut Self {
        self.bridge = Some(rules);
        self
    }

    pub fn mappings(&mut self, mappings: Arc<MappingData>) -> &mut Self {
        self.mappings = Some(mappings);
        self
    }

    pub fn entity_rewriter(&mut self, rewriter: EntityRewriter) -> &mut Self {
        self.entity_rewriter = Some(rewriter);
        self
    }

    pub fn on_init(&mut self, hook: impl Fn(&UserConnection) + Send + Sync + 'static) -> &mut Self {
        self.init.push(Box::new(hook));
        self
    }

    pub fn filter(&mut self, filter: impl PacketFilter + 'static) -> &mut Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn base(&mut self) -> &mut Self {
        self.base = true;
        self
    }

    pub fn build(self) -> ProtocolResult<Translator> {
        let name = self.id.0;

        let mut registrations = HashMap::with_capacity(self.registrations.len());
        for (key, registration) in self.registrations {
            if let Some(tables) = &self.tables {
                if let PacketKey::Named(packet) = key.packet {
                    let known = [&tables.0, &tables.1]
                        .iter()
                        .any(|table| table.by_name(key.state, key.direction, packet).is_some());
                    if !known {
                        return Err(ProtocolError::configuration(name, format!("registration for unknown packet {}", key)));
                    }
                }
            }
            if registrations.insert(key, registration).is_some() {
                return Err(ProtocolError::configuration(name, format!("duplicate registration for {}", key)));
            }
        }

        let mut remap = HashMap::new();
        if let Some((server, client)) = &self.tables {
            for ty in server.types().filter(|ty| ty.direction == Direction::Clientbound) {
                if let Some(mapped) = client.by_name(ty.state, ty.direction, ty.name) {
                    remap.insert((ty.state, ty.direction, ty.id), Target::Type(mapped));
                }
            }
            for ty in client.types().filter(|ty| ty.direction == Direction::Serverbound) {
                if let Some(mapped) = server.by_name(ty.state, ty.direction, ty.name) {
                    remap.insert((ty.state, ty.direction, ty.id), Target::Type(mapped));
                }
            }
        }

        let mut explicit_seen = HashMap::new();
        for (from, to) in self.explicit {
            if let Some(previous) = explicit_seen.insert(from, to) {
                if previous != to {
                    return Err(ProtocolError::configuration(
                        name,
                        format!("0x{:02x} mapped to both 0x{:02x} and 0x{:02x}", from.2, previous, to),
                    ));
                }
            }
            remap.insert(from, Target::Id(to));
        }

        if let Some((server, client)) = &self.tables {
            let mut missing = Vec::new();
            let inputs = server
                .types()
                .filter(|ty| ty.direction == Direction::Clientbound)
                .chain(client.types().filter(|ty| ty.direction == Direction::Serverbound));
            for ty in inputs {
                let covered = remap.contains_key(&(ty.state, ty.direction, ty.id))
                    || registrations.contains_key(&HandlerKey::named(ty.state, ty.direction, ty.name))
                    || registrations.contains_key(&HandlerKey::id(ty.state, ty.direction, ty.id));
                if !covered {
                    missing.push(format!("{} {} {}", ty.direction, ty.state, ty.name));
                }
            }
            if !missing.is_empty() {
                missing.sort();
                return Err(ProtocolError::configuration(
                    name,
                    format!("no mapping for {}", missing.join(", ")),
                ));
            }
        }

        if let Some(rewriter) = &self.entity_rewriter {
            if rewriter.owner() != self.id {
                return Err(ProtocolError::configuration(
                    name,
                    format!("entity rewriter belongs to {}", rewriter.owner()),
                ));
            }
        }

        let bridge = match self.bridge {
            Some(rules) => {
                let Some((server, client)) = &self.tables else {
                    return Err(ProtocolError::configuration(name, "phase bridge needs packet tables"));
                };
                Some(rules.resolve(name, server, client)?)
            }
            None => None,
        };

        debug!(
            "Built translator {} ({} <- {}) with {} registrations and {} remapped ids",
            name,
            self.client_version,
            self.server_version,
            registrations.len(),
            remap.len()
        );

        let (server_table, client_table) = match self.tables {
            Some((server, client)) => (Some(server), Some(client)),
            None => (None, None),
        };

        Ok(Translator {
            id: self.id,
            client_version: self.client_version,
            server_version: self.server_version,
            base: self.base,
            registrations,
            remap,
            server_table,
            client_table,
            bridge,
            mappings: self.mappings.unwrap_or_default(),
            entity_rewriter: self.entity_rewriter,
            init: self.init,
            filter: self.filter,
        })
    }
}
