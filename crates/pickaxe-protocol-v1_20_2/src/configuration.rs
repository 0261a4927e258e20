//! The configuration phase a 1.20 server never enters.
//!
//! Once the server has sent the game profile it is in play, while the
//! client waits in login for its own acknowledgement and then expects a
//! configuration phase. The bridge holds the server's play packets back
//! until then, forwards those that have a configuration counterpart, and
//! builds the end of the phase from the server's join game packet. The
//! join game itself, and everything after it, is replayed once the client
//! reports that it finished configuring.

use pickaxe_protocol_core::{
    BridgeRules, Direction, Envelope, FieldKind, FieldValue, HandlerKey, NbtFormat, PacketTable, ProtocolResult,
    State, Target, TranslatorBuilder,
};
use tracing::debug;

/// Play packets of a 1.20 server that a configuring client understands,
/// with their configuration names.
const CARRY_OVER: &[(&str, &str)] = &[
    ("PLUGIN_MESSAGE", "CUSTOM_PAYLOAD"),
    ("DISCONNECT", "DISCONNECT"),
    ("KEEP_ALIVE", "KEEP_ALIVE"),
    ("PING", "PING"),
    ("RESOURCE_PACK", "RESOURCE_PACK"),
    ("UPDATE_ENABLED_FEATURES", "UPDATE_ENABLED_FEATURES"),
    ("TAGS", "UPDATE_TAGS"),
];

/// Configuration packets of a 1.20.2 client that a 1.20 server accepts in play.
const SERVERBOUND_TO_PLAY: &[(&str, &str)] = &[
    ("CLIENT_INFORMATION", "CLIENT_SETTINGS"),
    ("KEEP_ALIVE", "KEEP_ALIVE"),
    ("PONG", "PONG"),
    ("RESOURCE_PACK", "RESOURCE_PACK_STATUS"),
];

const VANILLA_FEATURES: &str = "minecraft:vanilla";

/// The leading fields of a 1.20 join game, up to and including the
/// registry codec.
struct JoinGameHead {
    entity_id: i32,
    hardcore: bool,
    game_mode: u8,
    previous_game_mode: i8,
    worlds: Vec<String>,
    registries: Option<pickaxe_nbt::NbtValue>,
}

impl JoinGameHead {
    fn read(envelope: &mut Envelope) -> ProtocolResult<Self> {
        Ok(Self {
            entity_id: envelope.read_int()?,
            hardcore: envelope.read_bool()?,
            game_mode: envelope.read_unsigned_byte()?,
            previous_game_mode: envelope.read_byte()?,
            worlds: envelope.read_string_array()?,
            registries: envelope.read_nbt(FieldKind::Nbt(NbtFormat::Named))?,
        })
    }
}

pub fn register(builder: &mut TranslatorBuilder, server: &PacketTable, client: &PacketTable) -> ProtocolResult<()> {
    register_login(builder);
    register_serverbound(builder, server)?;
    builder.bridge(bridge_rules(client)?);
    Ok(())
}

fn register_login(builder: &mut TranslatorBuilder) {
    // The client always knows its uuid now; 1.20 made it optional.
    builder.register(
        HandlerKey::named(State::Login, Direction::Serverbound, "HELLO"),
        Target::Auto,
        |envelope, _| {
            envelope.passthrough_string()?;
            let uuid = envelope.read_uuid()?;
            envelope.write(FieldValue::OptionalUuid(Some(uuid)));
            Ok(())
        },
    );

    builder.register(
        HandlerKey::named(State::Login, Direction::Clientbound, "GAME_PROFILE"),
        Target::Auto,
        |_, ctx| {
            debug!("[{}] server moved to play, holding its packets for the configuration phase", ctx.user().id());
            ctx.mark_profile_sent()
        },
    );

    builder.register(
        HandlerKey::named(State::Login, Direction::Serverbound, "LOGIN_ACKNOWLEDGED"),
        Target::Keep,
        |envelope, ctx| {
            envelope.cancel();
            ctx.enter_bridge_phase()
        },
    );
}

fn register_serverbound(builder: &mut TranslatorBuilder, server: &PacketTable) -> ProtocolResult<()> {
    builder.register(
        HandlerKey::named(State::Configuration, Direction::Serverbound, "FINISH_CONFIGURATION"),
        Target::Keep,
        |envelope, ctx| {
            envelope.cancel();
            ctx.finish_bridge_phase()
        },
    );

    // Plugin messages such as the client brand are sent on once the
    // client is in play as well.
    let plugin_message = server.require(State::Play, Direction::Serverbound, "PLUGIN_MESSAGE")?;
    builder.register(
        HandlerKey::named(State::Configuration, Direction::Serverbound, "CUSTOM_PAYLOAD"),
        Target::Keep,
        move |envelope, ctx| {
            let mut deferred = envelope.clone();
            deferred.set_packet_type(plugin_message);
            envelope.cancel();
            ctx.defer(deferred, true)
        },
    );

    for (configuration, play) in SERVERBOUND_TO_PLAY {
        let target = server.require(State::Play, Direction::Serverbound, play)?;
        builder.redirect(
            HandlerKey::named(State::Configuration, Direction::Serverbound, configuration),
            Target::Type(target),
        );
    }
    Ok(())
}

fn bridge_rules(client: &PacketTable) -> ProtocolResult<BridgeRules> {
    let registry_data = client.require(State::Configuration, Direction::Clientbound, "REGISTRY_DATA")?;
    let enabled_features = client.require(State::Configuration, Direction::Clientbound, "UPDATE_ENABLED_FEATURES")?;
    let finish = client.require(State::Configuration, Direction::Clientbound, "FINISH_CONFIGURATION")?;

    let rules = BridgeRules::new("JOIN_GAME", move |mut join_game, ctx| {
        let head = JoinGameHead::read(&mut join_game)?;
        debug!(
            "[{}] ending the configuration phase for entity {}",
            ctx.user().id(),
            head.entity_id
        );

        let mut registries = Envelope::from_type(registry_data);
        registries.write(FieldValue::Nbt(NbtFormat::Nameless, head.registries));
        let mut features = Envelope::from_type(enabled_features);
        features.write(FieldValue::StringArray(vec![VANILLA_FEATURES.to_string()]));
        Ok(vec![registries, features, Envelope::from_type(finish)])
    });
    Ok(CARRY_OVER
        .iter()
        .fold(rules, |rules, (play, configuration)| rules.carry_over(play, configuration)))
}

/// 1.20.2 moved the registries out of join game and regrouped the rest.
pub fn rewrite_join_game(envelope: &mut Envelope) -> ProtocolResult<()> {
    let head = JoinGameHead::read(envelope)?;
    let dimension_type = envelope.read_string()?;
    let dimension = envelope.read_string()?;
    let seed = envelope.read_long()?;
    let max_players = envelope.read_varint()?;
    let view_distance = envelope.read_varint()?;
    let simulation_distance = envelope.read_varint()?;
    let reduced_debug_info = envelope.read_bool()?;
    let respawn_screen = envelope.read_bool()?;

    envelope.write(FieldValue::Int(head.entity_id));
    envelope.write(FieldValue::Bool(head.hardcore));
    envelope.write(FieldValue::StringArray(head.worlds));
    envelope.write(FieldValue::VarInt(max_players));
    envelope.write(FieldValue::VarInt(view_distance));
    envelope.write(FieldValue::VarInt(simulation_distance));
    envelope.write(FieldValue::Bool(reduced_debug_info));
    envelope.write(FieldValue::Bool(respawn_screen));
    // do limited crafting
    envelope.write(FieldValue::Bool(false));
    envelope.write(FieldValue::String(dimension_type));
    envelope.write(FieldValue::String(dimension));
    envelope.write(FieldValue::Long(seed));
    envelope.write(FieldValue::UnsignedByte(head.game_mode));
    envelope.write(FieldValue::Byte(head.previous_game_mode));
    // debug, flat, death location and portal cooldown follow unchanged
    Ok(())
}

/// The data kept flags of respawn moved behind the death location and
/// portal cooldown.
pub fn rewrite_respawn(envelope: &mut Envelope) -> ProtocolResult<()> {
    envelope.passthrough_string()?; // dimension type
    envelope.passthrough_string()?; // dimension
    envelope.passthrough_long()?;
    envelope.passthrough_unsigned_byte()?;
    envelope.passthrough_byte()?;
    envelope.passthrough_bool()?; // debug
    envelope.passthrough_bool()?; // flat
    let data_kept = envelope.read_byte()?;
    if envelope.passthrough_bool()? {
        envelope.passthrough_string()?;
        envelope.passthrough_position()?;
    }
    envelope.passthrough_varint()?;
    envelope.write(FieldValue::Byte(data_kept));
    Ok(())
}
