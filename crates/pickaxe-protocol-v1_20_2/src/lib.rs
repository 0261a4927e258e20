//! Lets 1.20.2 clients play on 1.20 servers.
//!
//! The big change is the configuration phase between login and play, see
//! [`configuration`]. Ids are derived from the packet tables in
//! [`packets`], so only packets whose content changed have handlers here.

pub mod configuration;
pub mod packets;

use pickaxe_mappings::MappingData;
use pickaxe_protocol_core::{
    Direction, Envelope, FieldValue, HandlerKey, ProtocolResult, SoundRewriter, State, StatisticsRewriter,
    TagRewriter, Target, Translator, TranslatorBuilder, TranslatorId,
};
use pickaxe_types::ProtocolVersion;
use std::sync::Arc;

pub const ID: TranslatorId = TranslatorId("1.20.2<-1.20");

/// Players are spawned like any other entity since 1.20.2.
pub const PLAYER_TYPE: i32 = 122;

fn play(direction: Direction, name: &'static str) -> HandlerKey {
    HandlerKey::named(State::Play, direction, name)
}

// TODO: item NBT is sent nameless since 1.20.2; rewrite the stacks of the
// inventory, equipment and metadata packets once item handling covers it.
pub fn translator(mappings: Arc<MappingData>) -> ProtocolResult<Translator> {
    let server = Arc::new(packets::packets_1_20());
    let client = Arc::new(packets::packets_1_20_2());

    let mut builder = TranslatorBuilder::new(ID, ProtocolVersion::V1_20_2, ProtocolVersion::V1_20);
    builder
        .mappings(mappings.clone())
        .packet_tables(server.clone(), client.clone());

    configuration::register(&mut builder, &server, &client)?;

    builder.register_clientbound("JOIN_GAME", |envelope, _| configuration::rewrite_join_game(envelope));
    builder.register_clientbound("RESPAWN", |envelope, _| configuration::rewrite_respawn(envelope));

    builder.register_clientbound("DISPLAY_SCOREBOARD", |envelope, _| {
        let position = envelope.read_byte()?;
        envelope.write(FieldValue::VarInt(i32::from(position)));
        Ok(())
    });

    let spawn_entity = client.require(State::Play, Direction::Clientbound, "SPAWN_ENTITY")?;
    builder.register(play(Direction::Clientbound, "SPAWN_PLAYER"), Target::Type(spawn_entity), |envelope, _| {
        envelope.passthrough_varint()?;
        envelope.passthrough_uuid()?;
        envelope.write(FieldValue::VarInt(PLAYER_TYPE));
        for _ in 0..3 {
            envelope.passthrough_double()?;
        }
        let yaw = envelope.read_byte()?;
        let pitch = envelope.read_byte()?;
        envelope.write(FieldValue::Byte(pitch));
        envelope.write(FieldValue::Byte(yaw));
        envelope.write(FieldValue::Byte(yaw));
        // no object data, no velocity
        envelope.write(FieldValue::VarInt(0));
        for _ in 0..3 {
            envelope.write(FieldValue::Short(0));
        }
        Ok(())
    });

    let tags = TagRewriter::new();
    tags.register_generic(&mut builder, play(Direction::Clientbound, "TAGS"));
    tags.register_generic(
        &mut builder,
        HandlerKey::named(State::Configuration, Direction::Clientbound, "UPDATE_TAGS"),
    );

    let sounds = SoundRewriter::new(mappings);
    sounds.register_holder_sound(&mut builder, play(Direction::Clientbound, "SOUND"));
    sounds.register_holder_sound(&mut builder, play(Direction::Clientbound, "ENTITY_SOUND"));

    StatisticsRewriter::new().register(&mut builder, play(Direction::Clientbound, "STATISTICS"));

    // Features now only arrive during configuration.
    builder.cancel_clientbound("UPDATE_ENABLED_FEATURES");
    builder.cancel_serverbound("CONFIGURATION_ACKNOWLEDGED");
    builder.cancel_serverbound("CHUNK_BATCH_RECEIVED");

    let pong = client.require(State::Play, Direction::Clientbound, "PONG_RESPONSE")?;
    builder.register_serverbound("PING_REQUEST", move |envelope, ctx| {
        let payload = envelope.read_long()?;
        envelope.cancel();
        let mut response = Envelope::from_type(pong);
        response.write(FieldValue::Long(payload));
        ctx.send(response, true)
    });

    builder.build()
}
