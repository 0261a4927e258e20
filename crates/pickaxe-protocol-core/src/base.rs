use crate::error::{ProtocolError, ProtocolResult};
use crate::state::{Direction, State};
use crate::translator::{HandlerKey, Target, Translator, TranslatorBuilder, TranslatorId};
use crate::value::{FieldKind, FieldValue};
use pickaxe_types::ProtocolVersion;
use tracing::{debug, warn};

pub const BASE: TranslatorId = TranslatorId("base");

// === Packet ID constants ===
// These ids have not moved in any supported version.

// Handshake serverbound
const HANDSHAKE: i32 = 0x00;

// Status clientbound
const STATUS_RESPONSE: i32 = 0x00;

// Login serverbound
const LOGIN_HELLO: i32 = 0x00;
const LOGIN_ACKNOWLEDGED: i32 = 0x03;

// Login clientbound
const GAME_PROFILE: i32 = 0x02;

// Configuration serverbound (1.20.2+)
const CONFIG_FINISH: i32 = 0x02;

/// The translator that sits next to the server on every connection. It
/// tracks the lifecycle phase and identity of the connection as the
/// server sees them and presents the server's protocol number in the
/// handshake.
pub fn base_translator(server: ProtocolVersion) -> ProtocolResult<Translator> {
    let mut builder = TranslatorBuilder::new(BASE, server, server);
    builder.base();

    builder.register(
        HandlerKey::id(State::Handshake, Direction::Serverbound, HANDSHAKE),
        Target::Keep,
        move |envelope, ctx| {
            let client_protocol = envelope.read_varint()?;
            envelope.write(FieldValue::VarInt(server.number));
            envelope.passthrough_string()?;
            envelope.passthrough(FieldKind::UnsignedShort)?;
            let next = envelope.passthrough_varint()?;
            let state = State::from_handshake_next(next)
                .ok_or_else(|| ProtocolError::violation(format!("handshake requested unknown state {}", next)))?;

            let mut info = ctx.user().info();
            info.client_protocol = client_protocol;
            info.set_state(state);
            debug!(
                "[{}] handshake from protocol {} to {}, next state {}",
                ctx.user().id(),
                client_protocol,
                server,
                state
            );
            Ok(())
        },
    );

    builder.register(
        HandlerKey::id(State::Status, Direction::Clientbound, STATUS_RESPONSE),
        Target::Keep,
        |envelope, ctx| {
            let json = envelope.read_string()?;
            let client_protocol = ctx.user().info().client_protocol;
            envelope.write(FieldValue::String(rewrite_status_protocol(&json, client_protocol)));
            Ok(())
        },
    );

    builder.register(
        HandlerKey::id(State::Login, Direction::Serverbound, LOGIN_HELLO),
        Target::Keep,
        |envelope, ctx| {
            let username = envelope.passthrough_string()?;
            ctx.user().info().username = Some(username);
            Ok(())
        },
    );

    let configuration_phase = server >= ProtocolVersion::V1_20_2;
    builder.register(
        HandlerKey::id(State::Login, Direction::Clientbound, GAME_PROFILE),
        Target::Keep,
        move |envelope, ctx| {
            let uuid = envelope.passthrough_uuid()?;
            let username = envelope.passthrough_string()?;
            let mut info = ctx.user().info();
            info.uuid = Some(uuid);
            info.username = Some(username);
            // Newer servers wait for the client to acknowledge first.
            if !configuration_phase {
                info.set_state(State::Play);
            }
            Ok(())
        },
    );

    if configuration_phase {
        builder.register(
            HandlerKey::id(State::Login, Direction::Serverbound, LOGIN_ACKNOWLEDGED),
            Target::Keep,
            |_, ctx| {
                ctx.user().info().set_state(State::Configuration);
                Ok(())
            },
        );
        builder.register(
            HandlerKey::id(State::Configuration, Direction::Serverbound, CONFIG_FINISH),
            Target::Keep,
            |_, ctx| {
                ctx.user().info().set_state(State::Play);
                Ok(())
            },
        );
    }

    builder.build()
}

/// Report the client's own protocol number back in the server list ping
/// so the client does not flag the server as incompatible.
fn rewrite_status_protocol(json: &str, client_protocol: i32) -> String {
    let mut status: serde_json::Value = match serde_json::from_str(json) {
        Ok(status) => status,
        Err(e) => {
            warn!("Unparseable status response left as is: {}", e);
            return json.to_string();
        }
    };
    match status.get_mut("version").and_then(|v| v.get_mut("protocol")) {
        Some(protocol) if client_protocol > 0 => {
            *protocol = serde_json::Value::from(client_protocol);
            status.to_string()
        }
        _ => json.to_string(),
    }
}
