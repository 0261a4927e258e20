use pickaxe_mappings::{MappingData, Mappings};
use pickaxe_nbt::NbtValue;
use pickaxe_protocol_core::{
    base_translator, BridgePhase, Direction, Envelope, FieldValue, NbtFormat, PacketTable, PhaseBridge, Pipeline,
    PipelineConfig, ProtocolInfo, State, Transformed, UserConnection,
};
use pickaxe_protocol_v1_20_2::packets::{packets_1_20, packets_1_20_2};
use pickaxe_protocol_v1_20_2::{translator, ID, PLAYER_TYPE};
use pickaxe_types::{BlockPos, ProtocolVersion};
use std::sync::Arc;
use uuid::Uuid;

fn id(table: &PacketTable, state: State, direction: Direction, name: &str) -> i32 {
    table.by_name(state, direction, name).unwrap().id
}

fn server(state: State, direction: Direction, name: &str) -> i32 {
    id(&packets_1_20(), state, direction, name)
}

fn client(state: State, direction: Direction, name: &str) -> i32 {
    id(&packets_1_20_2(), state, direction, name)
}

fn mappings() -> MappingData {
    MappingData {
        sounds: Some(Mappings::from_pairs(&[(0, 0), (3, 4)])),
        ..MappingData::identity()
    }
}

fn pipeline(state: State) -> Pipeline {
    let user = UserConnection::new(
        Arc::new(PipelineConfig::default()),
        ProtocolInfo::new(ProtocolVersion::V1_20_2.number, ProtocolVersion::V1_20.number),
    );
    user.info().set_state(state);
    let pipeline = Pipeline::new(Arc::new(user));
    pipeline
        .initialize(vec![Arc::new(base_translator(ProtocolVersion::V1_20).unwrap())])
        .unwrap();
    pipeline
        .append(Arc::new(translator(Arc::new(mappings())).unwrap()))
        .unwrap();
    pipeline
}

fn clientbound(pipeline: &Pipeline, state: State, name: &str, fields: Vec<FieldValue>) -> Transformed {
    let envelope = Envelope::with_fields(
        Direction::Clientbound,
        state,
        server(state, Direction::Clientbound, name),
        fields,
    );
    pipeline.transform(Direction::Clientbound, state, envelope).unwrap()
}

fn serverbound(pipeline: &Pipeline, state: State, name: &str, fields: Vec<FieldValue>) -> Transformed {
    let envelope = Envelope::with_fields(
        Direction::Serverbound,
        state,
        client(state, Direction::Serverbound, name),
        fields,
    );
    pipeline.transform(Direction::Serverbound, state, envelope).unwrap()
}

fn fields(envelope: &Envelope) -> Vec<FieldValue> {
    envelope.fields().cloned().collect()
}

fn names(result: &Transformed) -> Vec<(Direction, State, Option<&'static str>)> {
    result
        .injected
        .iter()
        .map(|envelope| (envelope.direction(), envelope.state(), envelope.name()))
        .collect()
}

fn phase(pipeline: &Pipeline) -> BridgePhase {
    pipeline
        .user()
        .with(ID, |bridge: &mut PhaseBridge| bridge.phase())
        .unwrap()
}

fn registry_codec() -> NbtValue {
    NbtValue::Compound(vec![(
        "minecraft:dimension_type".into(),
        NbtValue::Compound(vec![("type".into(), NbtValue::String("minecraft:dimension_type".into()))]),
    )])
}

fn join_game() -> Vec<FieldValue> {
    vec![
        FieldValue::Int(42),
        FieldValue::Bool(false),
        FieldValue::UnsignedByte(1),
        FieldValue::Byte(-1),
        FieldValue::StringArray(vec!["minecraft:overworld".into()]),
        FieldValue::Nbt(NbtFormat::Named, Some(registry_codec())),
        FieldValue::String("minecraft:overworld".into()),
        FieldValue::String("minecraft:overworld".into()),
        FieldValue::Long(1234),
        FieldValue::VarInt(20),
        FieldValue::VarInt(10),
        FieldValue::VarInt(8),
        FieldValue::Bool(false),
        FieldValue::Bool(true),
        FieldValue::Bool(false),
        FieldValue::Bool(true),
        FieldValue::Bool(false),
        FieldValue::VarInt(0),
    ]
}

#[test]
fn test_login_hello_always_carries_uuid() {
    let pipeline = pipeline(State::Login);
    let uuid = Uuid::from_u128(0xABCD);
    let result = serverbound(
        &pipeline,
        State::Login,
        "HELLO",
        vec![FieldValue::String("Steve".into()), FieldValue::Uuid(uuid)],
    );
    let hello = result.delivered().unwrap();
    assert_eq!(hello.id(), server(State::Login, Direction::Serverbound, "HELLO"));
    assert_eq!(
        fields(hello),
        vec![FieldValue::String("Steve".into()), FieldValue::OptionalUuid(Some(uuid))]
    );
    assert_eq!(pipeline.user().username().as_deref(), Some("Steve"));
}

#[test]
fn test_configuration_phase_is_emulated() {
    let pipeline = pipeline(State::Login);

    // The server goes straight to play after the profile.
    let profile = clientbound(
        &pipeline,
        State::Login,
        "GAME_PROFILE",
        vec![
            FieldValue::Uuid(Uuid::from_u128(7)),
            FieldValue::String("Steve".into()),
            FieldValue::VarInt(0),
        ],
    );
    assert_eq!(profile.delivered().unwrap().name(), Some("GAME_PROFILE"));
    assert_eq!(phase(&pipeline), BridgePhase::ProfileSent);
    {
        let info = pipeline.user().info();
        assert_eq!(info.server_state, State::Play);
        assert_eq!(info.client_state(), State::Login);
    }

    let brand = vec![
        FieldValue::String("minecraft:brand".into()),
        FieldValue::RemainingBytes(b"\x07vanilla".to_vec()),
    ];
    assert!(clientbound(&pipeline, State::Play, "PLUGIN_MESSAGE", brand).is_cancelled());
    assert!(clientbound(&pipeline, State::Play, "KEEP_ALIVE", vec![FieldValue::Long(1)]).is_cancelled());

    // Acknowledging replays what the server sent in the meantime.
    let ack = serverbound(&pipeline, State::Login, "LOGIN_ACKNOWLEDGED", vec![]);
    assert!(ack.is_cancelled());
    assert_eq!(phase(&pipeline), BridgePhase::InBridgePhase);
    assert_eq!(pipeline.user().info().client_state(), State::Configuration);
    assert_eq!(
        names(&ack),
        vec![
            (Direction::Clientbound, State::Configuration, Some("CUSTOM_PAYLOAD")),
            (Direction::Clientbound, State::Configuration, Some("KEEP_ALIVE")),
        ]
    );
    assert_eq!(
        ack.injected[1].id(),
        client(State::Configuration, Direction::Clientbound, "KEEP_ALIVE")
    );

    // Client settings reach the server as their play counterpart.
    let settings = serverbound(
        &pipeline,
        State::Configuration,
        "CLIENT_INFORMATION",
        vec![FieldValue::String("en_us".into()), FieldValue::Byte(12)],
    );
    let settings = settings.delivered().unwrap();
    assert_eq!(settings.state(), State::Play);
    assert_eq!(settings.id(), server(State::Play, Direction::Serverbound, "CLIENT_SETTINGS"));

    // The client brand waits until the client is in play.
    let payload = vec![
        FieldValue::String("minecraft:brand".into()),
        FieldValue::RemainingBytes(b"\x07vanilla".to_vec()),
    ];
    let custom = serverbound(&pipeline, State::Configuration, "CUSTOM_PAYLOAD", payload);
    assert!(custom.is_cancelled());
    assert!(custom.injected.is_empty());

    // Join game ends the emulated phase.
    let join = clientbound(&pipeline, State::Play, "JOIN_GAME", join_game());
    assert!(join.is_cancelled());
    assert_eq!(
        names(&join),
        vec![
            (Direction::Clientbound, State::Configuration, Some("REGISTRY_DATA")),
            (Direction::Clientbound, State::Configuration, Some("UPDATE_ENABLED_FEATURES")),
            (Direction::Clientbound, State::Configuration, Some("FINISH_CONFIGURATION")),
        ]
    );
    assert_eq!(
        fields(&join.injected[0]),
        vec![FieldValue::Nbt(NbtFormat::Nameless, Some(registry_codec()))]
    );
    assert_eq!(
        fields(&join.injected[1]),
        vec![FieldValue::StringArray(vec!["minecraft:vanilla".into()])]
    );

    // Anything after the join waits for the client as well.
    let position = vec![FieldValue::Position(BlockPos::new(0, 64, 0)), FieldValue::Float(0.0)];
    assert!(clientbound(&pipeline, State::Play, "SPAWN_POSITION", position).is_cancelled());

    let finish = serverbound(&pipeline, State::Configuration, "FINISH_CONFIGURATION", vec![]);
    assert!(finish.is_cancelled());
    assert_eq!(phase(&pipeline), BridgePhase::None);
    assert_eq!(pipeline.user().info().client_state(), State::Play);
    assert_eq!(
        names(&finish),
        vec![
            (Direction::Serverbound, State::Play, Some("PLUGIN_MESSAGE")),
            (Direction::Clientbound, State::Play, Some("JOIN_GAME")),
            (Direction::Clientbound, State::Play, Some("SPAWN_POSITION")),
        ]
    );
    assert_eq!(
        finish.injected[0].id(),
        server(State::Play, Direction::Serverbound, "PLUGIN_MESSAGE")
    );
    let joined = &finish.injected[1];
    assert_eq!(joined.id(), client(State::Play, Direction::Clientbound, "JOIN_GAME"));
    assert_eq!(
        fields(joined)[..8].to_vec(),
        vec![
            FieldValue::Int(42),
            FieldValue::Bool(false),
            FieldValue::StringArray(vec!["minecraft:overworld".into()]),
            FieldValue::VarInt(20),
            FieldValue::VarInt(10),
            FieldValue::VarInt(8),
            FieldValue::Bool(false),
            FieldValue::Bool(true),
        ]
    );

    // From here on packets pass straight through.
    let keep_alive = clientbound(&pipeline, State::Play, "KEEP_ALIVE", vec![FieldValue::Long(2)]);
    let keep_alive = keep_alive.delivered().unwrap();
    assert_eq!(keep_alive.state(), State::Play);
    assert_eq!(keep_alive.id(), client(State::Play, Direction::Clientbound, "KEEP_ALIVE"));
}

#[test]
fn test_join_game_drops_registries() {
    let pipeline = pipeline(State::Play);
    let result = clientbound(&pipeline, State::Play, "JOIN_GAME", join_game());
    let joined = result.delivered().unwrap();
    assert_eq!(
        fields(joined),
        vec![
            FieldValue::Int(42),
            FieldValue::Bool(false),
            FieldValue::StringArray(vec!["minecraft:overworld".into()]),
            FieldValue::VarInt(20),
            FieldValue::VarInt(10),
            FieldValue::VarInt(8),
            FieldValue::Bool(false),
            FieldValue::Bool(true),
            FieldValue::Bool(false),
            FieldValue::String("minecraft:overworld".into()),
            FieldValue::String("minecraft:overworld".into()),
            FieldValue::Long(1234),
            FieldValue::UnsignedByte(1),
            FieldValue::Byte(-1),
            FieldValue::Bool(false),
            FieldValue::Bool(true),
            FieldValue::Bool(false),
            FieldValue::VarInt(0),
        ]
    );
}

#[test]
fn test_join_game_sends_limited_crafting_before_dimension() {
    let pipeline = pipeline(State::Play);
    let result = clientbound(&pipeline, State::Play, "JOIN_GAME", join_game());
    let joined = fields(result.delivered().unwrap());
    assert_eq!(
        joined[7..10].to_vec(),
        vec![
            FieldValue::Bool(true),
            FieldValue::Bool(false),
            FieldValue::String("minecraft:overworld".into()),
        ]
    );
}

#[test]
fn test_respawn_moves_data_kept_to_the_end() {
    let pipeline = pipeline(State::Play);
    let head = vec![
        FieldValue::String("minecraft:the_nether".into()),
        FieldValue::String("minecraft:the_nether".into()),
        FieldValue::Long(99),
        FieldValue::UnsignedByte(0),
        FieldValue::Byte(-1),
        FieldValue::Bool(false),
        FieldValue::Bool(false),
    ];
    let death = vec![
        FieldValue::Bool(true),
        FieldValue::String("minecraft:overworld".into()),
        FieldValue::Position(BlockPos::new(10, 64, -3)),
        FieldValue::VarInt(5),
    ];

    let mut old_layout = head.clone();
    old_layout.push(FieldValue::Byte(3));
    old_layout.extend(death.clone());
    let result = clientbound(&pipeline, State::Play, "RESPAWN", old_layout);
    let respawn = result.delivered().unwrap();
    assert_eq!(respawn.id(), client(State::Play, Direction::Clientbound, "RESPAWN"));

    let mut expected = head;
    expected.extend(death);
    expected.push(FieldValue::Byte(3));
    assert_eq!(fields(respawn), expected);
}

#[test]
fn test_respawn_without_death_location() {
    let pipeline = pipeline(State::Play);
    let result = clientbound(
        &pipeline,
        State::Play,
        "RESPAWN",
        vec![
            FieldValue::String("minecraft:overworld".into()),
            FieldValue::String("minecraft:overworld".into()),
            FieldValue::Long(1),
            FieldValue::UnsignedByte(1),
            FieldValue::Byte(0),
            FieldValue::Bool(false),
            FieldValue::Bool(true),
            FieldValue::Byte(1),
            FieldValue::Bool(false),
            FieldValue::VarInt(0),
        ],
    );
    let respawn = fields(result.delivered().unwrap());
    assert_eq!(respawn.len(), 10);
    assert_eq!(respawn[7..].to_vec(), vec![FieldValue::Bool(false), FieldValue::VarInt(0), FieldValue::Byte(1)]);
}

#[test]
fn test_player_spawns_as_entity() {
    let pipeline = pipeline(State::Play);
    let uuid = Uuid::from_u128(99);
    let result = clientbound(
        &pipeline,
        State::Play,
        "SPAWN_PLAYER",
        vec![
            FieldValue::VarInt(5),
            FieldValue::Uuid(uuid),
            FieldValue::Double(1.0),
            FieldValue::Double(2.0),
            FieldValue::Double(3.0),
            FieldValue::Byte(64),
            FieldValue::Byte(-10),
        ],
    );
    let spawn = result.delivered().unwrap();
    assert_eq!(spawn.name(), Some("SPAWN_ENTITY"));
    assert_eq!(spawn.id(), client(State::Play, Direction::Clientbound, "SPAWN_ENTITY"));
    assert_eq!(
        fields(spawn),
        vec![
            FieldValue::VarInt(5),
            FieldValue::Uuid(uuid),
            FieldValue::VarInt(PLAYER_TYPE),
            FieldValue::Double(1.0),
            FieldValue::Double(2.0),
            FieldValue::Double(3.0),
            FieldValue::Byte(-10),
            FieldValue::Byte(64),
            FieldValue::Byte(64),
            FieldValue::VarInt(0),
            FieldValue::Short(0),
            FieldValue::Short(0),
            FieldValue::Short(0),
        ]
    );
}

#[test]
fn test_display_scoreboard_position_is_varint() {
    let pipeline = pipeline(State::Play);
    let result = clientbound(
        &pipeline,
        State::Play,
        "DISPLAY_SCOREBOARD",
        vec![FieldValue::Byte(1), FieldValue::String("kills".into())],
    );
    assert_eq!(
        fields(result.delivered().unwrap()),
        vec![FieldValue::VarInt(1), FieldValue::String("kills".into())]
    );
}

#[test]
fn test_ping_request_is_answered_locally() {
    let pipeline = pipeline(State::Play);
    let result = serverbound(&pipeline, State::Play, "PING_REQUEST", vec![FieldValue::Long(77)]);
    assert!(result.is_cancelled());
    assert_eq!(result.injected.len(), 1);
    let pong = &result.injected[0];
    assert_eq!(pong.direction(), Direction::Clientbound);
    assert_eq!(pong.name(), Some("PONG_RESPONSE"));
    assert_eq!(fields(pong), vec![FieldValue::Long(77)]);
}

#[test]
fn test_client_only_packets_never_reach_the_server() {
    let pipeline = pipeline(State::Play);
    assert!(serverbound(&pipeline, State::Play, "CHUNK_BATCH_RECEIVED", vec![FieldValue::Float(20.0)]).is_cancelled());
    assert!(serverbound(&pipeline, State::Play, "CONFIGURATION_ACKNOWLEDGED", vec![]).is_cancelled());
    assert!(clientbound(
        &pipeline,
        State::Play,
        "UPDATE_ENABLED_FEATURES",
        vec![FieldValue::StringArray(vec!["minecraft:vanilla".into()])]
    )
    .is_cancelled());
}

#[test]
fn test_holder_sounds_are_remapped() {
    let pipeline = pipeline(State::Play);
    let result = clientbound(
        &pipeline,
        State::Play,
        "SOUND",
        vec![FieldValue::VarInt(4), FieldValue::VarInt(0)],
    );
    assert_eq!(
        fields(result.delivered().unwrap()),
        vec![FieldValue::VarInt(5), FieldValue::VarInt(0)]
    );

    let unknown = clientbound(&pipeline, State::Play, "SOUND", vec![FieldValue::VarInt(3)]);
    assert!(unknown.is_cancelled());
}
