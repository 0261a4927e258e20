//! Packet lists of 1.20 and 1.20.2. Ids are positions in these lists.

use pickaxe_protocol_core::{Direction, PacketSection, PacketTable, State};

const LOGIN_CLIENTBOUND: &[&str] = &["DISCONNECT", "HELLO", "GAME_PROFILE", "COMPRESSION", "CUSTOM_QUERY"];

const LOGIN_SERVERBOUND_1_20: &[&str] = &["HELLO", "ENCRYPTION_KEY", "CUSTOM_QUERY_ANSWER"];

const LOGIN_SERVERBOUND_1_20_2: &[&str] = &["HELLO", "ENCRYPTION_KEY", "CUSTOM_QUERY_ANSWER", "LOGIN_ACKNOWLEDGED"];

const CONFIGURATION_CLIENTBOUND: &[&str] = &[
    "CUSTOM_PAYLOAD",
    "DISCONNECT",
    "FINISH_CONFIGURATION",
    "KEEP_ALIVE",
    "PING",
    "REGISTRY_DATA",
    "RESOURCE_PACK",
    "UPDATE_ENABLED_FEATURES",
    "UPDATE_TAGS",
];

const CONFIGURATION_SERVERBOUND: &[&str] = &[
    "CLIENT_INFORMATION",
    "CUSTOM_PAYLOAD",
    "FINISH_CONFIGURATION",
    "KEEP_ALIVE",
    "PONG",
    "RESOURCE_PACK",
];

const PLAY_CLIENTBOUND_1_20: &[&str] = &[
    "BUNDLE",
    "SPAWN_ENTITY",
    "SPAWN_EXPERIENCE_ORB",
    "SPAWN_PLAYER",
    "ENTITY_ANIMATION",
    "STATISTICS",
    "BLOCK_CHANGED_ACK",
    "BLOCK_BREAK_ANIMATION",
    "BLOCK_ENTITY_DATA",
    "BLOCK_ACTION",
    "BLOCK_CHANGE",
    "BOSSBAR",
    "SERVER_DIFFICULTY",
    "CHUNK_BIOMES",
    "CLEAR_TITLES",
    "TAB_COMPLETE",
    "DECLARE_COMMANDS",
    "CLOSE_WINDOW",
    "WINDOW_ITEMS",
    "WINDOW_PROPERTY",
    "SET_SLOT",
    "COOLDOWN",
    "CUSTOM_CHAT_COMPLETIONS",
    "PLUGIN_MESSAGE",
    "DAMAGE_EVENT",
    "DELETE_CHAT_MESSAGE",
    "DISCONNECT",
    "DISGUISED_CHAT",
    "ENTITY_STATUS",
    "EXPLOSION",
    "UNLOAD_CHUNK",
    "GAME_EVENT",
    "OPEN_HORSE_WINDOW",
    "HIT_ANIMATION",
    "WORLD_BORDER_INIT",
    "KEEP_ALIVE",
    "CHUNK_DATA",
    "EFFECT",
    "SPAWN_PARTICLE",
    "UPDATE_LIGHT",
    "JOIN_GAME",
    "MAP_DATA",
    "TRADE_LIST",
    "ENTITY_POSITION",
    "ENTITY_POSITION_AND_ROTATION",
    "ENTITY_ROTATION",
    "VEHICLE_MOVE",
    "OPEN_BOOK",
    "OPEN_WINDOW",
    "OPEN_SIGN_EDITOR",
    "PING",
    "CRAFT_RECIPE_RESPONSE",
    "PLAYER_ABILITIES",
    "PLAYER_CHAT",
    "COMBAT_END",
    "COMBAT_ENTER",
    "COMBAT_KILL",
    "PLAYER_INFO_REMOVE",
    "PLAYER_INFO_UPDATE",
    "FACE_PLAYER",
    "PLAYER_POSITION",
    "UNLOCK_RECIPES",
    "REMOVE_ENTITIES",
    "REMOVE_ENTITY_EFFECT",
    "RESOURCE_PACK",
    "RESPAWN",
    "ENTITY_HEAD_LOOK",
    "MULTI_BLOCK_CHANGE",
    "SELECT_ADVANCEMENTS_TAB",
    "SERVER_DATA",
    "ACTIONBAR",
    "WORLD_BORDER_CENTER",
    "WORLD_BORDER_LERP_SIZE",
    "WORLD_BORDER_SIZE",
    "WORLD_BORDER_WARNING_DELAY",
    "WORLD_BORDER_WARNING_DISTANCE",
    "CAMERA",
    "HELD_ITEM_CHANGE",
    "UPDATE_VIEW_POSITION",
    "UPDATE_VIEW_DISTANCE",
    "SPAWN_POSITION",
    "DISPLAY_SCOREBOARD",
    "ENTITY_METADATA",
    "ATTACH_ENTITY",
    "ENTITY_VELOCITY",
    "ENTITY_EQUIPMENT",
    "SET_EXPERIENCE",
    "UPDATE_HEALTH",
    "SCOREBOARD_OBJECTIVE",
    "SET_PASSENGERS",
    "TEAMS",
    "UPDATE_SCORE",
    "SET_SIMULATION_DISTANCE",
    "TITLE_SUBTITLE",
    "TIME_UPDATE",
    "TITLE_TEXT",
    "TITLE_TIMES",
    "ENTITY_SOUND",
    "SOUND",
    "STOP_SOUND",
    "SYSTEM_CHAT",
    "TAB_LIST",
    "NBT_QUERY",
    "COLLECT_ITEM",
    "ENTITY_TELEPORT",
    "ADVANCEMENTS",
    "ENTITY_PROPERTIES",
    "UPDATE_ENABLED_FEATURES",
    "ENTITY_EFFECT",
    "DECLARE_RECIPES",
    "TAGS",
];

const PLAY_CLIENTBOUND_1_20_2: &[&str] = &[
    "BUNDLE",
    "SPAWN_ENTITY",
    "SPAWN_EXPERIENCE_ORB",
    "ENTITY_ANIMATION",
    "STATISTICS",
    "BLOCK_CHANGED_ACK",
    "BLOCK_BREAK_ANIMATION",
    "BLOCK_ENTITY_DATA",
    "BLOCK_ACTION",
    "BLOCK_CHANGE",
    "BOSSBAR",
    "SERVER_DIFFICULTY",
    "CHUNK_BATCH_FINISHED",
    "CHUNK_BATCH_START",
    "CHUNK_BIOMES",
    "CLEAR_TITLES",
    "TAB_COMPLETE",
    "DECLARE_COMMANDS",
    "CLOSE_WINDOW",
    "WINDOW_ITEMS",
    "WINDOW_PROPERTY",
    "SET_SLOT",
    "COOLDOWN",
    "CUSTOM_CHAT_COMPLETIONS",
    "PLUGIN_MESSAGE",
    "DAMAGE_EVENT",
    "DELETE_CHAT_MESSAGE",
    "DISCONNECT",
    "DISGUISED_CHAT",
    "ENTITY_STATUS",
    "EXPLOSION",
    "UNLOAD_CHUNK",
    "GAME_EVENT",
    "OPEN_HORSE_WINDOW",
    "HIT_ANIMATION",
    "WORLD_BORDER_INIT",
    "KEEP_ALIVE",
    "CHUNK_DATA",
    "EFFECT",
    "SPAWN_PARTICLE",
    "UPDATE_LIGHT",
    "JOIN_GAME",
    "MAP_DATA",
    "TRADE_LIST",
    "ENTITY_POSITION",
    "ENTITY_POSITION_AND_ROTATION",
    "ENTITY_ROTATION",
    "VEHICLE_MOVE",
    "OPEN_BOOK",
    "OPEN_WINDOW",
    "OPEN_SIGN_EDITOR",
    "PING",
    "PONG_RESPONSE",
    "CRAFT_RECIPE_RESPONSE",
    "PLAYER_ABILITIES",
    "PLAYER_CHAT",
    "COMBAT_END",
    "COMBAT_ENTER",
    "COMBAT_KILL",
    "PLAYER_INFO_REMOVE",
    "PLAYER_INFO_UPDATE",
    "FACE_PLAYER",
    "PLAYER_POSITION",
    "UNLOCK_RECIPES",
    "REMOVE_ENTITIES",
    "REMOVE_ENTITY_EFFECT",
    "RESOURCE_PACK",
    "RESPAWN",
    "ENTITY_HEAD_LOOK",
    "MULTI_BLOCK_CHANGE",
    "SELECT_ADVANCEMENTS_TAB",
    "SERVER_DATA",
    "ACTIONBAR",
    "WORLD_BORDER_CENTER",
    "WORLD_BORDER_LERP_SIZE",
    "WORLD_BORDER_SIZE",
    "WORLD_BORDER_WARNING_DELAY",
    "WORLD_BORDER_WARNING_DISTANCE",
    "CAMERA",
    "HELD_ITEM_CHANGE",
    "UPDATE_VIEW_POSITION",
    "UPDATE_VIEW_DISTANCE",
    "SPAWN_POSITION",
    "DISPLAY_SCOREBOARD",
    "ENTITY_METADATA",
    "ATTACH_ENTITY",
    "ENTITY_VELOCITY",
    "ENTITY_EQUIPMENT",
    "SET_EXPERIENCE",
    "UPDATE_HEALTH",
    "SCOREBOARD_OBJECTIVE",
    "SET_PASSENGERS",
    "TEAMS",
    "UPDATE_SCORE",
    "SET_SIMULATION_DISTANCE",
    "TITLE_SUBTITLE",
    "TIME_UPDATE",
    "TITLE_TEXT",
    "TITLE_TIMES",
    "ENTITY_SOUND",
    "SOUND",
    "START_CONFIGURATION",
    "STOP_SOUND",
    "SYSTEM_CHAT",
    "TAB_LIST",
    "NBT_QUERY",
    "COLLECT_ITEM",
    "ENTITY_TELEPORT",
    "ADVANCEMENTS",
    "ENTITY_PROPERTIES",
    "ENTITY_EFFECT",
    "DECLARE_RECIPES",
    "TAGS",
];

const PLAY_SERVERBOUND_1_20: &[&str] = &[
    "TELEPORT_CONFIRM",
    "QUERY_BLOCK_NBT",
    "SET_DIFFICULTY",
    "CHAT_ACK",
    "CHAT_COMMAND",
    "CHAT_MESSAGE",
    "CHAT_SESSION_UPDATE",
    "CLIENT_STATUS",
    "CLIENT_SETTINGS",
    "TAB_COMPLETE",
    "CLICK_WINDOW_BUTTON",
    "CLICK_WINDOW",
    "CLOSE_WINDOW",
    "PLUGIN_MESSAGE",
    "EDIT_BOOK",
    "ENTITY_NBT_REQUEST",
    "INTERACT_ENTITY",
    "GENERATE_JIGSAW",
    "KEEP_ALIVE",
    "LOCK_DIFFICULTY",
    "PLAYER_POSITION",
    "PLAYER_POSITION_AND_ROTATION",
    "PLAYER_ROTATION",
    "PLAYER_MOVEMENT",
    "VEHICLE_MOVE",
    "STEER_BOAT",
    "PICK_ITEM",
    "CRAFT_RECIPE_REQUEST",
    "PLAYER_ABILITIES",
    "PLAYER_DIGGING",
    "ENTITY_ACTION",
    "STEER_VEHICLE",
    "PONG",
    "RECIPE_BOOK_DATA",
    "SEEN_RECIPE",
    "RENAME_ITEM",
    "RESOURCE_PACK_STATUS",
    "ADVANCEMENT_TAB",
    "SELECT_TRADE",
    "SET_BEACON_EFFECT",
    "HELD_ITEM_CHANGE",
    "UPDATE_COMMAND_BLOCK",
    "UPDATE_COMMAND_BLOCK_MINECART",
    "CREATIVE_INVENTORY_ACTION",
    "UPDATE_JIGSAW_BLOCK",
    "UPDATE_STRUCTURE_BLOCK",
    "UPDATE_SIGN",
    "ANIMATION",
    "SPECTATE",
    "PLAYER_BLOCK_PLACEMENT",
    "USE_ITEM",
];

const PLAY_SERVERBOUND_1_20_2: &[&str] = &[
    "TELEPORT_CONFIRM",
    "QUERY_BLOCK_NBT",
    "SET_DIFFICULTY",
    "CHAT_ACK",
    "CHAT_COMMAND",
    "CHAT_MESSAGE",
    "CHAT_SESSION_UPDATE",
    "CHUNK_BATCH_RECEIVED",
    "CLIENT_STATUS",
    "CLIENT_SETTINGS",
    "TAB_COMPLETE",
    "CONFIGURATION_ACKNOWLEDGED",
    "CLICK_WINDOW_BUTTON",
    "CLICK_WINDOW",
    "CLOSE_WINDOW",
    "PLUGIN_MESSAGE",
    "EDIT_BOOK",
    "ENTITY_NBT_REQUEST",
    "INTERACT_ENTITY",
    "GENERATE_JIGSAW",
    "KEEP_ALIVE",
    "LOCK_DIFFICULTY",
    "PLAYER_POSITION",
    "PLAYER_POSITION_AND_ROTATION",
    "PLAYER_ROTATION",
    "PLAYER_MOVEMENT",
    "VEHICLE_MOVE",
    "STEER_BOAT",
    "PICK_ITEM",
    "PING_REQUEST",
    "CRAFT_RECIPE_REQUEST",
    "PLAYER_ABILITIES",
    "PLAYER_DIGGING",
    "ENTITY_ACTION",
    "STEER_VEHICLE",
    "PONG",
    "RECIPE_BOOK_DATA",
    "SEEN_RECIPE",
    "RENAME_ITEM",
    "RESOURCE_PACK_STATUS",
    "ADVANCEMENT_TAB",
    "SELECT_TRADE",
    "SET_BEACON_EFFECT",
    "HELD_ITEM_CHANGE",
    "UPDATE_COMMAND_BLOCK",
    "UPDATE_COMMAND_BLOCK_MINECART",
    "CREATIVE_INVENTORY_ACTION",
    "UPDATE_JIGSAW_BLOCK",
    "UPDATE_STRUCTURE_BLOCK",
    "UPDATE_SIGN",
    "ANIMATION",
    "SPECTATE",
    "PLAYER_BLOCK_PLACEMENT",
    "USE_ITEM",
];

fn section(state: State, direction: Direction, names: &'static [&'static str]) -> PacketSection {
    PacketSection { state, direction, names }
}

/// 1.20 (763), which goes from login straight to play.
pub fn packets_1_20() -> PacketTable {
    PacketTable::new(
        "1.20",
        &[
            section(State::Login, Direction::Clientbound, LOGIN_CLIENTBOUND),
            section(State::Login, Direction::Serverbound, LOGIN_SERVERBOUND_1_20),
            section(State::Play, Direction::Clientbound, PLAY_CLIENTBOUND_1_20),
            section(State::Play, Direction::Serverbound, PLAY_SERVERBOUND_1_20),
        ],
    )
}

/// 1.20.2 (764), the first version with a configuration phase.
pub fn packets_1_20_2() -> PacketTable {
    PacketTable::new(
        "1.20.2",
        &[
            section(State::Login, Direction::Clientbound, LOGIN_CLIENTBOUND),
            section(State::Login, Direction::Serverbound, LOGIN_SERVERBOUND_1_20_2),
            section(State::Configuration, Direction::Clientbound, CONFIGURATION_CLIENTBOUND),
            section(State::Configuration, Direction::Serverbound, CONFIGURATION_SERVERBOUND),
            section(State::Play, Direction::Clientbound, PLAY_CLIENTBOUND_1_20_2),
            section(State::Play, Direction::Serverbound, PLAY_SERVERBOUND_1_20_2),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids() {
        let old = packets_1_20();
        let new = packets_1_20_2();
        let id = |table: &PacketTable, state, direction, name| table.by_name(state, direction, name).unwrap().id;

        assert_eq!(id(&old, State::Play, Direction::Clientbound, "JOIN_GAME"), 0x28);
        assert_eq!(id(&old, State::Play, Direction::Clientbound, "TAGS"), 0x6E);
        assert_eq!(id(&new, State::Play, Direction::Clientbound, "JOIN_GAME"), 0x29);
        assert_eq!(id(&new, State::Play, Direction::Clientbound, "TAGS"), 0x70);
        assert_eq!(id(&old, State::Play, Direction::Serverbound, "USE_ITEM"), 0x32);
        assert_eq!(id(&new, State::Play, Direction::Serverbound, "USE_ITEM"), 0x35);
        assert_eq!(id(&new, State::Login, Direction::Serverbound, "LOGIN_ACKNOWLEDGED"), 0x03);
        assert_eq!(id(&new, State::Configuration, Direction::Serverbound, "FINISH_CONFIGURATION"), 0x02);
    }
}
