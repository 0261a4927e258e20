// === Clientbound (1.16.1 ids) ===
pub const SPAWN_ENTITY: i32 = 0x00;
pub const SPAWN_MOB: i32 = 0x02;
pub const SPAWN_PLAYER: i32 = 0x04;
pub const STATISTICS: i32 = 0x06;
pub const ACKNOWLEDGE_PLAYER_DIGGING: i32 = 0x07;
pub const BLOCK_ACTION: i32 = 0x0A;
pub const BLOCK_CHANGE: i32 = 0x0B;
pub const MULTI_BLOCK_CHANGE: i32 = 0x0F;
pub const WINDOW_ITEMS: i32 = 0x14;
pub const SET_SLOT: i32 = 0x16;
pub const EFFECT: i32 = 0x22;
pub const SPAWN_PARTICLE: i32 = 0x23;
pub const UNLOCK_RECIPES: i32 = 0x36;
pub const DESTROY_ENTITIES: i32 = 0x37;
pub const ENTITY_METADATA: i32 = 0x44;
pub const ENTITY_EQUIPMENT: i32 = 0x47;
pub const ENTITY_SOUND: i32 = 0x50;
pub const SOUND: i32 = 0x51;
pub const TAGS: i32 = 0x5B;

/// Where the section-based multi block change sits in 1.16.2.
pub const MULTI_BLOCK_CHANGE_1_16_2: i32 = 0x3B;

// === Serverbound (1.16.2 ids) ===
pub const CLICK_WINDOW: i32 = 0x09;
pub const RECIPE_BOOK_STATE: i32 = 0x1E;
pub const SEEN_RECIPE: i32 = 0x1F;
pub const CREATIVE_INVENTORY_ACTION: i32 = 0x28;

/// 1.16.1 carried both recipe book packets as one.
pub const RECIPE_BOOK_DATA: i32 = 0x1E;
