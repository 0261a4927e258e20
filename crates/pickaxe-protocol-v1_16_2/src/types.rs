//! Entity types, metadata types and particles of 1.16.1 and 1.16.2.

use pickaxe_protocol_core::{
    abstract_entity, entity, EntityTypeDef, EntityTypeMapper, EntityTypeTable, MetaKind, MetaTypes, NbtFormat,
    ParticleArg, ParticleLayout, ProtocolResult,
};

pub const MINECART_ABSTRACT: &str = "minecart_abstract";
pub const ABSTRACT_PIGLIN: &str = "abstract_piglin";

/// 1.16.2 inserted the piglin brute here; every later id moved up by one.
const PIGLIN_BRUTE_ID: i32 = 61;

pub const FALLING_BLOCK: i32 = 26;
pub const PLAYER_1_16_2: i32 = 106;

const ABSTRACT: &[EntityTypeDef] = &[
    abstract_entity("entity", None),
    abstract_entity("living", Some("entity")),
    abstract_entity("mob", Some("living")),
    abstract_entity("creature", Some("mob")),
    abstract_entity("ageable", Some("creature")),
    abstract_entity("animal", Some("ageable")),
    abstract_entity("tameable", Some("animal")),
    abstract_entity("abstract_horse", Some("animal")),
    abstract_entity("chested_horse", Some("abstract_horse")),
    abstract_entity("abstract_villager", Some("ageable")),
    abstract_entity("monster", Some("creature")),
    abstract_entity("abstract_raider", Some("monster")),
    abstract_entity("abstract_illager", Some("abstract_raider")),
    abstract_entity("abstract_skeleton", Some("monster")),
    abstract_entity("flying", Some("mob")),
    abstract_entity("water_animal", Some("creature")),
    abstract_entity("abstract_fish", Some("water_animal")),
    abstract_entity("abstract_golem", Some("creature")),
    abstract_entity("projectile", Some("entity")),
    abstract_entity("arrow_abstract", Some("projectile")),
    abstract_entity("throwable", Some("projectile")),
    abstract_entity("fireball_abstract", Some("entity")),
    abstract_entity("hanging", Some("entity")),
    abstract_entity(MINECART_ABSTRACT, Some("entity")),
    abstract_entity("chested_minecart", Some(MINECART_ABSTRACT)),
];

const CONCRETE_1_16_1: &[EntityTypeDef] = &[
    entity("area_effect_cloud", 0, Some("entity")),
    entity("armor_stand", 1, Some("living")),
    entity("arrow", 2, Some("arrow_abstract")),
    entity("bat", 3, Some("mob")),
    entity("bee", 4, Some("animal")),
    entity("blaze", 5, Some("monster")),
    entity("boat", 6, Some("entity")),
    entity("cat", 7, Some("tameable")),
    entity("cave_spider", 8, Some("monster")),
    entity("chicken", 9, Some("animal")),
    entity("cod", 10, Some("abstract_fish")),
    entity("cow", 11, Some("animal")),
    entity("creeper", 12, Some("monster")),
    entity("dolphin", 13, Some("water_animal")),
    entity("donkey", 14, Some("chested_horse")),
    entity("dragon_fireball", 15, Some("fireball_abstract")),
    entity("drowned", 16, Some("monster")),
    entity("elder_guardian", 17, Some("monster")),
    entity("end_crystal", 18, Some("entity")),
    entity("ender_dragon", 19, Some("mob")),
    entity("enderman", 20, Some("monster")),
    entity("endermite", 21, Some("monster")),
    entity("evoker", 22, Some("abstract_illager")),
    entity("evoker_fangs", 23, Some("entity")),
    entity("experience_orb", 24, Some("entity")),
    entity("eye_of_ender", 25, Some("entity")),
    entity("falling_block", FALLING_BLOCK, Some("entity")),
    entity("firework_rocket", 27, Some("projectile")),
    entity("fox", 28, Some("animal")),
    entity("ghast", 29, Some("flying")),
    entity("giant", 30, Some("monster")),
    entity("guardian", 31, Some("monster")),
    entity("hoglin", 32, Some("animal")),
    entity("horse", 33, Some("abstract_horse")),
    entity("husk", 34, Some("monster")),
    entity("illusioner", 35, Some("abstract_illager")),
    entity("iron_golem", 36, Some("abstract_golem")),
    entity("item", 37, Some("entity")),
    entity("item_frame", 38, Some("hanging")),
    entity("fireball", 39, Some("fireball_abstract")),
    entity("leash_knot", 40, Some("hanging")),
    entity("lightning_bolt", 41, Some("entity")),
    entity("llama", 42, Some("chested_horse")),
    entity("llama_spit", 43, Some("projectile")),
    entity("magma_cube", 44, Some("mob")),
    entity("minecart", 45, Some(MINECART_ABSTRACT)),
    entity("chest_minecart", 46, Some("chested_minecart")),
    entity("command_block_minecart", 47, Some(MINECART_ABSTRACT)),
    entity("furnace_minecart", 48, Some(MINECART_ABSTRACT)),
    entity("hopper_minecart", 49, Some("chested_minecart")),
    entity("spawner_minecart", 50, Some(MINECART_ABSTRACT)),
    entity("tnt_minecart", 51, Some(MINECART_ABSTRACT)),
    entity("mule", 52, Some("chested_horse")),
    entity("mooshroom", 53, Some("animal")),
    entity("ocelot", 54, Some("animal")),
    entity("painting", 55, Some("hanging")),
    entity("panda", 56, Some("animal")),
    entity("parrot", 57, Some("tameable")),
    entity("phantom", 58, Some("flying")),
    entity("pig", 59, Some("animal")),
    entity("piglin", 60, Some("monster")),
    entity("pillager", 61, Some("abstract_illager")),
    entity("polar_bear", 62, Some("animal")),
    entity("tnt", 63, Some("entity")),
    entity("pufferfish", 64, Some("abstract_fish")),
    entity("rabbit", 65, Some("animal")),
    entity("ravager", 66, Some("abstract_raider")),
    entity("salmon", 67, Some("abstract_fish")),
    entity("sheep", 68, Some("animal")),
    entity("shulker", 69, Some("abstract_golem")),
    entity("shulker_bullet", 70, Some("projectile")),
    entity("silverfish", 71, Some("monster")),
    entity("skeleton", 72, Some("abstract_skeleton")),
    entity("skeleton_horse", 73, Some("abstract_horse")),
    entity("slime", 74, Some("mob")),
    entity("small_fireball", 75, Some("fireball_abstract")),
    entity("snow_golem", 76, Some("abstract_golem")),
    entity("snowball", 77, Some("throwable")),
    entity("spectral_arrow", 78, Some("arrow_abstract")),
    entity("spider", 79, Some("monster")),
    entity("squid", 80, Some("water_animal")),
    entity("stray", 81, Some("abstract_skeleton")),
    entity("strider", 82, Some("animal")),
    entity("egg", 83, Some("throwable")),
    entity("ender_pearl", 84, Some("throwable")),
    entity("experience_bottle", 85, Some("throwable")),
    entity("potion", 86, Some("throwable")),
    entity("trident", 87, Some("arrow_abstract")),
    entity("trader_llama", 88, Some("chested_horse")),
    entity("tropical_fish", 89, Some("abstract_fish")),
    entity("turtle", 90, Some("animal")),
    entity("vex", 91, Some("monster")),
    entity("villager", 92, Some("abstract_villager")),
    entity("vindicator", 93, Some("abstract_illager")),
    entity("wandering_trader", 94, Some("abstract_villager")),
    entity("witch", 95, Some("abstract_raider")),
    entity("wither", 96, Some("monster")),
    entity("wither_skeleton", 97, Some("abstract_skeleton")),
    entity("wither_skull", 98, Some("fireball_abstract")),
    entity("wolf", 99, Some("tameable")),
    entity("zoglin", 100, Some("monster")),
    entity("zombie", 101, Some("monster")),
    entity("zombie_horse", 102, Some("abstract_horse")),
    entity("zombie_villager", 103, Some("monster")),
    entity("zombified_piglin", 104, Some("monster")),
    entity("player", 105, Some("living")),
    entity("fishing_bobber", 106, Some("projectile")),
];

pub fn entity_types_1_16_1() -> ProtocolResult<EntityTypeTable> {
    let defs: Vec<EntityTypeDef> = ABSTRACT.iter().chain(CONCRETE_1_16_1).copied().collect();
    EntityTypeTable::new("1.16.1", &defs)
}

/// 1.16.1 plus the piglin brute, with both piglins under a shared parent.
pub fn entity_types_1_16_2() -> ProtocolResult<EntityTypeTable> {
    let mut defs: Vec<EntityTypeDef> = ABSTRACT.to_vec();
    defs.push(abstract_entity(ABSTRACT_PIGLIN, Some("monster")));
    for def in CONCRETE_1_16_1 {
        let id = def.id.map(|id| if id >= PIGLIN_BRUTE_ID { id + 1 } else { id });
        let parent = if def.name == "piglin" { Some(ABSTRACT_PIGLIN) } else { def.parent };
        defs.push(EntityTypeDef { id, parent, ..*def });
        if def.name == "piglin" {
            defs.push(entity("piglin_brute", PIGLIN_BRUTE_ID, Some(ABSTRACT_PIGLIN)));
        }
    }
    EntityTypeTable::new("1.16.2", &defs)
}

pub fn entity_type_mapper(translator: &'static str) -> ProtocolResult<EntityTypeMapper> {
    EntityTypeMapper::map_types(translator, &entity_types_1_16_1()?, entity_types_1_16_2()?)
}

pub static PARTICLES: ParticleLayout = ParticleLayout {
    entries: &[
        // block
        (3, &[ParticleArg::BlockState]),
        // dust: red, green, blue, scale
        (14, &[ParticleArg::Float, ParticleArg::Float, ParticleArg::Float, ParticleArg::Float]),
        // falling_dust
        (23, &[ParticleArg::BlockState]),
        // item
        (32, &[ParticleArg::Item]),
    ],
};

/// Unchanged between 1.16.1 and 1.16.2.
pub static META_TYPES: MetaTypes = MetaTypes {
    name: "1.16",
    kinds: &[
        MetaKind::Byte,
        MetaKind::VarInt,
        MetaKind::Float,
        MetaKind::String,
        MetaKind::Component,
        MetaKind::OptComponent,
        MetaKind::Item,
        MetaKind::Boolean,
        MetaKind::Rotation,
        MetaKind::Position,
        MetaKind::OptPosition,
        MetaKind::Direction,
        MetaKind::OptUuid,
        MetaKind::BlockState,
        MetaKind::Nbt,
        MetaKind::Particle,
        MetaKind::VillagerData,
        MetaKind::OptVarInt,
        MetaKind::Pose,
    ],
    particles: &PARTICLES,
    nbt: NbtFormat::Named,
};
