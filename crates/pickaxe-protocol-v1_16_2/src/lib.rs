//! Lets 1.16.2 clients play on 1.16.1 servers.

pub mod blocks;
pub mod packets;
pub mod recipes;
pub mod types;

use packets::*;
use pickaxe_mappings::MappingData;
use pickaxe_protocol_core::{
    Direction, EntityRewriter, FieldKind, FieldValue, HandlerKey, ItemRewriter, NbtFormat, ParticleRewriter,
    ProtocolError, ProtocolResult, SoundRewriter, State, StatisticsRewriter, TagRewriter, Target, Translator,
    TranslatorBuilder, TranslatorId,
};
use pickaxe_types::ProtocolVersion;
use std::sync::Arc;
use types::{entity_type_mapper, ABSTRACT_PIGLIN, FALLING_BLOCK, META_TYPES, MINECART_ABSTRACT, PARTICLES, PLAYER_1_16_2};

pub use blocks::MultiBlockChangeFilter;
pub use recipes::RecipeBookState;

pub const ID: TranslatorId = TranslatorId("1.16.2<-1.16.1");

/// Tags of 1.16.1 come in this order, without registry names.
const TAG_REGISTRIES: &[&str] = &["block", "item", "fluid", "entity_type"];

/// Equipment entries continue while the slot byte has this bit set.
const EQUIPMENT_CONTINUES: i8 = i8::MIN;

const ITEMS: NbtFormat = NbtFormat::Named;

fn play(direction: Direction, id: i32) -> HandlerKey {
    HandlerKey::id(State::Play, direction, id)
}

// TODO: convert the dimension and biome registries of join game and respawn,
// and the biome array of chunk data, to their 1.16.2 shape.
pub fn translator(mappings: Arc<MappingData>) -> ProtocolResult<Translator> {
    let mut builder = TranslatorBuilder::new(ID, ProtocolVersion::V1_16_2, ProtocolVersion::V1_16_1);
    builder.mappings(mappings.clone());

    // 1.16.2 moved the multi block change to the end of its range.
    builder.map(State::Play, Direction::Clientbound, MULTI_BLOCK_CHANGE, MULTI_BLOCK_CHANGE_1_16_2);
    for id in (MULTI_BLOCK_CHANGE + 1)..=MULTI_BLOCK_CHANGE_1_16_2 {
        builder.map(State::Play, Direction::Clientbound, id, id - 1);
    }
    // ... and split the recipe book packet in two, shifting everything after.
    for id in (SEEN_RECIPE + 1)..=0x2F {
        builder.map(State::Play, Direction::Serverbound, id, id - 1);
    }

    let entities = EntityRewriter::builder(ID, entity_type_mapper(ID.0)?, mappings.clone(), &META_TYPES, &META_TYPES)
        .map_block_state(MINECART_ABSTRACT, 10)
        .swap(ABSTRACT_PIGLIN, 15, 16)
        .build()?;
    builder.entity_rewriter(entities);
    register_entities(&mut builder);

    let items = ItemRewriter::new(mappings.clone());
    register_items(&mut builder, &items);

    ParticleRewriter::new(mappings.clone()).register_spawn_particle(
        &mut builder,
        play(Direction::Clientbound, SPAWN_PARTICLE),
        &PARTICLES,
        ITEMS,
    );

    let sounds = SoundRewriter::new(mappings);
    sounds.register_sound(&mut builder, play(Direction::Clientbound, ENTITY_SOUND));
    sounds.register_sound(&mut builder, play(Direction::Clientbound, SOUND));

    StatisticsRewriter::new().register(&mut builder, play(Direction::Clientbound, STATISTICS));
    TagRewriter::new().register_fixed(&mut builder, play(Direction::Clientbound, TAGS), TAG_REGISTRIES);

    blocks::register(&mut builder);
    builder.filter(MultiBlockChangeFilter);
    recipes::register(&mut builder);

    builder.build()
}

fn register_entities(builder: &mut TranslatorBuilder) {
    builder.register(play(Direction::Clientbound, SPAWN_ENTITY), Target::Auto, |envelope, ctx| {
        let rewriter = ctx
            .translator()
            .entity_rewriter()
            .ok_or(ProtocolError::Precondition("spawn handler without an entity rewriter"))?;
        let entity_id = envelope.passthrough_varint()?;
        envelope.passthrough_uuid()?;
        let old_type = envelope.read_varint()?;
        let new_type = rewriter.new_type_id(old_type);
        envelope.write(FieldValue::VarInt(new_type));
        rewriter.track(ctx.user(), entity_id, new_type);

        // x, y, z, pitch, yaw, then the object data
        for _ in 0..3 {
            envelope.passthrough_double()?;
        }
        envelope.passthrough_byte()?;
        envelope.passthrough_byte()?;
        let data = envelope.read_int()?;
        let data = if old_type == FALLING_BLOCK {
            ctx.translator().mappings().new_block_state_id(data)
        } else {
            data
        };
        envelope.write(FieldValue::Int(data));
        Ok(())
    });

    EntityRewriter::register_spawn_tracker(builder, play(Direction::Clientbound, SPAWN_MOB));

    builder.register(play(Direction::Clientbound, SPAWN_PLAYER), Target::Auto, |envelope, ctx| {
        let entity_id = envelope.passthrough_varint()?;
        if let Some(rewriter) = ctx.translator().entity_rewriter() {
            rewriter.track(ctx.user(), entity_id, PLAYER_1_16_2);
        }
        Ok(())
    });

    EntityRewriter::register_metadata_tracker(builder, play(Direction::Clientbound, ENTITY_METADATA));
    EntityRewriter::register_remove_entities(builder, play(Direction::Clientbound, DESTROY_ENTITIES));
}

fn register_items(builder: &mut TranslatorBuilder, items: &ItemRewriter) {
    items.register_window_items(builder, play(Direction::Clientbound, WINDOW_ITEMS), ITEMS);
    items.register_set_slot(
        builder,
        play(Direction::Clientbound, SET_SLOT),
        &[FieldKind::Byte, FieldKind::Short],
        ITEMS,
    );

    let rewriter = items.clone();
    builder.register(play(Direction::Clientbound, ENTITY_EQUIPMENT), Target::Auto, move |envelope, _| {
        envelope.passthrough_varint()?;
        loop {
            let slot = envelope.passthrough_byte()?;
            let mut stack = envelope.read_item(FieldKind::Item(ITEMS))?;
            rewriter.handle_item_to_client(&mut stack);
            envelope.write(FieldValue::Item(ITEMS, stack));
            if slot & EQUIPMENT_CONTINUES == 0 {
                return Ok(());
            }
        }
    });

    let rewriter = items.clone();
    builder.register(play(Direction::Serverbound, CLICK_WINDOW), Target::Auto, move |envelope, _| {
        // window, slot, button, action number, mode
        for kind in [FieldKind::Byte, FieldKind::Short, FieldKind::Byte, FieldKind::Short, FieldKind::VarInt] {
            envelope.passthrough(kind)?;
        }
        let mut stack = envelope.read_item(FieldKind::Item(ITEMS))?;
        rewriter.handle_item_to_server(&mut stack);
        envelope.write(FieldValue::Item(ITEMS, stack));
        Ok(())
    });

    items.register_creative_action(builder, play(Direction::Serverbound, CREATIVE_INVENTORY_ACTION), ITEMS);
}
