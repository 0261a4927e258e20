use crate::entity::{EntityTypeMapper, EntityTypeRef};
use crate::envelope::Envelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::metadata::{MetaTypes, MetaValue, Metadata, MetadataList};
use crate::pipeline::PacketContext;
use crate::rewriter::{ItemRewriter, ParticleRewriter};
use crate::translator::{HandlerKey, Target, TranslatorBuilder, TranslatorId};
use crate::user::UserConnection;
use crate::value::{FieldKind, FieldValue};
use pickaxe_mappings::MappingData;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Entity id -> new-version type id for every entity the client was told
/// about. Lives in connection storage under the translator's id.
#[derive(Debug, Default)]
pub struct EntityTracker {
    types: HashMap<i32, i32>,
}

impl EntityTracker {
    pub fn add(&mut self, entity_id: i32, type_id: i32) {
        self.types.insert(entity_id, type_id);
    }

    pub fn remove(&mut self, entity_id: i32) -> Option<i32> {
        self.types.remove(&entity_id)
    }

    pub fn get(&self, entity_id: i32) -> Option<i32> {
        self.types.get(&entity_id).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataAction {
    /// The varint in the slot is a block state id.
    MapBlockState,
    /// Move the entry to another slot.
    MoveTo(u8),
}

/// Applies to entries at `index` of entities that are `ancestor` or
/// descend from it. `index` is matched against the entry's slot as it
/// arrived, so rules never see each other's moves.
#[derive(Debug, Clone, Copy)]
struct MetadataRule {
    ancestor: &'static str,
    index: u8,
    action: MetadataAction,
}

/// Entity type ids and entity metadata for one version pair.
///
/// Values are rewritten by kind first (items, block states, particles),
/// then the hierarchy rules run for entities of known type.
pub struct EntityRewriter {
    owner: TranslatorId,
    mapper: EntityTypeMapper,
    mappings: Arc<MappingData>,
    old_meta: &'static MetaTypes,
    new_meta: &'static MetaTypes,
    items: ItemRewriter,
    particles: ParticleRewriter,
    rules: Vec<MetadataRule>,
}

impl EntityRewriter {
    pub fn builder(
        owner: TranslatorId,
        mapper: EntityTypeMapper,
        mappings: Arc<MappingData>,
        old_meta: &'static MetaTypes,
        new_meta: &'static MetaTypes,
    ) -> EntityRewriterBuilder {
        EntityRewriterBuilder {
            owner,
            mapper,
            mappings,
            old_meta,
            new_meta,
            rules: Vec::new(),
        }
    }

    pub fn owner(&self) -> TranslatorId {
        self.owner
    }

    pub fn old_meta(&self) -> &'static MetaTypes {
        self.old_meta
    }

    pub fn new_meta(&self) -> &'static MetaTypes {
        self.new_meta
    }

    pub fn new_type_id(&self, old: i32) -> i32 {
        self.mapper.new_type_id(old)
    }

    pub fn type_from_id(&self, id: i32) -> Option<EntityTypeRef<'_>> {
        self.mapper.type_from_id(id)
    }

    pub fn track(&self, user: &UserConnection, entity_id: i32, type_id: i32) {
        user.with(self.owner, |tracker: &mut EntityTracker| tracker.add(entity_id, type_id));
    }

    pub fn untrack(&self, user: &UserConnection, entity_id: i32) {
        user.with(self.owner, |tracker: &mut EntityTracker| tracker.remove(entity_id));
    }

    /// The new-version type id recorded when the entity spawned.
    pub fn tracked_type(&self, user: &UserConnection, entity_id: i32) -> Option<i32> {
        user.with(self.owner, |tracker: &mut EntityTracker| tracker.get(entity_id))
            .flatten()
    }

    /// Rewrite `entries[index]` in place. Without a type only the value
    /// rewrites apply.
    pub fn handle_metadata(
        &self,
        entity_id: i32,
        ty: Option<EntityTypeRef<'_>>,
        index: usize,
        entries: &mut [Metadata],
        user: &UserConnection,
    ) {
        let Some(entry) = entries.get_mut(index) else {
            return;
        };
        match &mut entry.value {
            MetaValue::Item(item) => self.items.handle_item_to_client(item),
            MetaValue::BlockState(state) => *state = self.mappings.new_block_state_id(*state),
            MetaValue::Particle(particle) => self.particles.rewrite_particle(particle),
            _ => {}
        }

        let Some(ty) = ty else {
            return;
        };
        let slot = entry.index;
        for rule in self.rules.iter().filter(|rule| rule.index == slot) {
            let Some(ancestor) = self.mapper.new_types().by_name(rule.ancestor) else {
                continue;
            };
            if !ty.is_or_has_parent(ancestor) {
                continue;
            }
            match rule.action {
                MetadataAction::MapBlockState => {
                    if let MetaValue::VarInt(state) = &mut entry.value {
                        *state = self.mappings.new_block_state_id(*state);
                    }
                }
                MetadataAction::MoveTo(target) => {
                    trace!(
                        "[{}] entity {} ({}): metadata slot {} -> {}",
                        user.id(),
                        entity_id,
                        ty.name(),
                        slot,
                        target
                    );
                    entry.index = target;
                }
            }
        }
    }

    /// Rewrite every entry and re-tag the list for the new version.
    pub fn handle_metadata_list(
        &self,
        entity_id: i32,
        ty: Option<EntityTypeRef<'_>>,
        list: &mut MetadataList,
        user: &UserConnection,
    ) {
        for index in 0..list.entries.len() {
            self.handle_metadata(entity_id, ty, index, &mut list.entries, user);
        }
        list.types = self.new_meta;
    }

    /// Spawn packets that start with an entity id, a uuid and a varint type.
    /// The type is remapped and recorded for later metadata packets.
    pub fn register_spawn_tracker(builder: &mut TranslatorBuilder, key: HandlerKey) {
        builder.register(key, Target::Auto, |envelope, ctx| rewrite_spawn_type(envelope, ctx));
    }

    pub fn register_metadata_tracker(builder: &mut TranslatorBuilder, key: HandlerKey) {
        builder.register(key, Target::Auto, |envelope, ctx| rewrite_metadata_packet(envelope, ctx));
    }

    pub fn register_remove_entities(builder: &mut TranslatorBuilder, key: HandlerKey) {
        builder.register(key, Target::Auto, |envelope, ctx| remove_entities(envelope, ctx));
    }
}

fn rewriter<'c>(ctx: &'c PacketContext<'_>) -> ProtocolResult<&'c EntityRewriter> {
    ctx.translator()
        .entity_rewriter()
        .ok_or(ProtocolError::Precondition("entity handler registered without an entity rewriter"))
}

pub fn rewrite_spawn_type(envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
    let rewriter = rewriter(ctx)?;
    let entity_id = envelope.passthrough_varint()?;
    envelope.passthrough_uuid()?;
    let old_type = envelope.read_varint()?;
    let new_type = rewriter.new_type_id(old_type);
    envelope.write(FieldValue::VarInt(new_type));
    rewriter.track(ctx.user(), entity_id, new_type);
    Ok(())
}

pub fn rewrite_metadata_packet(envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
    let rewriter = rewriter(ctx)?;
    let entity_id = envelope.passthrough_varint()?;
    let mut list = envelope.read_metadata(FieldKind::Metadata(rewriter.old_meta))?;
    let ty = rewriter
        .tracked_type(ctx.user(), entity_id)
        .and_then(|id| rewriter.type_from_id(id));
    if ty.is_none() {
        debug!("Metadata for untracked entity {}", entity_id);
    }
    rewriter.handle_metadata_list(entity_id, ty, &mut list, ctx.user());
    envelope.write(FieldValue::Metadata(list));
    Ok(())
}

pub fn remove_entities(envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
    let rewriter = rewriter(ctx)?;
    for entity_id in envelope.passthrough_varint_array()? {
        rewriter.untrack(ctx.user(), entity_id);
    }
    Ok(())
}

pub struct EntityRewriterBuilder {
    owner: TranslatorId,
    mapper: EntityTypeMapper,
    mappings: Arc<MappingData>,
    old_meta: &'static MetaTypes,
    new_meta: &'static MetaTypes,
    rules: Vec<MetadataRule>,
}

impl EntityRewriterBuilder {
    /// Treat slot `index` of `ancestor` entities as a block state.
    pub fn map_block_state(mut self, ancestor: &'static str, index: u8) -> Self {
        self.rules.push(MetadataRule {
            ancestor,
            index,
            action: MetadataAction::MapBlockState,
        });
        self
    }

    /// Exchange two slots of `ancestor` entities.
    pub fn swap(mut self, ancestor: &'static str, a: u8, b: u8) -> Self {
        self.rules.push(MetadataRule {
            ancestor,
            index: a,
            action: MetadataAction::MoveTo(b),
        });
        self.rules.push(MetadataRule {
            ancestor,
            index: b,
            action: MetadataAction::MoveTo(a),
        });
        self
    }

    pub fn build(self) -> ProtocolResult<EntityRewriter> {
        for rule in &self.rules {
            if self.mapper.new_types().by_name(rule.ancestor).is_none() {
                return Err(ProtocolError::configuration(
                    self.owner.0,
                    format!(
                        "metadata rule names entity type {} unknown to {}",
                        rule.ancestor,
                        self.mapper.new_types().version()
                    ),
                ));
            }
        }
        Ok(EntityRewriter {
            owner: self.owner,
            items: ItemRewriter::new(self.mappings.clone()),
            particles: ParticleRewriter::new(self.mappings.clone()),
            mapper: self.mapper,
            mappings: self.mappings,
            old_meta: self.old_meta,
            new_meta: self.new_meta,
            rules: self.rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::entity::{abstract_entity, entity, EntityTypeDef, EntityTypeTable};
    use crate::metadata::MetaKind;
    use crate::user::ProtocolInfo;
    use crate::value::{NbtFormat, ParticleArg, ParticleLayout};
    use pickaxe_mappings::{BiMappings, Mappings};
    use pickaxe_types::{ItemStack, Particle, ParticleData};

    const OWNER: TranslatorId = TranslatorId("test");

    const OLD: &[EntityTypeDef] = &[
        abstract_entity("entity", None),
        abstract_entity("minecart_abstract", Some("entity")),
        abstract_entity("abstract_piglin", Some("entity")),
        entity("minecart", 1, Some("minecart_abstract")),
        entity("piglin", 2, Some("abstract_piglin")),
        entity("cow", 3, Some("entity")),
    ];

    const NEW: &[EntityTypeDef] = &[
        abstract_entity("entity", None),
        abstract_entity("minecart_abstract", Some("entity")),
        abstract_entity("abstract_piglin", Some("entity")),
        entity("minecart", 1, Some("minecart_abstract")),
        entity("piglin", 2, Some("abstract_piglin")),
        entity("piglin_brute", 3, Some("abstract_piglin")),
        entity("cow", 4, Some("entity")),
    ];

    static PARTICLES: ParticleLayout = ParticleLayout {
        entries: &[(3, &[ParticleArg::BlockState])],
    };

    static META: MetaTypes = MetaTypes {
        name: "test",
        kinds: &[MetaKind::Byte, MetaKind::VarInt, MetaKind::Item, MetaKind::Particle, MetaKind::BlockState],
        particles: &PARTICLES,
        nbt: NbtFormat::Named,
    };

    fn rewriter() -> EntityRewriter {
        let old = EntityTypeTable::new("old", OLD).unwrap();
        let new = EntityTypeTable::new("new", NEW).unwrap();
        let mapper = EntityTypeMapper::map_types("test", &old, new).unwrap();
        let mappings = MappingData {
            block_states: Some(Mappings::from_pairs(&[(0, 0), (5, 6), (40, 41)])),
            items: Some(BiMappings::new(Mappings::from_pairs(&[(0, 0), (7, 8)]))),
            particles: Some(Mappings::from_pairs(&[(3, 4)])),
            ..MappingData::identity()
        };
        EntityRewriter::builder(OWNER, mapper, Arc::new(mappings), &META, &META)
            .map_block_state("minecart_abstract", 10)
            .swap("abstract_piglin", 15, 16)
            .build()
            .unwrap()
    }

    fn user() -> UserConnection {
        let user = UserConnection::new(Arc::new(PipelineConfig::default()), ProtocolInfo::new(751, 736));
        user.put(OWNER, EntityTracker::default());
        user
    }

    #[test]
    fn test_rule_for_unknown_ancestor_fails_build() {
        let old = EntityTypeTable::new("old", OLD).unwrap();
        let new = EntityTypeTable::new("new", NEW).unwrap();
        let mapper = EntityTypeMapper::map_types("test", &old, new).unwrap();
        let result = EntityRewriter::builder(OWNER, mapper, Arc::new(MappingData::identity()), &META, &META)
            .swap("hoglin", 15, 16)
            .build();
        assert!(matches!(result, Err(ProtocolError::Configuration { .. })));
    }

    #[test]
    fn test_block_state_rule_only_touches_its_slot() {
        let rewriter = rewriter();
        let user = user();
        let minecart = rewriter.type_from_id(1);
        let mut list = MetadataList::new(
            &META,
            vec![
                Metadata::new(9, MetaValue::VarInt(5)),
                Metadata::new(10, MetaValue::VarInt(5)),
                Metadata::new(11, MetaValue::Byte(5)),
            ],
        );
        rewriter.handle_metadata_list(1, minecart, &mut list, &user);
        assert_eq!(list.entries[0].value, MetaValue::VarInt(5));
        assert_eq!(list.entries[1].value, MetaValue::VarInt(6));
        assert_eq!(list.entries[2].value, MetaValue::Byte(5));

        // The same slot on an unrelated entity is left alone.
        let cow = rewriter.type_from_id(4);
        let mut entries = vec![Metadata::new(10, MetaValue::VarInt(5))];
        rewriter.handle_metadata(2, cow, 0, &mut entries, &user);
        assert_eq!(entries[0].value, MetaValue::VarInt(5));
    }

    #[test]
    fn test_piglin_item_particle_and_swap() {
        let rewriter = rewriter();
        let user = user();
        rewriter.track(&user, 77, rewriter.new_type_id(2));
        let ty = rewriter
            .tracked_type(&user, 77)
            .and_then(|id| rewriter.type_from_id(id));
        assert_eq!(ty.map(|t| t.name()), Some("piglin"));

        let mut list = MetadataList::new(
            &META,
            vec![
                Metadata::new(7, MetaValue::Item(Some(ItemStack::new(7, 1)))),
                Metadata::new(8, MetaValue::Particle(Particle::new(3).with(ParticleData::BlockState(40)))),
                Metadata::new(15, MetaValue::Byte(1)),
                Metadata::new(16, MetaValue::Byte(0)),
            ],
        );
        rewriter.handle_metadata_list(77, ty, &mut list, &user);

        assert_eq!(list.get(7).unwrap().value, MetaValue::Item(Some(ItemStack::new(8, 1))));
        assert_eq!(
            list.get(8).unwrap().value,
            MetaValue::Particle(Particle::new(4).with(ParticleData::BlockState(41)))
        );
        assert_eq!(list.get(16).unwrap().value, MetaValue::Byte(1));
        assert_eq!(list.get(15).unwrap().value, MetaValue::Byte(0));
    }

    #[test]
    fn test_untyped_entity_only_gets_value_rewrites() {
        let rewriter = rewriter();
        let user = user();
        let mut entries = vec![
            Metadata::new(15, MetaValue::Byte(1)),
            Metadata::new(3, MetaValue::BlockState(5)),
        ];
        rewriter.handle_metadata(99, None, 0, &mut entries, &user);
        rewriter.handle_metadata(99, None, 1, &mut entries, &user);
        assert_eq!(entries[0].index, 15);
        assert_eq!(entries[1].value, MetaValue::BlockState(6));
    }

    #[test]
    fn test_tracker_forgets_removed_entities() {
        let rewriter = rewriter();
        let user = user();
        rewriter.track(&user, 5, 3);
        assert_eq!(rewriter.tracked_type(&user, 5), Some(3));
        rewriter.untrack(&user, 5);
        assert_eq!(rewriter.tracked_type(&user, 5), None);
    }
}
