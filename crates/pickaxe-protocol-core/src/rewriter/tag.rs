use crate::envelope::Envelope;
use crate::error::ProtocolResult;
use crate::pipeline::PacketContext;
use crate::translator::{HandlerKey, Target, TranslatorBuilder};
use crate::value::FieldValue;
use pickaxe_types::Identifier;
use tracing::trace;

/// Rewrites the id lists of a tag packet: a list of registries, each a list
/// of named tags holding numeric ids. Ids the client does not know are
/// removed from their tag.
#[derive(Clone, Copy, Default)]
pub struct TagRewriter;

impl TagRewriter {
    pub fn new() -> Self {
        Self
    }

    pub fn register_generic(&self, builder: &mut TranslatorBuilder, key: HandlerKey) {
        let rewriter = *self;
        builder.register(key, Target::Auto, move |envelope, ctx| rewriter.rewrite_tags(envelope, ctx));
    }

    /// Before 1.17 the packet had no registry names: a fixed sequence of
    /// tag lists, one per entry of `registries`.
    pub fn register_fixed(&self, builder: &mut TranslatorBuilder, key: HandlerKey, registries: &'static [&'static str]) {
        builder.register(key, Target::Auto, move |envelope, ctx| {
            for registry in registries {
                rewrite_tag_list(envelope, registry, ctx)?;
            }
            Ok(())
        });
    }

    pub fn rewrite_tags(&self, envelope: &mut Envelope, ctx: &PacketContext<'_>) -> ProtocolResult<()> {
        let registries = envelope.passthrough_varint()?;
        for _ in 0..registries.max(0) {
            let registry = envelope.passthrough_string()?;
            rewrite_tag_list(envelope, &registry, ctx)?;
        }
        Ok(())
    }
}

fn rewrite_tag_list(envelope: &mut Envelope, registry: &str, ctx: &PacketContext<'_>) -> ProtocolResult<()> {
    let tags = envelope.passthrough_varint()?;
    for _ in 0..tags.max(0) {
        let name = envelope.passthrough_string()?;
        let ids = envelope.read_varint_array()?;
        let before = ids.len();
        let mapped: Vec<i32> = ids
            .into_iter()
            .filter_map(|id| map_registry_id(registry, id, ctx))
            .collect();
        if mapped.len() != before {
            trace!("Dropped {} unknown ids from tag {} in {}", before - mapped.len(), name, registry);
        }
        envelope.write(FieldValue::VarIntArray(mapped));
    }
    Ok(())
}

/// Map one id of a registry that has a per-version table. Registries
/// without one keep their ids.
pub(crate) fn map_registry_id(registry: &str, id: i32, ctx: &PacketContext<'_>) -> Option<i32> {
    let registry = match registry.parse::<Identifier>() {
        Ok(registry) if registry.namespace == "minecraft" => registry,
        _ => return Some(id),
    };
    let translator = ctx.translator();
    let mappings = translator.mappings();
    match registry.path.as_str() {
        "block" => mappings.new_block_id(id),
        "item" => match &mappings.items {
            Some(items) => items.new_id(id),
            None => Some(id),
        },
        "entity_type" => Some(
            translator
                .entity_rewriter()
                .map_or(id, |rewriter| rewriter.new_type_id(id)),
        ),
        _ => Some(id),
    }
}
