use crate::envelope::Envelope;
use crate::error::ProtocolResult;
use crate::pipeline::PacketContext;
use crate::rewriter::tag::map_registry_id;
use crate::translator::{HandlerKey, Target, TranslatorBuilder};
use crate::value::FieldValue;

/// Statistic categories as sent since 1.13.
const CATEGORY_MINED: i32 = 0;
const CATEGORY_KILLED: i32 = 6;
const CATEGORY_KILLED_BY: i32 = 7;
const CATEGORY_CUSTOM: i32 = 8;

/// Rewrites the award statistics packet. Entries whose subject no longer
/// exists for the client are dropped.
#[derive(Clone, Copy, Default)]
pub struct StatisticsRewriter;

impl StatisticsRewriter {
    pub fn new() -> Self {
        Self
    }

    pub fn register(&self, builder: &mut TranslatorBuilder, key: HandlerKey) {
        let rewriter = *self;
        builder.register(key, Target::Auto, move |envelope, ctx| rewriter.rewrite_statistics(envelope, ctx));
    }

    pub fn rewrite_statistics(&self, envelope: &mut Envelope, ctx: &PacketContext<'_>) -> ProtocolResult<()> {
        let count = envelope.read_varint()?;
        let mut kept = Vec::with_capacity(count.clamp(0, 1024) as usize);
        for _ in 0..count.max(0) {
            let category = envelope.read_varint()?;
            let statistic = envelope.read_varint()?;
            let value = envelope.read_varint()?;
            if let Some(statistic) = map_statistic(category, statistic, ctx) {
                kept.push((category, statistic, value));
            }
        }

        envelope.write(FieldValue::VarInt(kept.len() as i32));
        for (category, statistic, value) in kept {
            envelope.write(FieldValue::VarInt(category));
            envelope.write(FieldValue::VarInt(statistic));
            envelope.write(FieldValue::VarInt(value));
        }
        Ok(())
    }
}

fn map_statistic(category: i32, statistic: i32, ctx: &PacketContext<'_>) -> Option<i32> {
    match category {
        CATEGORY_MINED => map_registry_id("block", statistic, ctx),
        CATEGORY_KILLED | CATEGORY_KILLED_BY => map_registry_id("entity_type", statistic, ctx),
        CATEGORY_CUSTOM => ctx.translator().mappings().new_statistic_id(statistic),
        // crafted, used, broken, picked up, dropped
        1..=5 => map_registry_id("item", statistic, ctx),
        _ => Some(statistic),
    }
}
