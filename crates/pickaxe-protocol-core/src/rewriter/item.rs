use crate::translator::{HandlerKey, Target, TranslatorBuilder};
use crate::value::{FieldKind, FieldValue, NbtFormat};
use pickaxe_mappings::MappingData;
use pickaxe_types::ItemStack;
use std::sync::Arc;

/// Rewrites item ids: old to new on the way to the client, back again on
/// the way to the server.
#[derive(Clone)]
pub struct ItemRewriter {
    mappings: Arc<MappingData>,
}

impl ItemRewriter {
    pub fn new(mappings: Arc<MappingData>) -> Self {
        Self { mappings }
    }

    pub fn handle_item_to_client(&self, item: &mut Option<ItemStack>) {
        if let Some(item) = item {
            item.item_id = self.mappings.new_item_id(item.item_id);
        }
    }

    pub fn handle_item_to_server(&self, item: &mut Option<ItemStack>) {
        if let Some(item) = item {
            item.item_id = self.mappings.old_item_id(item.item_id);
        }
    }

    /// A clientbound packet of fixed leading fields followed by one item.
    pub fn register_set_slot(&self, builder: &mut TranslatorBuilder, key: HandlerKey, prefix: &'static [FieldKind], format: NbtFormat) {
        let rewriter = self.clone();
        builder.register(key, Target::Auto, move |envelope, _| {
            for kind in prefix {
                envelope.passthrough(*kind)?;
            }
            let mut stack = envelope.read_item(FieldKind::Item(format))?;
            rewriter.handle_item_to_client(&mut stack);
            envelope.write(FieldValue::Item(format, stack));
            Ok(())
        });
    }

    /// Window id, a short count and that many items.
    pub fn register_window_items(&self, builder: &mut TranslatorBuilder, key: HandlerKey, format: NbtFormat) {
        let rewriter = self.clone();
        builder.register(key, Target::Auto, move |envelope, _| {
            envelope.passthrough_unsigned_byte()?;
            let count = envelope.passthrough_short()?;
            for _ in 0..count.max(0) {
                let mut stack = envelope.read_item(FieldKind::Item(format))?;
                rewriter.handle_item_to_client(&mut stack);
                envelope.write(FieldValue::Item(format, stack));
            }
            Ok(())
        });
    }

    /// Serverbound: a short slot number followed by the item the client put there.
    pub fn register_creative_action(&self, builder: &mut TranslatorBuilder, key: HandlerKey, format: NbtFormat) {
        let rewriter = self.clone();
        builder.register(key, Target::Auto, move |envelope, _| {
            envelope.passthrough_short()?;
            let mut stack = envelope.read_item(FieldKind::Item(format))?;
            rewriter.handle_item_to_server(&mut stack);
            envelope.write(FieldValue::Item(format, stack));
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickaxe_mappings::{BiMappings, Mappings};

    #[test]
    fn test_items_map_both_ways() {
        let mappings = MappingData {
            items: Some(BiMappings::new(Mappings::from_pairs(&[(0, 0), (1, 1), (5, 6)]))),
            ..MappingData::identity()
        };
        let rewriter = ItemRewriter::new(Arc::new(mappings));
        let mut item = Some(ItemStack::new(5, 2));
        rewriter.handle_item_to_client(&mut item);
        assert_eq!(item.as_ref().unwrap().item_id, 6);
        rewriter.handle_item_to_server(&mut item);
        assert_eq!(item.as_ref().unwrap().item_id, 5);

        let mut empty = None;
        rewriter.handle_item_to_client(&mut empty);
        assert!(empty.is_none());
    }
}
