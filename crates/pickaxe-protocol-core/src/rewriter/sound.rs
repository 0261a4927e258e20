use crate::envelope::Envelope;
use crate::error::ProtocolResult;
use crate::translator::{HandlerKey, Target, TranslatorBuilder};
use crate::value::{FieldKind, FieldValue};
use pickaxe_mappings::MappingData;
use std::sync::Arc;
use tracing::trace;

/// Rewrites sound ids. Sounds the client does not know are dropped.
#[derive(Clone)]
pub struct SoundRewriter {
    mappings: Arc<MappingData>,
}

impl SoundRewriter {
    pub fn new(mappings: Arc<MappingData>) -> Self {
        Self { mappings }
    }

    /// Packets that start with a plain varint sound id.
    pub fn register_sound(&self, builder: &mut TranslatorBuilder, key: HandlerKey) {
        let rewriter = self.clone();
        builder.register(key, Target::Auto, move |envelope, _| rewriter.rewrite_sound_id(envelope));
    }

    /// Packets that start with a sound holder: `0` followed by an inline
    /// sound event, or a registry id offset by one.
    pub fn register_holder_sound(&self, builder: &mut TranslatorBuilder, key: HandlerKey) {
        let rewriter = self.clone();
        builder.register(key, Target::Auto, move |envelope, _| rewriter.rewrite_sound_holder(envelope));
    }

    pub fn rewrite_sound_id(&self, envelope: &mut Envelope) -> ProtocolResult<()> {
        let id = envelope.read_varint()?;
        match self.mappings.new_sound_id(id) {
            Some(mapped) => envelope.write(FieldValue::VarInt(mapped)),
            None => {
                trace!("Dropping sound {} unknown to the client", id);
                envelope.cancel();
            }
        }
        Ok(())
    }

    pub fn rewrite_sound_holder(&self, envelope: &mut Envelope) -> ProtocolResult<()> {
        let holder = envelope.read_varint()?;
        if holder == 0 {
            envelope.write(FieldValue::VarInt(0));
            envelope.passthrough(FieldKind::String)?;
            if envelope.passthrough_bool()? {
                envelope.passthrough(FieldKind::Float)?;
            }
            return Ok(());
        }
        match self.mappings.new_sound_id(holder - 1) {
            Some(mapped) => envelope.write(FieldValue::VarInt(mapped + 1)),
            None => {
                trace!("Dropping sound {} unknown to the client", holder - 1);
                envelope.cancel();
            }
        }
        Ok(())
    }
}
