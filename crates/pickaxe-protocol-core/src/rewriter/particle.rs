use crate::rewriter::ItemRewriter;
use crate::translator::{HandlerKey, Target, TranslatorBuilder};
use crate::value::{FieldKind, FieldValue, NbtFormat, ParticleArg, ParticleLayout};
use pickaxe_mappings::MappingData;
use pickaxe_types::{Particle, ParticleData};
use std::sync::Arc;

/// Rewrites particle ids and the block states and items they carry.
#[derive(Clone)]
pub struct ParticleRewriter {
    mappings: Arc<MappingData>,
    items: ItemRewriter,
}

impl ParticleRewriter {
    pub fn new(mappings: Arc<MappingData>) -> Self {
        Self {
            items: ItemRewriter::new(mappings.clone()),
            mappings,
        }
    }

    pub fn rewrite_particle(&self, particle: &mut Particle) {
        particle.id = self.mappings.new_particle_id(particle.id);
        for data in &mut particle.data {
            match data {
                ParticleData::BlockState(state) => *state = self.mappings.new_block_state_id(*state),
                ParticleData::Item(item) => self.items.handle_item_to_client(item),
                ParticleData::Float(_) | ParticleData::VarInt(_) => {}
            }
        }
    }

    /// The standalone particle packet of 1.13 through 1.20.2: an int id,
    /// position and spread, then the id-specific arguments from `layout`.
    pub fn register_spawn_particle(
        &self,
        builder: &mut TranslatorBuilder,
        key: HandlerKey,
        layout: &'static ParticleLayout,
        format: NbtFormat,
    ) {
        let rewriter = self.clone();
        builder.register(key, Target::Auto, move |envelope, _| {
            let id = envelope.read_int()?;
            let mut particle = Particle::new(id);
            let mut leading = Vec::with_capacity(9);
            leading.push(envelope.read(FieldKind::Bool)?);
            for _ in 0..3 {
                leading.push(envelope.read(FieldKind::Double)?);
            }
            for _ in 0..4 {
                leading.push(envelope.read(FieldKind::Float)?);
            }
            leading.push(envelope.read(FieldKind::Int)?);

            for arg in layout.args(id) {
                let data = match arg {
                    ParticleArg::BlockState => ParticleData::BlockState(envelope.read_varint()?),
                    ParticleArg::Item => ParticleData::Item(envelope.read_item(FieldKind::Item(format))?),
                    ParticleArg::Float => ParticleData::Float(envelope.read_float()?),
                    ParticleArg::VarInt => ParticleData::VarInt(envelope.read_varint()?),
                };
                particle.data.push(data);
            }
            rewriter.rewrite_particle(&mut particle);

            envelope.write(FieldValue::Int(particle.id));
            for value in leading {
                envelope.write(value);
            }
            for data in particle.data {
                envelope.write(match data {
                    ParticleData::BlockState(state) => FieldValue::VarInt(state),
                    ParticleData::Item(item) => FieldValue::Item(format, item),
                    ParticleData::Float(v) => FieldValue::Float(v),
                    ParticleData::VarInt(v) => FieldValue::VarInt(v),
                });
            }
            Ok(())
        });
    }
}
