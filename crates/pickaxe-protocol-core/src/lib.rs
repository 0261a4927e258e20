pub mod base;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod packet_type;
pub mod pipeline;
pub mod rewriter;
pub mod state;
pub mod translator;
pub mod user;
pub mod value;

pub use base::{base_translator, BASE};
pub use bridge::{Bridge, BridgePhase, BridgeRules, PhaseBridge, QueuedPacket};
pub use codec::*;
pub use config::PipelineConfig;
pub use entity::*;
pub use envelope::Envelope;
pub use error::{ProtocolError, ProtocolResult};
pub use filter::{PacketFilter, RawFrame};
pub use metadata::*;
pub use packet_type::{PacketSection, PacketTable, PacketType};
pub use pipeline::{Chain, Outcome, PacketContext, Pipeline, Transformed};
pub use rewriter::*;
pub use state::*;
pub use translator::{HandlerKey, PacketKey, Target, Translator, TranslatorBuilder, TranslatorId};
pub use user::{ProtocolInfo, UserConnection};
pub use value::*;
