//! Reusable rewriters a translator composes its handlers from.

mod entity;
mod item;
mod particle;
mod sound;
mod statistics;
mod tag;

pub use entity::*;
pub use item::*;
pub use particle::*;
pub use sound::*;
pub use statistics::*;
pub use tag::*;
