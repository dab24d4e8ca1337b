pub mod spawn_codec;
pub mod weights;
pub mod xml;
