pub mod ids;
pub mod kind;
pub mod lut_row;

pub use ids::{AccountId, Entity, EntityId, EntityRef};
pub use kind::{EntityKind, LutColumn};
pub use lut_row::LutRow;
