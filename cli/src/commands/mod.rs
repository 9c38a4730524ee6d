pub mod init_schema;
pub mod regenerate;

pub use init_schema::init_schema;
pub use regenerate::{regenerate, RegenerateOutcome};
