pub mod settings;
pub mod storage;

pub use settings::*;
pub use storage::*;
