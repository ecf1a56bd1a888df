mod convert;
mod settings;
mod system;

pub use convert::*;
pub use settings::*;
pub use system::*;
