mod dashboard;
mod settings;

pub use dashboard::*;
pub use settings::*;
