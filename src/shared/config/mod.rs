pub mod global;
pub mod model;

pub use global::CONFIG;
pub use model::{LoggingConfig, ReportConfig, Settings, TimeConfig, load_settings};
