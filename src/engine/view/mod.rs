pub mod part;

pub use part::{ResolvedView, ViewPart, ViewScope};
