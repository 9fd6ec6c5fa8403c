pub mod descriptor;
pub mod filters;

pub use descriptor::ReportDescriptor;
