pub mod definition_factory;
pub mod instance_factory;

pub use definition_factory::DefinitionFactory;
pub use descriptor_factory::DescriptorFactory;
pub use instance_factory::InstanceFactory;
