//! Language registry: language identifiers mapped to local toolchains

mod registry;

pub use registry::{LanguageRegistry, TemplateContext, ToolchainDescriptor};
