//! Data models: configuration, extracted page records and the INSTAT
//! declaration tree.

pub mod config;
pub mod instat;
pub mod record;

pub use config::{
    ExtractionConfig, InstatConfig, OutputConfig, ProfilesConfig, ReferenceConfig, ResolverConfig,
    SchemaConfig,
};
pub use instat::{
    Cn8, DateTime, Declaration, DeclarationFields, Envelope, FlowCode, Function, Instat, Item,
    ItemFields, NatureOfTransaction, Party,
};
pub use record::{InvoiceMetadata, RawPageRecord};
