//! INSTAT XML output and schema validation.

mod schema;
mod serializer;
mod tree;

pub use schema::{validate_xml, Schema, ValidationReport, Violation};
pub use serializer::{to_xml, write_xml, XML_DECLARATION};
