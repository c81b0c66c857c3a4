//! XML Schema validation for the INSTAT document.
//!
//! Only the part of XSD the INSTAT schema needs is understood: global
//! elements, named or anonymous complex types made of one `sequence` plus
//! attributes, and simple types restricting a built-in or named simple type
//! with `pattern`, `length`, `minLength`, `maxLength`, `enumeration`,
//! `minInclusive` and `maxInclusive` facets. Any other construct is refused
//! when the schema is loaded, so a document is never reported valid against
//! rules that were silently skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::tree::{parse_tree, Node};
use crate::error::{InstatError, XmlError};

const INSTAT_XSD: &str = include_str!("schema/instat.xsd");

const BUILTIN_TYPES: [&str; 20] = [
    "anyType",
    "anySimpleType",
    "string",
    "normalizedString",
    "token",
    "integer",
    "int",
    "long",
    "short",
    "nonNegativeInteger",
    "positiveInteger",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
    "unsignedByte",
    "decimal",
    "boolean",
    "date",
    "time",
    "gYearMonth",
];

fn schema_error(message: impl Into<String>) -> XmlError {
    XmlError::Schema(message.into())
}

/// Local part of a qualified name.
fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn required_attr<'n>(node: &'n Node, key: &str) -> Result<&'n str, XmlError> {
    node.attribute(key)
        .ok_or_else(|| schema_error(format!("<{}> without {} attribute", node.name, key)))
}

fn is_namespace_attr(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:") || key.starts_with("xsi:")
}

#[derive(Debug, Clone)]
enum TypeRef {
    Named(String),
    Complex(Box<ComplexType>),
    Simple(Box<SimpleType>),
    /// `ref` to a global element.
    Element(String),
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    kind: TypeRef,
    min_occurs: u32,
    /// `None` is unbounded.
    max_occurs: Option<u32>,
}

#[derive(Debug, Clone, Default)]
struct ComplexType {
    sequence: Vec<ElementDecl>,
    attributes: Vec<AttributeDecl>,
}

#[derive(Debug, Clone)]
struct AttributeDecl {
    name: String,
    required: bool,
    kind: Option<TypeRef>,
}

#[derive(Debug, Clone)]
struct SimpleType {
    base: String,
    facets: Vec<Facet>,
}

#[derive(Debug, Clone)]
enum Facet {
    Pattern { source: String, regex: Regex },
    Length(usize),
    MinLength(usize),
    MaxLength(usize),
    Enumeration(Vec<String>),
    MinInclusive(Decimal),
    MaxInclusive(Decimal),
}

impl Facet {
    /// A message when `value` violates this facet.
    fn check(&self, value: &str) -> Option<String> {
        let len = value.chars().count();
        match self {
            Self::Pattern { source, regex } if !regex.is_match(value) => {
                Some(format!("{:?} does not match pattern {}", value, source))
            }
            Self::Length(n) if len != *n => Some(format!("{:?} has length {}, expected {}", value, len, n)),
            Self::MinLength(n) if len < *n => Some(format!("{:?} is shorter than {}", value, n)),
            Self::MaxLength(n) if len > *n => Some(format!("{:?} is longer than {}", value, n)),
            Self::Enumeration(values) if !values.iter().any(|v| v == value) => {
                Some(format!("{:?} is not one of {:?}", value, values))
            }
            Self::MinInclusive(min) => match value.trim().parse::<Decimal>() {
                Ok(number) if number < *min => Some(format!("{} is below {}", value, min)),
                _ => None,
            },
            Self::MaxInclusive(max) => match value.trim().parse::<Decimal>() {
                Ok(number) if number > *max => Some(format!("{} is above {}", value, max)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn check_builtin(name: &str, value: &str) -> Result<(), String> {
    let v = value.trim();
    let ok = match name {
        "anyType" | "anySimpleType" | "string" | "normalizedString" | "token" => true,
        "integer" | "int" | "long" | "short" => v.parse::<i64>().is_ok(),
        "nonNegativeInteger" | "unsignedInt" | "unsignedLong" | "unsignedShort" | "unsignedByte" => {
            v.parse::<u64>().is_ok()
        }
        "positiveInteger" => v.parse::<u64>().is_ok_and(|n| n > 0),
        "decimal" => v.parse::<Decimal>().is_ok(),
        "boolean" => matches!(v, "true" | "false" | "1" | "0"),
        "date" => NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok(),
        "time" => NaiveTime::parse_from_str(v, "%H:%M:%S").is_ok(),
        "gYearMonth" => NaiveDate::parse_from_str(&format!("{}-01", v), "%Y-%m-%d").is_ok(),
        _ => return Err(format!("unsupported built-in type {}", name)),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{:?} is not a valid {}", value, name))
    }
}

fn parse_occurs(node: &Node, key: &str, default: u32) -> Result<Option<u32>, XmlError> {
    match node.attribute(key) {
        None => Ok(Some(default)),
        Some("unbounded") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| schema_error(format!("invalid {} {:?}", key, raw))),
    }
}

fn parse_element(node: &Node) -> Result<ElementDecl, XmlError> {
    let min_occurs = parse_occurs(node, "minOccurs", 1)?.unwrap_or(0);
    let max_occurs = parse_occurs(node, "maxOccurs", 1)?;

    if let Some(reference) = node.attribute("ref") {
        let name = local(reference).to_string();
        return Ok(ElementDecl {
            kind: TypeRef::Element(name.clone()),
            name,
            min_occurs,
            max_occurs,
        });
    }

    let name = required_attr(node, "name")?.to_string();
    let kind = match (node.attribute("type"), node.children.iter().find(|c| c.name != "annotation")) {
        (Some(kind), _) => TypeRef::Named(local(kind).to_string()),
        (None, Some(child)) if child.name == "complexType" => TypeRef::Complex(Box::new(parse_complex(child)?)),
        (None, Some(child)) if child.name == "simpleType" => TypeRef::Simple(Box::new(parse_simple(child)?)),
        (None, Some(child)) => return Err(schema_error(format!("unsupported <{}> in element {}", child.name, name))),
        (None, None) => TypeRef::Named("anyType".to_string()),
    };
    Ok(ElementDecl {
        name,
        kind,
        min_occurs,
        max_occurs,
    })
}

fn parse_complex(node: &Node) -> Result<ComplexType, XmlError> {
    let mut complex = ComplexType::default();
    for child in &node.children {
        match child.name.as_str() {
            "sequence" => {
                for particle in &child.children {
                    match particle.name.as_str() {
                        "element" => complex.sequence.push(parse_element(particle)?),
                        "annotation" => {}
                        other => return Err(schema_error(format!("unsupported <{}> in sequence", other))),
                    }
                }
            }
            "attribute" => complex.attributes.push(AttributeDecl {
                name: required_attr(child, "name")?.to_string(),
                required: child.attribute("use") == Some("required"),
                kind: match (child.attribute("type"), child.children.iter().find(|c| c.name == "simpleType")) {
                    (Some(kind), _) => Some(TypeRef::Named(local(kind).to_string())),
                    (None, Some(simple)) => Some(TypeRef::Simple(Box::new(parse_simple(simple)?))),
                    (None, None) => None,
                },
            }),
            "annotation" => {}
            other => return Err(schema_error(format!("unsupported <{}> in complex type", other))),
        }
    }
    Ok(complex)
}

fn parse_simple(node: &Node) -> Result<SimpleType, XmlError> {
    let restriction = node
        .children
        .iter()
        .find(|c| c.name != "annotation")
        .ok_or_else(|| schema_error("empty simple type"))?;
    if restriction.name != "restriction" {
        return Err(schema_error(format!("unsupported <{}> in simple type", restriction.name)));
    }

    let base = local(required_attr(restriction, "base")?).to_string();
    let mut facets = Vec::new();
    let mut enumeration = Vec::new();
    for facet in &restriction.children {
        if facet.name == "annotation" {
            continue;
        }
        let value = required_attr(facet, "value")?;
        let size = || {
            value
                .parse::<usize>()
                .map_err(|_| schema_error(format!("invalid {} {:?}", facet.name, value)))
        };
        let bound = || {
            value
                .parse::<Decimal>()
                .map_err(|_| schema_error(format!("invalid {} {:?}", facet.name, value)))
        };
        match facet.name.as_str() {
            "pattern" => facets.push(Facet::Pattern {
                source: value.to_string(),
                regex: Regex::new(&format!("^(?:{})$", value))
                    .map_err(|e| schema_error(format!("invalid pattern {:?}: {}", value, e)))?,
            }),
            "length" => facets.push(Facet::Length(size()?)),
            "minLength" => facets.push(Facet::MinLength(size()?)),
            "maxLength" => facets.push(Facet::MaxLength(size()?)),
            "enumeration" => enumeration.push(value.to_string()),
            "minInclusive" => facets.push(Facet::MinInclusive(bound()?)),
            "maxInclusive" => facets.push(Facet::MaxInclusive(bound()?)),
            "whiteSpace" => {}
            other => return Err(schema_error(format!("unsupported facet <{}>", other))),
        }
    }
    if !enumeration.is_empty() {
        facets.push(Facet::Enumeration(enumeration));
    }
    Ok(SimpleType { base, facets })
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Element path, e.g. `/INSTAT/Envelope/Declaration[1]/declarationId`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// A loaded XML schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    elements: BTreeMap<String, ElementDecl>,
    complex_types: BTreeMap<String, ComplexType>,
    simple_types: BTreeMap<String, SimpleType>,
}

impl Schema {
    /// The bundled INSTAT schema.
    pub fn instat() -> Result<Self, XmlError> {
        Self::from_xsd(INSTAT_XSD)
    }

    pub fn from_file(path: &Path) -> Result<Self, InstatError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_xsd(&text)?)
    }

    pub fn from_xsd(text: &str) -> Result<Self, XmlError> {
        let root = parse_tree(text)?;
        if root.name != "schema" {
            return Err(schema_error(format!("root element is <{}>, expected <schema>", root.name)));
        }

        let mut schema = Self::default();
        for child in &root.children {
            match child.name.as_str() {
                "element" => {
                    let decl = parse_element(child)?;
                    schema.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    let name = required_attr(child, "name")?.to_string();
                    schema.complex_types.insert(name, parse_complex(child)?);
                }
                "simpleType" => {
                    let name = required_attr(child, "name")?.to_string();
                    schema.simple_types.insert(name, parse_simple(child)?);
                }
                "annotation" => {}
                other => return Err(schema_error(format!("unsupported top-level <{}>", other))),
            }
        }

        schema.check_references()?;
        debug!(
            "Loaded schema with {} elements, {} complex and {} simple types",
            schema.elements.len(),
            schema.complex_types.len(),
            schema.simple_types.len()
        );
        Ok(schema)
    }

    fn check_references(&self) -> Result<(), XmlError> {
        for decl in self.elements.values() {
            self.check_element_refs(decl)?;
        }
        for complex in self.complex_types.values() {
            self.check_complex_refs(complex)?;
        }
        for simple in self.simple_types.values() {
            self.check_simple_refs(simple)?;
        }
        Ok(())
    }

    fn check_element_refs(&self, decl: &ElementDecl) -> Result<(), XmlError> {
        match &decl.kind {
            TypeRef::Named(name) => self.check_type_name(name),
            TypeRef::Complex(complex) => self.check_complex_refs(complex),
            TypeRef::Simple(simple) => self.check_simple_refs(simple),
            TypeRef::Element(name) if self.elements.contains_key(name) => Ok(()),
            TypeRef::Element(name) => Err(schema_error(format!("undefined element {}", name))),
        }
    }

    fn check_complex_refs(&self, complex: &ComplexType) -> Result<(), XmlError> {
        for decl in &complex.sequence {
            self.check_element_refs(decl)?;
        }
        for attr in &complex.attributes {
            match &attr.kind {
                Some(TypeRef::Named(name)) if self.complex_types.contains_key(name) => {
                    return Err(schema_error(format!("attribute {} has complex type {}", attr.name, name)));
                }
                Some(TypeRef::Named(name)) => self.check_type_name(name)?,
                Some(TypeRef::Simple(simple)) => self.check_simple_refs(simple)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn check_simple_refs(&self, simple: &SimpleType) -> Result<(), XmlError> {
        if self.simple_types.contains_key(&simple.base) || BUILTIN_TYPES.contains(&simple.base.as_str()) {
            Ok(())
        } else {
            Err(schema_error(format!("undefined base type {}", simple.base)))
        }
    }

    fn check_type_name(&self, name: &str) -> Result<(), XmlError> {
        if self.complex_types.contains_key(name)
            || self.simple_types.contains_key(name)
            || BUILTIN_TYPES.contains(&name)
        {
            Ok(())
        } else {
            Err(schema_error(format!("undefined type {}", name)))
        }
    }

    fn check_element(&self, node: &Node, kind: &TypeRef, path: &str, report: &mut ValidationReport) {
        match kind {
            TypeRef::Element(name) => match self.elements.get(name) {
                Some(decl) => self.check_element(node, &decl.kind, path, report),
                None => report.push(path, format!("undefined element {}", name)),
            },
            TypeRef::Complex(complex) => self.check_complex(node, complex, path, report),
            TypeRef::Simple(simple) => {
                self.check_leaf(node, path, report);
                self.check_value(&node.text, simple, path, report);
            }
            TypeRef::Named(name) => {
                if let Some(complex) = self.complex_types.get(name) {
                    self.check_complex(node, complex, path, report);
                } else if let Some(simple) = self.simple_types.get(name) {
                    self.check_leaf(node, path, report);
                    self.check_value(&node.text, simple, path, report);
                } else if name != "anyType" {
                    self.check_leaf(node, path, report);
                    if let Err(message) = check_builtin(name, &node.text) {
                        report.push(path, message);
                    }
                }
            }
        }
    }

    /// Simple content: no child elements and no attributes.
    fn check_leaf(&self, node: &Node, path: &str, report: &mut ValidationReport) {
        for child in &node.children {
            report.push(path, format!("unexpected element <{}> in simple content", child.name));
        }
        for (key, _) in node.attributes.iter().filter(|(k, _)| !is_namespace_attr(k)) {
            report.push(path, format!("unexpected attribute {}", key));
        }
    }

    fn check_value(&self, value: &str, simple: &SimpleType, path: &str, report: &mut ValidationReport) {
        match self.simple_types.get(&simple.base) {
            Some(base) => self.check_value(value, base, path, report),
            None => {
                if let Err(message) = check_builtin(&simple.base, value) {
                    report.push(path, message);
                }
            }
        }
        for facet in &simple.facets {
            if let Some(message) = facet.check(value) {
                report.push(path, message);
            }
        }
    }

    fn check_complex(&self, node: &Node, complex: &ComplexType, path: &str, report: &mut ValidationReport) {
        for attr in &complex.attributes {
            match (node.attribute(&attr.name), &attr.kind) {
                (Some(value), Some(kind)) => {
                    let attr_path = format!("{}/@{}", path, attr.name);
                    self.check_attribute(value, kind, &attr_path, report);
                }
                (None, _) if attr.required => {
                    report.push(path, format!("missing required attribute {}", attr.name));
                }
                _ => {}
            }
        }
        for (key, _) in &node.attributes {
            if !is_namespace_attr(key) && !complex.attributes.iter().any(|a| &a.name == key) {
                report.push(path, format!("unexpected attribute {}", key));
            }
        }
        if !node.text.trim().is_empty() {
            report.push(path, format!("unexpected text {:?}", node.text.trim()));
        }

        let children = &node.children;
        let mut next = 0;
        for particle in &complex.sequence {
            let mut count = 0;
            while next < children.len()
                && children[next].name == particle.name
                && particle.max_occurs.is_none_or(|max| count < max)
            {
                let child_path = if particle.max_occurs == Some(1) {
                    format!("{}/{}", path, particle.name)
                } else {
                    format!("{}/{}[{}]", path, particle.name, count + 1)
                };
                self.check_element(&children[next], &particle.kind, &child_path, report);
                count += 1;
                next += 1;
            }
            if count < particle.min_occurs {
                report.push(
                    path,
                    format!("expected at least {} <{}>, found {}", particle.min_occurs, particle.name, count),
                );
            }
        }
        for extra in &children[next..] {
            report.push(path, format!("unexpected element <{}>", extra.name));
        }
    }

    fn check_attribute(&self, value: &str, kind: &TypeRef, path: &str, report: &mut ValidationReport) {
        match kind {
            TypeRef::Simple(simple) => self.check_value(value, simple, path, report),
            TypeRef::Named(name) => match self.simple_types.get(name) {
                Some(simple) => self.check_value(value, simple, path, report),
                None => {
                    if let Err(message) = check_builtin(name, value) {
                        report.push(path, message);
                    }
                }
            },
            _ => report.push(path, "attribute without a simple type"),
        }
    }
}

/// Check `doc` against `schema`, collecting every violation.
///
/// A document that is not well-formed yields a single violation at `/`.
pub fn validate_xml(doc: &str, schema: &Schema) -> ValidationReport {
    let mut report = ValidationReport::default();
    let root = match parse_tree(doc) {
        Ok(root) => root,
        Err(e) => {
            report.push("/", e.to_string());
            return report;
        }
    };

    let path = format!("/{}", root.name);
    match schema.elements.get(&root.name) {
        Some(decl) => schema.check_element(&root, &decl.kind, &path, &mut report),
        None => report.push(&path, "no global declaration for the root element"),
    }
    debug!("Schema validation found {} violations", report.violations.len());
    report
}
