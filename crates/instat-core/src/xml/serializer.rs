//! INSTAT document serialization with quick-xml.

use std::path::Path;

use quick_xml::se::Serializer;
use serde::Serialize;
use tracing::info;

use crate::error::{InstatError, XmlError};
use crate::models::Instat;
use crate::readers::PartyTag;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Serialize `instat` under an `INSTAT` root and patch the `<Party>` tag
/// with the vendor's attributes.
pub fn to_xml(instat: &Instat, party_tag: &PartyTag) -> Result<String, XmlError> {
    let mut body = String::new();
    let mut serializer =
        Serializer::with_root(&mut body, Some("INSTAT")).map_err(|e| XmlError::Serialize(e.to_string()))?;
    serializer.indent(' ', 2);
    instat
        .serialize(serializer)
        .map_err(|e| XmlError::Serialize(e.to_string()))?;

    let body = body.replacen("<Party>", &party_tag.opening_tag(), 1);
    Ok(format!("{}\n{}\n", XML_DECLARATION, body))
}

/// Write the document to `path`.
pub fn write_xml(path: &Path, instat: &Instat, party_tag: &PartyTag) -> Result<(), InstatError> {
    let xml = to_xml(instat, party_tag)?;
    info!("Writing XML file to {}", path.display());
    std::fs::write(path, xml)?;
    Ok(())
}

impl Instat {
    /// Read a document back, ignoring attributes, and re-check every model
    /// constraint.
    pub fn from_xml(xml: &str) -> Result<Self, InstatError> {
        let instat: Instat = quick_xml::de::from_str(xml).map_err(|e| XmlError::Parse(e.to_string()))?;
        instat.validate()?;
        Ok(instat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instat::tests::sample_instat;
    use crate::xml::{validate_xml, Schema};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_layout() {
        let xml = to_xml(&sample_instat(), &PartyTag::default()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<INSTAT>"));
        assert!(xml.contains(r#"<Party partyType="TDP" partyRole="sender">"#));
        assert!(!xml.contains("<Party>"));
        assert!(xml.contains("<partyName>Jessy &amp; co</partyName>"));
        assert!(xml.contains("<flowCode>D</flowCode>"));
        assert!(xml.contains("<functionCode>O</functionCode>"));
        assert_eq!(xml.matches("<Item>").count(), 2);
        assert!(!xml.contains("softwareUsed"));
    }

    #[test]
    fn test_output_passes_bundled_schema() {
        let xml = to_xml(&sample_instat(), &PartyTag::default()).unwrap();
        let report = validate_xml(&xml, &Schema::instat().unwrap());
        assert!(report.is_valid(), "{:?}", report.violations);
    }

    #[test]
    fn test_party_attributes_are_required_by_schema() {
        let xml = to_xml(&sample_instat(), &PartyTag::default()).unwrap();
        let bare = xml.replace(r#"<Party partyType="TDP" partyRole="sender">"#, "<Party>");
        let report = validate_xml(&bare, &Schema::instat().unwrap());
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations.iter().all(|v| v.path == "/INSTAT/Envelope/Party"));
    }

    #[test]
    fn test_read_back() {
        let instat = sample_instat();
        let xml = to_xml(&instat, &PartyTag::default()).unwrap();
        assert_eq!(Instat::from_xml(&xml).unwrap(), instat);
    }

    #[test]
    fn test_read_back_optional_goods_codes() {
        let xml = to_xml(&sample_instat(), &PartyTag::default()).unwrap();
        let with_codes = xml.replacen(
            "</CN8Code>",
            "</CN8Code><SUCode>p/st</SUCode><additionalGoodsCode>A1</additionalGoodsCode>",
            1,
        );
        let instat = Instat::from_xml(&with_codes).unwrap();
        let cn8 = instat.envelope().declarations()[0].items()[0].cn8();
        assert_eq!(cn8.su_code(), Some("p/st"));
        assert_eq!(cn8.additional_goods_code(), Some("A1"));
        assert!(to_xml(&instat, &PartyTag::default()).unwrap().contains("<SUCode>p/st</SUCode>"));
    }

    #[test]
    fn test_read_back_rechecks_constraints() {
        let xml = to_xml(&sample_instat(), &PartyTag::default()).unwrap();
        let broken = xml.replacen("<declarationId>000123</declarationId>", "<declarationId>FA1</declarationId>", 1);
        assert!(matches!(Instat::from_xml(&broken), Err(InstatError::Model(_))));
    }
}
