//! Invoice header extraction.

use tracing::{debug, warn};

use super::countries::{is_country_line, vat_country};
use super::patterns::ProfilePatterns;
use super::profile::{ExceptionTables, MetadataLayout, VatLocator};
use super::Result;
use crate::error::ExtractionError;
use crate::models::InvoiceMetadata;
use crate::pdf::{Page, PageExtractor, RelativeBox, TableGrid};
use crate::readers::numbers::parse_date;

/// What a page says about the invoice it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum PageHeader {
    /// The page carries the invoice header.
    Invoice(InvoiceMetadata),
    /// The page continues the named invoice and has no header of its own.
    Continuation(String),
}

/// Reads invoice headers for one vendor layout.
pub struct MetadataParser<'a> {
    layout: &'a MetadataLayout,
    exceptions: &'a ExceptionTables,
    patterns: &'a ProfilePatterns,
    extractor: &'a PageExtractor,
}

impl<'a> MetadataParser<'a> {
    pub fn new(
        layout: &'a MetadataLayout,
        exceptions: &'a ExceptionTables,
        patterns: &'a ProfilePatterns,
        extractor: &'a PageExtractor,
    ) -> Self {
        Self {
            layout,
            exceptions,
            patterns,
            extractor,
        }
    }

    /// Read the header of `page`; `tables` are the page's cleaned tables.
    pub fn parse(&self, page: &Page, tables: &[TableGrid]) -> Result<PageHeader> {
        let header = match self.layout {
            MetadataLayout::HeaderTable {
                labels,
                number_label,
                date_label,
                vat_label,
                client_label,
                continuation_marker,
            } => {
                if let Some(claimed) = self.continuation_of(page, continuation_marker) {
                    debug!("Page {} continues invoice {}", page.number(), claimed);
                    return Ok(PageHeader::Continuation(claimed));
                }
                let table = tables
                    .iter()
                    .find(|t| header_matches(t, labels))
                    .ok_or_else(|| ExtractionError::MissingField("header table".to_string()))?;
                let value = |label: &str| {
                    labels
                        .iter()
                        .position(|l| l == label)
                        .and_then(|i| table[1].get(i).cloned().flatten())
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                };

                let number = value(number_label).ok_or_else(|| ExtractionError::MissingField(number_label.clone()))?;
                let date = parse_required_date(date_label, value(date_label))?;
                let mut metadata = InvoiceMetadata::new(number, date);
                match value(vat_label) {
                    Some(vat) => metadata = metadata.with_vat_id(vat),
                    None => warn!("Missing {} on page {}", vat_label, page.number()),
                }
                if let Some(client) = client_label.as_deref().and_then(value) {
                    metadata = metadata.with_client_code(client);
                }
                metadata
            }
            MetadataLayout::TitleLine {
                regions,
                address,
                vat_label,
                ..
            } => {
                let (number, date) = self.title_line(page, regions)?;
                let mut metadata = InvoiceMetadata::new(number, date);
                for line in self.extractor.extract_lines(page, *address) {
                    if is_country_line(&line) {
                        if let Some(word) = line.split_whitespace().next() {
                            metadata.country = Some(word.to_string());
                        }
                    }
                    if line.starts_with(vat_label.as_str()) {
                        metadata.vat_id = Some(after_last_colon(&line));
                    }
                }
                metadata
            }
            MetadataLayout::HeaderStrip {
                region,
                address,
                vat,
                country_from_vat,
            } => {
                let lines = self.extractor.extract_lines(page, *region);
                let last = lines
                    .last()
                    .ok_or_else(|| ExtractionError::MissingField("header strip".to_string()))?;
                let tokens: Vec<&str> = last.split_whitespace().collect();
                let [number, date, client] = tokens[..] else {
                    return Err(ExtractionError::Parse {
                        field: "header strip".to_string(),
                        value: last.clone(),
                    });
                };
                let date = parse_required_date("Date", Some(date.to_string()))?;
                let mut metadata = InvoiceMetadata::new(number, date).with_client_code(client);

                for line in self.extractor.extract_lines(page, *address) {
                    if !country_from_vat && is_country_line(&line) {
                        metadata.country = Some(line.trim().to_string());
                    }
                    if let Some(found) = self.vat_in_line(vat, &line) {
                        metadata.vat_id = Some(found);
                    }
                }
                if *country_from_vat {
                    metadata.country = metadata
                        .vat_id
                        .as_deref()
                        .and_then(|v| vat_country(v, &self.exceptions.vat_prefix_overrides));
                }
                metadata
            }
        };

        debug!("Got metadata on page {}: {:?}", page.number(), header);
        Ok(PageHeader::Invoice(header))
    }

    fn continuation_of(&self, page: &Page, marker: &str) -> Option<String> {
        let lines = self.extractor.extract_text_lines(page);
        let first = lines.first()?;
        if !first.starts_with(marker) {
            return None;
        }
        first.split_whitespace().last().map(str::to_string)
    }

    fn title_line(&self, page: &Page, regions: &[RelativeBox]) -> Result<(String, chrono::NaiveDate)> {
        let pattern = self
            .patterns
            .title
            .as_ref()
            .ok_or_else(|| ExtractionError::MissingField("title pattern".to_string()))?;
        for region in regions {
            let lines = self.extractor.extract_lines(page, *region);
            let Some(caps) = lines.last().and_then(|l| pattern.captures(l)) else {
                continue;
            };
            let number: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
            let date = parse_required_date("Date", Some(caps[2].to_string()))?;
            return Ok((number, date));
        }
        Err(ExtractionError::MissingField("invoice number and date".to_string()))
    }

    fn vat_in_line(&self, locator: &VatLocator, line: &str) -> Option<String> {
        match locator {
            VatLocator::Pattern { .. } => {
                let pattern = self.patterns.vat.as_ref()?;
                pattern.is_match(line).then(|| line.trim().to_string())
            }
            VatLocator::Label { label } => line.contains(label.as_str()).then(|| after_last_colon(line)),
        }
    }
}

/// A two-row table whose first row equals `labels`.
fn header_matches(table: &TableGrid, labels: &[String]) -> bool {
    table.len() == 2
        && table[0].len() == labels.len()
        && table[0]
            .iter()
            .zip(labels)
            .all(|(cell, label)| cell.as_deref() == Some(label.as_str()))
}

fn after_last_colon(line: &str) -> String {
    line.rsplit(':').next().unwrap_or(line).trim().to_string()
}

fn parse_required_date(field: &str, value: Option<String>) -> Result<chrono::NaiveDate> {
    let value = value.ok_or_else(|| ExtractionError::MissingField(field.to_string()))?;
    parse_date(&value).ok_or(ExtractionError::Parse {
        field: field.to_string(),
        value,
    })
}
