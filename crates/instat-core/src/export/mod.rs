//! Tabular export of declarations and extracted page records.
//!
//! The spreadsheet is written next to the XML so operators can compare
//! what was read from each page with what was declared.

use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use tracing::info;

use crate::error::InstatError;
use crate::models::{Instat, RawPageRecord};

/// One declared item, flattened with its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "declarationId")]
    pub declaration_id: String,
    #[serde(rename = "referencePeriod")]
    pub reference_period: String,
    #[serde(rename = "flowCode")]
    pub flow_code: String,
    #[serde(rename = "itemNumber")]
    pub item_number: u32,
    #[serde(rename = "CN8Code")]
    pub cn8_code: Option<String>,
    #[serde(rename = "MSConsDestCode")]
    pub destination: Option<String>,
    #[serde(rename = "countryOfOriginCode")]
    pub origin: Option<String>,
    #[serde(rename = "netMass")]
    pub net_mass: Option<u64>,
    #[serde(rename = "quantityInSU")]
    pub quantity: Option<u64>,
    #[serde(rename = "invoicedAmount")]
    pub invoiced_amount: u64,
    #[serde(rename = "partnerId")]
    pub partner_id: Option<String>,
    #[serde(rename = "statisticalProcedureCode")]
    pub statistical_procedure_code: u32,
    #[serde(rename = "natureOfTransactionACode")]
    pub nature_a: Option<u8>,
    #[serde(rename = "natureOfTransactionBCode")]
    pub nature_b: Option<u8>,
    #[serde(rename = "modeOfTransportCode")]
    pub mode_of_transport: Option<u8>,
    #[serde(rename = "regionCode")]
    pub region_code: Option<String>,
}

const DECLARATION_HEADERS: [&str; 16] = [
    "declarationId",
    "referencePeriod",
    "flowCode",
    "itemNumber",
    "CN8Code",
    "MSConsDestCode",
    "countryOfOriginCode",
    "netMass",
    "quantityInSU",
    "invoicedAmount",
    "partnerId",
    "statisticalProcedureCode",
    "natureOfTransactionACode",
    "natureOfTransactionBCode",
    "modeOfTransportCode",
    "regionCode",
];

const RECORD_HEADERS: [&str; 15] = [
    "page",
    "invoiceNumber",
    "invoiceDate",
    "clientCode",
    "articleCode",
    "description",
    "quantity",
    "unitPrice",
    "discountPercent",
    "discountAmount",
    "netAmount",
    "country",
    "destination",
    "origin",
    "vatId",
];

enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

fn text(value: &Option<String>) -> Cell {
    value.clone().map(Cell::Text).unwrap_or(Cell::Empty)
}

fn number(value: Option<f64>) -> Cell {
    value.map(Cell::Number).unwrap_or(Cell::Empty)
}

fn decimal(value: Decimal) -> Cell {
    number(value.to_f64())
}

impl ExportRow {
    /// One row per item of every declaration, in document order.
    pub fn from_instat(instat: &Instat) -> Vec<Self> {
        instat
            .envelope()
            .declarations()
            .iter()
            .flat_map(|declaration| {
                declaration.items().iter().map(move |item| Self {
                    declaration_id: declaration.declaration_id().to_string(),
                    reference_period: declaration.reference_period().to_string(),
                    flow_code: declaration.flow_code().to_string(),
                    item_number: item.item_number(),
                    cn8_code: item.cn8().code().map(str::to_string),
                    destination: item.destination().map(str::to_string),
                    origin: item.origin().map(str::to_string),
                    net_mass: item.net_mass(),
                    quantity: item.quantity(),
                    invoiced_amount: item.invoiced_amount(),
                    partner_id: item.partner_id().map(str::to_string),
                    statistical_procedure_code: item.statistical_procedure_code(),
                    nature_a: item.nature_of_transaction().map(|n| n.a_code()),
                    nature_b: item.nature_of_transaction().and_then(|n| n.b_code()),
                    mode_of_transport: item.mode_of_transport_code(),
                    region_code: item.region_code().map(str::to_string),
                })
            })
            .collect()
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.declaration_id.clone()),
            Cell::Text(self.reference_period.clone()),
            Cell::Text(self.flow_code.clone()),
            Cell::Number(f64::from(self.item_number)),
            text(&self.cn8_code),
            text(&self.destination),
            text(&self.origin),
            number(self.net_mass.map(|v| v as f64)),
            number(self.quantity.map(|v| v as f64)),
            Cell::Number(self.invoiced_amount as f64),
            text(&self.partner_id),
            Cell::Number(f64::from(self.statistical_procedure_code)),
            number(self.nature_a.map(f64::from)),
            number(self.nature_b.map(f64::from)),
            number(self.mode_of_transport.map(f64::from)),
            text(&self.region_code),
        ]
    }
}

fn record_cells(record: &RawPageRecord) -> Vec<Cell> {
    vec![
        Cell::Number(f64::from(record.page)),
        text(&record.invoice_number),
        Cell::Text(record.invoice_date.format("%d/%m/%Y").to_string()),
        text(&record.client_code),
        text(&record.article_code),
        Cell::Text(record.description.clone()),
        decimal(record.quantity),
        decimal(record.unit_price),
        decimal(record.discount_percent),
        record.discount_amount.map(decimal).unwrap_or(Cell::Empty),
        decimal(record.net_amount),
        text(&record.country),
        text(&record.destination),
        text(&record.origin),
        text(&record.vat_id),
    ]
}

fn export_error(e: XlsxError) -> InstatError {
    InstatError::Export(e.to_string())
}

fn write_sheet(
    worksheet: &mut Worksheet,
    headers: &[&str],
    rows: impl Iterator<Item = Vec<Cell>>,
) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, cells) in rows.enumerate() {
        let row = i as u32 + 1;
        for (col, cell) in cells.into_iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string(row, col, value)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row, col, value)?;
                }
                Cell::Empty => {}
            }
        }
    }
    Ok(())
}

/// Write a `Declarations` sheet and an `Extracted` sheet to `path`.
pub fn write_xlsx(path: &Path, instat: &Instat, records: &[RawPageRecord]) -> Result<(), InstatError> {
    let rows = ExportRow::from_instat(instat);
    let mut workbook = Workbook::new();

    let declarations = workbook.add_worksheet().set_name("Declarations").map_err(export_error)?;
    write_sheet(declarations, &DECLARATION_HEADERS, rows.iter().map(ExportRow::cells)).map_err(export_error)?;

    let extracted = workbook.add_worksheet().set_name("Extracted").map_err(export_error)?;
    write_sheet(extracted, &RECORD_HEADERS, records.iter().map(record_cells)).map_err(export_error)?;

    workbook.save(path).map_err(export_error)?;
    info!("Wrote {} items and {} records to {}", rows.len(), records.len(), path.display());
    Ok(())
}

/// Write the declaration rows as CSV.
pub fn write_csv(path: &Path, instat: &Instat) -> Result<(), InstatError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| InstatError::Export(e.to_string()))?;
    let rows = ExportRow::from_instat(instat);
    for row in &rows {
        writer.serialize(row).map_err(|e| InstatError::Export(e.to_string()))?;
    }
    writer.flush()?;
    info!("Wrote {} items to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instat::tests::sample_instat;
    use crate::models::InvoiceMetadata;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rows_follow_declarations() {
        let rows = ExportRow::from_instat(&sample_instat());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].item_number, 2);
        assert_eq!(rows[0].declaration_id, "000123");
        assert_eq!(rows[0].flow_code, "D");
        assert_eq!(rows[0].cn8_code.as_deref(), Some("61091000"));
        assert_eq!(rows[0].nature_b, Some(1));
    }

    #[test]
    fn test_write_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let metadata = InvoiceMetadata::new("FA000123", NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let mut record = RawPageRecord::from_metadata(1, &metadata);
        record.description = "ROBE".to_string();
        record.net_amount = "40.5".parse().unwrap();

        write_xlsx(&path, &sample_instat(), &[record]).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Declarations".to_string(), "Extracted".to_string()]);

        let declarations = workbook.worksheet_range("Declarations").unwrap();
        assert_eq!(declarations.get_size(), (3, 16));
        assert_eq!(declarations.get((0, 0)), Some(&Data::String("declarationId".to_string())));
        assert_eq!(declarations.get((1, 9)), Some(&Data::Float(100.0)));

        let extracted = workbook.worksheet_range("Extracted").unwrap();
        assert_eq!(extracted.get((1, 1)), Some(&Data::String("FA000123".to_string())));
        assert_eq!(extracted.get((1, 5)), Some(&Data::String("ROBE".to_string())));
        assert_eq!(extracted.get((1, 10)), Some(&Data::Float(40.5)));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &sample_instat()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), DECLARATION_HEADERS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "000123,2024-03,D,1,61091000,ES,IT,1,2,100,ESB12345678,21,1,1,3,93"
        );
        assert_eq!(lines.count(), 1);
    }
}
