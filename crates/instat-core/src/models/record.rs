//! Rows read from invoice pages, before any article resolution.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Header data of one invoice, shared by all of its pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    /// Invoice number as printed.
    pub invoice_number: String,

    /// Invoice date.
    pub invoice_date: NaiveDate,

    /// Counterparty intra-community VAT number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_id: Option<String>,

    /// Country read from the address block, as printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Vendor-side client code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_code: Option<String>,
}

impl InvoiceMetadata {
    pub fn new(invoice_number: impl Into<String>, invoice_date: NaiveDate) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            invoice_date,
            vat_id: None,
            country: None,
            client_code: None,
        }
    }

    pub fn with_vat_id(mut self, vat_id: impl Into<String>) -> Self {
        self.vat_id = Some(vat_id.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_client_code(mut self, client_code: impl Into<String>) -> Self {
        self.client_code = Some(client_code.into());
        self
    }
}

/// One invoice line as it appears on a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPageRecord {
    /// 1-based page index in the document.
    pub page: u32,

    /// Invoice number; `None` only when a reader failed to attach metadata.
    pub invoice_number: Option<String>,

    pub invoice_date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_code: Option<String>,

    /// Vendor article code, when the layout has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_code: Option<String>,

    /// Article description, used for reference lookup.
    pub description: String,

    pub quantity: Decimal,

    pub unit_price: Decimal,

    /// Discount rate in percent.
    pub discount_percent: Decimal,

    /// Declared discount amount, when printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,

    /// Net line amount as printed (or recomputed when the layout calls
    /// for it).
    pub net_amount: Decimal,

    /// Country as read from the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Destination country code (ISO alpha-2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Origin country code (ISO alpha-2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Counterparty VAT number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_id: Option<String>,
}

impl RawPageRecord {
    /// A record carrying `metadata` with empty item columns.
    pub fn from_metadata(page: u32, metadata: &InvoiceMetadata) -> Self {
        Self {
            page,
            invoice_number: Some(metadata.invoice_number.clone()),
            invoice_date: metadata.invoice_date,
            client_code: metadata.client_code.clone(),
            article_code: None,
            description: String::new(),
            quantity: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            discount_amount: None,
            net_amount: Decimal::ZERO,
            country: metadata.country.clone(),
            destination: None,
            origin: None,
            vat_id: metadata.vat_id.clone(),
        }
    }
}
