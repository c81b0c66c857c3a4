//! INSTAT declaration model.
//!
//! Every type validates its fields on construction and again after
//! deserialization, so an invalid value never reaches the XML writer. Field
//! names on the serde side match the XML element names.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;

type ModelResult<T> = std::result::Result<T, ModelError>;

const MAX_ITEM_NUMBER: u32 = 999_999;
const MAX_MASS: u64 = 9_999_999_999;
const MAX_INVOICED_AMOUNT: u64 = 99_999_999_999;
const DECLARATION_TYPE_CODES: [u8; 3] = [1, 4, 5];

lazy_static! {
    static ref DATE: Regex = Regex::new(r"^20\d{2}-\d{2}-\d{2}$").unwrap();
    static ref TIME: Regex = Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap();
    static ref PERIOD: Regex = Regex::new(r"^20\d{2}-\d{2}$").unwrap();
    static ref DECLARATION_ID: Regex = Regex::new(r"^\d{6}$").unwrap();
    static ref COUNTRY: Regex = Regex::new(r"^[A-Z]{2}$").unwrap();
    static ref REGION: Regex = Regex::new(r"^(\d{2}|2A|2B)$").unwrap();
}

fn check_pattern(entity: &'static str, field: &'static str, value: &str, pattern: &Regex) -> ModelResult<()> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(ModelError::new(entity, field, format!("must match {}", pattern.as_str()), value))
    }
}

fn check_len(entity: &'static str, field: &'static str, value: &str, min: usize, max: usize) -> ModelResult<()> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        return Ok(());
    }
    let constraint = if min == max {
        format!("must be exactly {} characters", min)
    } else {
        format!("must be {} to {} characters", min, max)
    };
    Err(ModelError::new(entity, field, constraint, value))
}

fn check_range<T>(entity: &'static str, field: &'static str, value: T, min: T, max: T) -> ModelResult<()>
where
    T: PartialOrd + fmt::Display + Copy,
{
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ModelError::new(entity, field, format!("must be between {} and {}", min, max), value))
    }
}

/// Declaration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowCode {
    /// Goods entering the country (`A`).
    Arrival,
    /// Goods leaving the country (`D`).
    Dispatch,
}

impl FlowCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowCode::Arrival => "A",
            FlowCode::Dispatch => "D",
        }
    }
}

impl fmt::Display for FlowCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowCode {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "A" => Ok(FlowCode::Arrival),
            "D" => Ok(FlowCode::Dispatch),
            other => Err(ModelError::new("Declaration", "flowCode", "must be A or D", other)),
        }
    }
}

impl Serialize for FlowCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlowCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Creation timestamp of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTime {
    date: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    time: Option<String>,
}

impl DateTime {
    pub fn new(date: impl Into<String>, time: Option<String>) -> ModelResult<Self> {
        let dt = Self {
            date: date.into(),
            time,
        };
        dt.validate()?;
        Ok(dt)
    }

    pub fn from_naive(at: NaiveDateTime) -> ModelResult<Self> {
        Self::new(at.format("%Y-%m-%d").to_string(), Some(at.format("%H:%M:%S").to_string()))
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    fn validate(&self) -> ModelResult<()> {
        check_pattern("DateTime", "date", &self.date, &DATE)?;
        if let Some(time) = &self.time {
            check_pattern("DateTime", "time", time, &TIME)?;
        }
        Ok(())
    }
}

/// The declaring company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "partyId")]
    party_id: String,
    #[serde(rename = "partyName")]
    party_name: String,
}

impl Party {
    pub fn new(party_id: impl Into<String>, party_name: impl Into<String>) -> ModelResult<Self> {
        let party = Self {
            party_id: party_id.into(),
            party_name: party_name.into(),
        };
        party.validate()?;
        Ok(party)
    }

    pub fn party_id(&self) -> &str {
        &self.party_id
    }

    pub fn party_name(&self) -> &str {
        &self.party_name
    }

    fn validate(&self) -> ModelResult<()> {
        check_len("Party", "partyId", &self.party_id, 18, 18)?;
        check_len("Party", "partyName", &self.party_name, 1, 14)
    }
}

/// Declaration function; only original declarations are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    #[serde(rename = "functionCode")]
    function_code: String,
}

impl Function {
    pub fn original() -> Self {
        Self {
            function_code: "O".to_string(),
        }
    }

    pub fn function_code(&self) -> &str {
        &self.function_code
    }

    fn validate(&self) -> ModelResult<()> {
        if self.function_code == "O" {
            Ok(())
        } else {
            Err(ModelError::new("Function", "functionCode", "must be O", &self.function_code))
        }
    }
}

/// Combined nomenclature classification of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cn8 {
    #[serde(rename = "CN8Code", skip_serializing_if = "Option::is_none", default)]
    cn8_code: Option<String>,
    #[serde(rename = "SUCode", skip_serializing_if = "Option::is_none", default)]
    su_code: Option<String>,
    #[serde(rename = "additionalGoodsCode", skip_serializing_if = "Option::is_none", default)]
    additional_goods_code: Option<String>,
}

impl Cn8 {
    pub fn new(code: impl Into<String>) -> ModelResult<Self> {
        let cn8 = Self {
            cn8_code: Some(code.into()),
            ..Self::default()
        };
        cn8.validate()?;
        Ok(cn8)
    }

    pub fn code(&self) -> Option<&str> {
        self.cn8_code.as_deref()
    }

    pub fn su_code(&self) -> Option<&str> {
        self.su_code.as_deref()
    }

    pub fn additional_goods_code(&self) -> Option<&str> {
        self.additional_goods_code.as_deref()
    }

    fn validate(&self) -> ModelResult<()> {
        match &self.cn8_code {
            Some(code) => check_len("CN8", "CN8Code", code, 8, 8),
            None => Ok(()),
        }
    }
}

/// Nature of transaction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatureOfTransaction {
    #[serde(rename = "natureOfTransactionACode")]
    a_code: u8,
    #[serde(rename = "natureOfTransactionBCode", skip_serializing_if = "Option::is_none", default)]
    b_code: Option<u8>,
}

impl NatureOfTransaction {
    pub fn new(a_code: u8, b_code: Option<u8>) -> ModelResult<Self> {
        let not = Self { a_code, b_code };
        not.validate()?;
        Ok(not)
    }

    pub fn a_code(&self) -> u8 {
        self.a_code
    }

    pub fn b_code(&self) -> Option<u8> {
        self.b_code
    }

    fn validate(&self) -> ModelResult<()> {
        check_range("NatureOfTransaction", "natureOfTransactionACode", self.a_code, 1, 9)?;
        if let Some(b) = self.b_code {
            check_range("NatureOfTransaction", "natureOfTransactionBCode", b, 1, 9)?;
        }
        Ok(())
    }
}

/// Values for a new [`Item`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub item_number: u32,
    pub cn8: Cn8,
    pub destination: Option<String>,
    pub origin: Option<String>,
    pub net_mass: Option<u64>,
    pub quantity: Option<u64>,
    pub invoiced_amount: u64,
    pub partner_id: Option<String>,
    pub statistical_procedure_code: u32,
    pub nature_of_transaction: Option<NatureOfTransaction>,
    pub mode_of_transport_code: Option<u8>,
    pub region_code: Option<String>,
}

/// One declared goods line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "itemNumber")]
    item_number: u32,
    #[serde(rename = "CN8")]
    cn8: Cn8,
    #[serde(rename = "MSConsDestCode", skip_serializing_if = "Option::is_none", default)]
    ms_cons_dest_code: Option<String>,
    #[serde(rename = "countryOfOriginCode", skip_serializing_if = "Option::is_none", default)]
    country_of_origin_code: Option<String>,
    #[serde(rename = "netMass", skip_serializing_if = "Option::is_none", default)]
    net_mass: Option<u64>,
    #[serde(rename = "quantityInSU", skip_serializing_if = "Option::is_none", default)]
    quantity_in_su: Option<u64>,
    #[serde(rename = "invoicedAmount")]
    invoiced_amount: u64,
    #[serde(rename = "partnerId", skip_serializing_if = "Option::is_none", default)]
    partner_id: Option<String>,
    #[serde(rename = "statisticalProcedureCode")]
    statistical_procedure_code: u32,
    #[serde(rename = "NatureOfTransaction", skip_serializing_if = "Option::is_none", default)]
    nature_of_transaction: Option<NatureOfTransaction>,
    #[serde(rename = "modeOfTransportCode", skip_serializing_if = "Option::is_none", default)]
    mode_of_transport_code: Option<u8>,
    #[serde(rename = "regionCode", skip_serializing_if = "Option::is_none", default)]
    region_code: Option<String>,
}

impl Item {
    pub fn new(fields: ItemFields) -> ModelResult<Self> {
        let item = Self {
            item_number: fields.item_number,
            cn8: fields.cn8,
            ms_cons_dest_code: fields.destination,
            country_of_origin_code: fields.origin,
            net_mass: fields.net_mass,
            quantity_in_su: fields.quantity,
            invoiced_amount: fields.invoiced_amount,
            partner_id: fields.partner_id,
            statistical_procedure_code: fields.statistical_procedure_code,
            nature_of_transaction: fields.nature_of_transaction,
            mode_of_transport_code: fields.mode_of_transport_code,
            region_code: fields.region_code,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn item_number(&self) -> u32 {
        self.item_number
    }

    pub fn cn8(&self) -> &Cn8 {
        &self.cn8
    }

    pub fn destination(&self) -> Option<&str> {
        self.ms_cons_dest_code.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.country_of_origin_code.as_deref()
    }

    pub fn net_mass(&self) -> Option<u64> {
        self.net_mass
    }

    pub fn quantity(&self) -> Option<u64> {
        self.quantity_in_su
    }

    pub fn invoiced_amount(&self) -> u64 {
        self.invoiced_amount
    }

    pub fn partner_id(&self) -> Option<&str> {
        self.partner_id.as_deref()
    }

    pub fn statistical_procedure_code(&self) -> u32 {
        self.statistical_procedure_code
    }

    pub fn nature_of_transaction(&self) -> Option<&NatureOfTransaction> {
        self.nature_of_transaction.as_ref()
    }

    pub fn mode_of_transport_code(&self) -> Option<u8> {
        self.mode_of_transport_code
    }

    pub fn region_code(&self) -> Option<&str> {
        self.region_code.as_deref()
    }

    fn validate(&self) -> ModelResult<()> {
        check_range("Item", "itemNumber", self.item_number, 1, MAX_ITEM_NUMBER)?;
        self.cn8.validate()?;
        if let Some(code) = &self.ms_cons_dest_code {
            check_pattern("Item", "MSConsDestCode", code, &COUNTRY)?;
        }
        if let Some(code) = &self.country_of_origin_code {
            check_pattern("Item", "countryOfOriginCode", code, &COUNTRY)?;
        }
        if let Some(mass) = self.net_mass {
            check_range("Item", "netMass", mass, 0, MAX_MASS)?;
        }
        if let Some(quantity) = self.quantity_in_su {
            check_range("Item", "quantityInSU", quantity, 0, MAX_MASS)?;
        }
        check_range("Item", "invoicedAmount", self.invoiced_amount, 1, MAX_INVOICED_AMOUNT)?;
        if let Some(not) = &self.nature_of_transaction {
            not.validate()?;
        }
        if let Some(mode) = self.mode_of_transport_code {
            check_range("Item", "modeOfTransportCode", mode, 1, 9)?;
        }
        if let Some(region) = &self.region_code {
            check_pattern("Item", "regionCode", region, &REGION)?;
        }
        Ok(())
    }
}

/// Values for a new [`Declaration`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationFields {
    pub declaration_id: String,
    pub reference_period: String,
    pub psi_id: String,
    pub declaration_type_code: u8,
    pub flow_code: FlowCode,
    pub items: Vec<Item>,
}

/// One invoice's worth of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(rename = "declarationId")]
    declaration_id: String,
    #[serde(rename = "referencePeriod")]
    reference_period: String,
    #[serde(rename = "PSIId")]
    psi_id: String,
    #[serde(rename = "Function")]
    function: Function,
    #[serde(rename = "declarationTypeCode")]
    declaration_type_code: u8,
    #[serde(rename = "flowCode")]
    flow_code: FlowCode,
    #[serde(rename = "currencyCode")]
    currency_code: String,
    #[serde(rename = "Item", default)]
    items: Vec<Item>,
}

impl Declaration {
    pub fn new(fields: DeclarationFields) -> ModelResult<Self> {
        let declaration = Self {
            declaration_id: fields.declaration_id,
            reference_period: fields.reference_period,
            psi_id: fields.psi_id,
            function: Function::original(),
            declaration_type_code: fields.declaration_type_code,
            flow_code: fields.flow_code,
            currency_code: "EUR".to_string(),
            items: fields.items,
        };
        declaration.validate()?;
        Ok(declaration)
    }

    pub fn declaration_id(&self) -> &str {
        &self.declaration_id
    }

    pub fn reference_period(&self) -> &str {
        &self.reference_period
    }

    pub fn psi_id(&self) -> &str {
        &self.psi_id
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn declaration_type_code(&self) -> u8 {
        self.declaration_type_code
    }

    pub fn flow_code(&self) -> FlowCode {
        self.flow_code
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    fn validate(&self) -> ModelResult<()> {
        check_pattern("Declaration", "declarationId", &self.declaration_id, &DECLARATION_ID)?;
        check_pattern("Declaration", "referencePeriod", &self.reference_period, &PERIOD)?;
        check_len("Declaration", "PSIId", &self.psi_id, 18, 18)?;
        self.function.validate()?;
        if !DECLARATION_TYPE_CODES.contains(&self.declaration_type_code) {
            return Err(ModelError::new(
                "Declaration",
                "declarationTypeCode",
                "must be one of 1, 4, 5",
                self.declaration_type_code,
            ));
        }
        if self.currency_code != "EUR" {
            return Err(ModelError::new("Declaration", "currencyCode", "must be EUR", &self.currency_code));
        }
        if self.items.is_empty() {
            return Err(ModelError::new("Declaration", "Item", "at least one item is required", 0));
        }
        for (i, item) in self.items.iter().enumerate() {
            item.validate()?;
            let expected = i as u32 + 1;
            if item.item_number != expected {
                return Err(ModelError::new(
                    "Declaration",
                    "itemNumber",
                    format!("items must be numbered 1..N, expected {}", expected),
                    item.item_number,
                ));
            }
        }
        Ok(())
    }
}

/// The submission unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "envelopeId")]
    envelope_id: String,
    #[serde(rename = "DateTime")]
    date_time: DateTime,
    #[serde(rename = "Party")]
    party: Party,
    #[serde(rename = "softwareUsed", skip_serializing_if = "Option::is_none", default)]
    software_used: Option<String>,
    #[serde(rename = "Declaration", default)]
    declarations: Vec<Declaration>,
}

impl Envelope {
    pub fn new(
        envelope_id: impl Into<String>,
        date_time: DateTime,
        party: Party,
        software_used: Option<String>,
        declarations: Vec<Declaration>,
    ) -> ModelResult<Self> {
        let envelope = Self {
            envelope_id: envelope_id.into(),
            date_time,
            party,
            software_used,
            declarations,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn envelope_id(&self) -> &str {
        &self.envelope_id
    }

    pub fn date_time(&self) -> &DateTime {
        &self.date_time
    }

    pub fn party(&self) -> &Party {
        &self.party
    }

    pub fn software_used(&self) -> Option<&str> {
        self.software_used.as_deref()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    fn validate(&self) -> ModelResult<()> {
        check_len("Envelope", "envelopeId", &self.envelope_id, 1, 4)?;
        self.date_time.validate()?;
        self.party.validate()?;
        if let Some(software) = &self.software_used {
            check_len("Envelope", "softwareUsed", software, 0, 14)?;
        }
        self.declarations.iter().try_for_each(Declaration::validate)
    }
}

/// Document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instat {
    #[serde(rename = "Envelope")]
    envelope: Envelope,
}

impl Instat {
    pub fn new(envelope: Envelope) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Re-check every constraint, for values obtained by deserialization.
    pub fn validate(&self) -> ModelResult<()> {
        self.envelope.validate()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn item_fields(item_number: u32) -> ItemFields {
        ItemFields {
            item_number,
            cn8: Cn8::new("61091000").unwrap(),
            destination: Some("ES".to_string()),
            origin: Some("IT".to_string()),
            net_mass: Some(1),
            quantity: Some(2),
            invoiced_amount: 100,
            partner_id: Some("ESB12345678".to_string()),
            statistical_procedure_code: 21,
            nature_of_transaction: Some(NatureOfTransaction::new(1, Some(1)).unwrap()),
            mode_of_transport_code: Some(3),
            region_code: Some("93".to_string()),
        }
    }

    pub(crate) fn declaration_fields(items: Vec<Item>) -> DeclarationFields {
        DeclarationFields {
            declaration_id: "000123".to_string(),
            reference_period: "2024-03".to_string(),
            psi_id: "FR0979124578000030".to_string(),
            declaration_type_code: 1,
            flow_code: FlowCode::Dispatch,
            items,
        }
    }

    pub(crate) fn sample_instat() -> Instat {
        let items = vec![Item::new(item_fields(1)).unwrap(), Item::new(item_fields(2)).unwrap()];
        let declaration = Declaration::new(declaration_fields(items)).unwrap();
        let envelope = Envelope::new(
            "L5B7",
            DateTime::new("2024-04-02", Some("10:30:00".to_string())).unwrap(),
            Party::new("FR0979124578000030", "Jessy & co").unwrap(),
            None,
            vec![declaration],
        )
        .unwrap();
        Instat::new(envelope)
    }

    #[test]
    fn test_valid_model_builds() {
        let instat = sample_instat();
        let declaration = &instat.envelope().declarations()[0];
        assert_eq!(declaration.items().len(), 2);
        assert_eq!(declaration.currency_code(), "EUR");
        assert_eq!(declaration.function().function_code(), "O");
        assert!(instat.validate().is_ok());
    }

    #[test]
    fn test_invoiced_amount_must_be_positive() {
        let mut fields = item_fields(1);
        fields.invoiced_amount = 0;
        let err = Item::new(fields).unwrap_err();
        assert_eq!(err.entity, "Item");
        assert_eq!(err.field, "invoicedAmount");
        assert_eq!(err.value, "0");
    }

    #[test]
    fn test_item_constraints() {
        let mut fields = item_fields(1);
        fields.mode_of_transport_code = Some(0);
        assert_eq!(Item::new(fields).unwrap_err().field, "modeOfTransportCode");

        let mut fields = item_fields(1);
        fields.region_code = Some("2C".to_string());
        assert_eq!(Item::new(fields).unwrap_err().field, "regionCode");

        let mut fields = item_fields(1_000_000);
        fields.region_code = Some("2A".to_string());
        assert_eq!(Item::new(fields).unwrap_err().field, "itemNumber");

        assert_eq!(Cn8::new("6109100").unwrap_err().field, "CN8Code");
    }

    #[test]
    fn test_declaration_constraints() {
        let items = || vec![Item::new(item_fields(1)).unwrap()];

        let mut fields = declaration_fields(items());
        fields.declaration_id = "FA0123".to_string();
        assert_eq!(Declaration::new(fields).unwrap_err().field, "declarationId");

        let mut fields = declaration_fields(items());
        fields.reference_period = "24-03".to_string();
        assert_eq!(Declaration::new(fields).unwrap_err().field, "referencePeriod");

        let mut fields = declaration_fields(items());
        fields.declaration_type_code = 2;
        assert_eq!(Declaration::new(fields).unwrap_err().field, "declarationTypeCode");

        assert_eq!(Declaration::new(declaration_fields(vec![])).unwrap_err().field, "Item");

        let misnumbered = vec![Item::new(item_fields(2)).unwrap()];
        assert_eq!(Declaration::new(declaration_fields(misnumbered)).unwrap_err().field, "itemNumber");
    }

    #[test]
    fn test_party_and_envelope_constraints() {
        assert_eq!(Party::new("FR09", "X").unwrap_err().field, "partyId");
        assert_eq!(
            Party::new("FR0979124578000030", "A name far too long").unwrap_err().field,
            "partyName"
        );
        let dt = DateTime::new("2024-04-02", None).unwrap();
        let party = Party::new("FR0979124578000030", "ZHC").unwrap();
        let err = Envelope::new("L5BAX", dt, party, None, vec![]).unwrap_err();
        assert_eq!(err.field, "envelopeId");
        assert!(DateTime::new("1999-01-01", None).is_err());
    }

    #[test]
    fn test_flow_code_parsing() {
        assert_eq!("A".parse::<FlowCode>().unwrap(), FlowCode::Arrival);
        assert_eq!(FlowCode::Dispatch.to_string(), "D");
        assert!("X".parse::<FlowCode>().is_err());
    }
}
