//! Grouping of page records into declarations.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use crate::articles::ArticleResolver;
use crate::error::InstatError;
use crate::models::{
    Cn8, DateTime, Declaration, DeclarationFields, Envelope, Instat, Item, ItemFields, NatureOfTransaction, Party,
    RawPageRecord,
};
use crate::readers::numbers::round_units;
use crate::readers::{PageIssue, PageIssueKind, VendorProfile, PLACEHOLDER_PARTY_ID};

/// Declarations built from one document and the pages that lost items or
/// whole invoices on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub declarations: Vec<Declaration>,
    pub issues: Vec<PageIssue>,
}

/// Builds declarations and the envelope for one vendor.
pub struct DeclarationAssembler<'a> {
    profile: &'a VendorProfile,
    resolver: ArticleResolver<'a>,
    clock: Arc<dyn Clock>,
}

impl<'a> DeclarationAssembler<'a> {
    pub fn new(profile: &'a VendorProfile, resolver: ArticleResolver<'a>) -> Self {
        Self {
            profile,
            resolver,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Group `records` by invoice number and build one declaration per
    /// invoice with at least one valid item.
    ///
    /// A record without an invoice number aborts the run. Items whose
    /// article cannot be resolved or whose values fail validation are
    /// dropped and their page reported; an invoice left without items is
    /// omitted.
    pub fn assemble(&self, records: &[RawPageRecord]) -> Result<Assembly, InstatError> {
        let mut groups: BTreeMap<&str, Vec<&RawPageRecord>> = BTreeMap::new();
        for record in records {
            let number = record
                .invoice_number
                .as_deref()
                .ok_or(InstatError::NullInvoiceNumber { page: record.page })?;
            groups.entry(number).or_default().push(record);
        }
        info!("Assembling {} invoices from {} records", groups.len(), records.len());

        let mut declarations = Vec::with_capacity(groups.len());
        let mut issues = Vec::new();
        for (number, group) in groups {
            let mut items = Vec::with_capacity(group.len());
            for record in &group {
                match self.item(items.len() as u32 + 1, record) {
                    Ok(item) => items.push(item),
                    Err(issue) => issues.push(issue),
                }
            }
            if items.is_empty() {
                warn!("Invoice {} has no declarable item and is left out", number);
                continue;
            }

            let first = group[0];
            let fields = DeclarationFields {
                declaration_id: self.profile.declaration_id.declaration_id(number, first.invoice_date),
                reference_period: first.invoice_date.format("%Y-%m").to_string(),
                psi_id: self.party_id().to_string(),
                declaration_type_code: self.profile.declaration_type_code,
                flow_code: self.profile.flow_code,
                items,
            };
            match Declaration::new(fields) {
                Ok(declaration) => {
                    debug!(
                        "Declaration {} with {} items",
                        declaration.declaration_id(),
                        declaration.items().len()
                    );
                    declarations.push(declaration);
                }
                Err(e) => {
                    let mut pages: Vec<u32> = group.iter().map(|r| r.page).collect();
                    pages.dedup();
                    for page in pages {
                        issues.push(PageIssue::new(
                            page,
                            PageIssueKind::InvalidDeclaration,
                            format!("invoice {}: {}", number, e),
                        ));
                    }
                }
            }
        }

        Ok(Assembly { declarations, issues })
    }

    /// Wrap `declarations` in the vendor's envelope, stamped by the clock.
    pub fn envelope(&self, declarations: Vec<Declaration>) -> Result<Instat, InstatError> {
        let party = Party::new(self.party_id(), &self.profile.party.name)?;
        let date_time = DateTime::from_naive(self.clock.now())?;
        let envelope = Envelope::new(&self.profile.envelope_id, date_time, party, None, declarations)?;
        Ok(Instat::new(envelope))
    }

    /// Declarant id of the profile, or the company's authorization number
    /// from the reference workbook when the profile has none.
    pub fn party_id(&self) -> &str {
        let party = &self.profile.party;
        if party.id != PLACEHOLDER_PARTY_ID {
            return &party.id;
        }
        let reference = self.resolver.reference();
        match reference
            .authorization_number(&party.name)
            .or_else(|| reference.authorization_number(&self.profile.company))
        {
            Some(number) => {
                debug!("Using authorization number {} for {}", number, self.profile.company);
                number
            }
            None => {
                warn!("No authorization number for {}, keeping the placeholder id", self.profile.company);
                &party.id
            }
        }
    }

    fn item(&self, item_number: u32, record: &RawPageRecord) -> Result<Item, PageIssue> {
        let page = record.page;
        let name = record.description.as_str();

        let Some(code) = self.resolver.resolve_code(name) else {
            return Err(PageIssue::new(
                page,
                PageIssueKind::UnresolvedArticle,
                format!("no customs code for {:?}", name),
            ));
        };
        if self.profile.require_destination && record.destination.is_none() {
            return Err(PageIssue::new(
                page,
                PageIssueKind::MissingMetadata,
                format!("no destination for {:?}", name),
            ));
        }

        let weight = self.resolver.resolve_weight(name).unwrap_or_else(|| {
            warn!("No unit weight for {:?} on page {}, using 0", name, page);
            Decimal::ZERO
        });
        let quantity = round_units(record.quantity);
        if quantity != record.quantity {
            warn!("Quantity {} of {:?} on page {} is not a whole number", record.quantity, name, page);
        }
        let invalid = |detail: String| PageIssue::new(page, PageIssueKind::InvalidItem, detail);
        let overflow = |field: &str| invalid(format!("{} of {:?} overflows", field, name));

        let amount = if self.profile.apply_discount {
            record
                .discount_percent
                .checked_div(Decimal::ONE_HUNDRED)
                .and_then(|rate| Decimal::ONE.checked_sub(rate))
                .and_then(|share| record.net_amount.checked_mul(share))
                .ok_or_else(|| overflow("invoicedAmount"))?
        } else {
            record.net_amount
        };
        let mass = weight
            .checked_mul(record.quantity)
            .ok_or_else(|| overflow("netMass"))?;
        let whole = |field: &str, value: Decimal| {
            round_units(value)
                .to_u64()
                .ok_or_else(|| invalid(format!("{} of {:?} is out of range: {}", field, name, value)))
        };

        let nature = &self.profile.nature_of_transaction;
        let fields = ItemFields {
            item_number,
            cn8: Cn8::new(code).map_err(|e| invalid(e.to_string()))?,
            destination: record.destination.clone(),
            origin: record.origin.clone(),
            net_mass: Some(whole("netMass", mass)?),
            quantity: Some(whole("quantityInSU", quantity)?),
            invoiced_amount: whole("invoicedAmount", amount)?,
            partner_id: record.vat_id.clone(),
            statistical_procedure_code: self.profile.statistical_procedure_code,
            nature_of_transaction: Some(NatureOfTransaction::new(nature.a, nature.b).map_err(|e| invalid(e.to_string()))?),
            mode_of_transport_code: Some(self.profile.mode_of_transport),
            region_code: Some(self.profile.region_code.clone()),
        };
        Item::new(fields).map_err(|e| invalid(format!("{:?}: {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::tests::sample_reference;
    use crate::declaration::FixedClock;
    use crate::models::InvoiceMetadata;
    use crate::readers::builtin_profiles;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn profile(company: &str) -> VendorProfile {
        builtin_profiles().into_iter().find(|p| p.company == company).unwrap()
    }

    fn record(page: u32, number: &str, description: &str, quantity: &str, net: &str) -> RawPageRecord {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let metadata = InvoiceMetadata::new(number, date).with_vat_id("ESB12345678");
        let mut record = RawPageRecord::from_metadata(page, &metadata);
        record.description = description.to_string();
        record.quantity = dec(quantity);
        record.unit_price = dec(net) / dec(quantity);
        record.net_amount = dec(net);
        record.destination = Some("ES".to_string());
        record.origin = Some("FR".to_string());
        record
    }

    #[test]
    fn test_single_invoice_end_to_end() {
        let reference = sample_reference();
        let profile = profile("DOLVIKA");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let assembly = assembler.assemble(&[record(1, "000123", "TSHIRT", "2", "100")]).unwrap();
        assert!(assembly.issues.is_empty());
        assert_eq!(assembly.declarations.len(), 1);

        let declaration = &assembly.declarations[0];
        assert_eq!(declaration.declaration_id(), "000123");
        assert_eq!(declaration.reference_period(), "2024-03");
        assert_eq!(declaration.psi_id(), "FR3451291046400019");

        let item = &declaration.items()[0];
        assert_eq!(item.item_number(), 1);
        assert_eq!(item.cn8().code(), Some("61091000"));
        assert_eq!(item.net_mass(), Some(1));
        assert_eq!(item.quantity(), Some(2));
        assert_eq!(item.invoiced_amount(), 100);
        assert_eq!(item.destination(), Some("ES"));
        assert_eq!(item.partner_id(), Some("ESB12345678"));
    }

    #[test]
    fn test_grouping_by_invoice_number() {
        let reference = sample_reference();
        let profile = profile("DOLVIKA");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let records = vec![
            record(1, "FA000300", "ROBE", "1", "40"),
            record(1, "FA000100", "TSHIRT", "3", "30"),
            record(2, "FA000100", "XYZ", "1", "10"),
            record(2, "FA000100", "PANTALON", "2", "70"),
            record(3, "FA000200", "TUNIQUE", "1", "25"),
        ];
        let assembly = assembler.assemble(&records).unwrap();

        let ids: Vec<&str> = assembly.declarations.iter().map(|d| d.declaration_id()).collect();
        assert_eq!(ids, vec!["000100", "000200", "000300"]);
        let items: usize = assembly.declarations.iter().map(|d| d.items().len()).sum();
        assert_eq!(items, 4);

        let numbers: Vec<u32> = assembly.declarations[0].items().iter().map(|i| i.item_number()).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(assembly.issues.len(), 1);
        assert_eq!(assembly.issues[0].page, 2);
        assert_eq!(assembly.issues[0].kind, PageIssueKind::UnresolvedArticle);
    }

    #[test]
    fn test_invoice_without_items_is_omitted() {
        let reference = sample_reference();
        let profile = profile("DOLVIKA");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let records = vec![record(1, "FA000001", "XYZ", "1", "10"), record(2, "FA000002", "ROBE", "1", "40")];
        let assembly = assembler.assemble(&records).unwrap();
        assert_eq!(assembly.declarations.len(), 1);
        assert_eq!(assembly.declarations[0].declaration_id(), "000002");
        assert_eq!(assembly.issues[0].page, 1);
    }

    #[test]
    fn test_discount_reduces_amount() {
        let reference = sample_reference();
        let profile = profile("Jessy & co");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let mut discounted = record(1, "000123", "ROBE", "3", "90");
        discounted.discount_percent = dec("10");
        let assembly = assembler.assemble(&[discounted]).unwrap();
        let declaration = &assembly.declarations[0];
        assert_eq!(declaration.declaration_id(), "202403");
        assert_eq!(declaration.items()[0].invoiced_amount(), 81);
        // 3 x 0.5 kg, half to even.
        assert_eq!(declaration.items()[0].net_mass(), Some(2));
    }

    #[test]
    fn test_invalid_items_are_dropped() {
        let reference = sample_reference();
        let profile = profile("Jessy & co");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let mut no_destination = record(1, "000123", "ROBE", "1", "40");
        no_destination.destination = None;
        let free = record(2, "000123", "TSHIRT", "1", "0");
        let assembly = assembler.assemble(&[no_destination, free]).unwrap();

        assert!(assembly.declarations.is_empty());
        let kinds: Vec<PageIssueKind> = assembly.issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![PageIssueKind::MissingMetadata, PageIssueKind::InvalidItem]);
    }

    #[test]
    fn test_amount_overflow_drops_item() {
        let reference = sample_reference();
        let profile = profile("Jessy & co");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let mut huge = record(3, "000123", "ROBE", "1", "40");
        huge.net_amount = Decimal::MAX;
        huge.discount_percent = dec("-100");
        let assembly = assembler.assemble(&[huge]).unwrap();

        assert!(assembly.declarations.is_empty());
        assert_eq!(assembly.issues.len(), 1);
        assert_eq!(assembly.issues[0].page, 3);
        assert_eq!(assembly.issues[0].kind, PageIssueKind::InvalidItem);
        assert!(assembly.issues[0].detail.contains("overflows"));
    }

    #[test]
    fn test_placeholder_party_uses_authorization_number() {
        let authorizations = BTreeMap::from([("MODE CMD".to_string(), "FR1234567890123456".to_string())]);
        let reference = sample_reference().with_authorizations(authorizations);
        let profile = profile("MODE CMD");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));
        assert_eq!(assembler.party_id(), "FR1234567890123456");

        let assembly = assembler.assemble(&[record(1, "FA000001", "ROBE", "1", "40")]).unwrap();
        assert_eq!(assembly.declarations[0].psi_id(), "FR1234567890123456");
        let instat = assembler.envelope(assembly.declarations).unwrap();
        assert_eq!(instat.envelope().party().party_id(), "FR1234567890123456");

        // A configured id wins over the workbook.
        let dolvika = self::profile("DOLVIKA");
        let assembler = DeclarationAssembler::new(&dolvika, ArticleResolver::new(&reference));
        assert_eq!(assembler.party_id(), "FR3451291046400019");

        // Without a workbook entry the placeholder stays.
        let bare = sample_reference();
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&bare));
        assert_eq!(assembler.party_id(), PLACEHOLDER_PARTY_ID);
    }

    #[test]
    fn test_null_invoice_number_aborts() {
        let reference = sample_reference();
        let profile = profile("DOLVIKA");
        let assembler = DeclarationAssembler::new(&profile, ArticleResolver::new(&reference));

        let mut orphan = record(4, "FA000001", "ROBE", "1", "40");
        orphan.invoice_number = None;
        let err = assembler.assemble(&[orphan]).unwrap_err();
        assert!(matches!(err, InstatError::NullInvoiceNumber { page: 4 }));
    }

    #[test]
    fn test_envelope_uses_clock() {
        let reference = sample_reference();
        let profile = profile("DOLVIKA");
        let at = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(10, 30, 0).unwrap();
        let assembler =
            DeclarationAssembler::new(&profile, ArticleResolver::new(&reference)).with_clock(Arc::new(FixedClock(at)));

        let instat = assembler.envelope(Vec::new()).unwrap();
        let envelope = instat.envelope();
        assert_eq!(envelope.envelope_id(), "S4FW");
        assert_eq!(envelope.date_time().date(), "2024-04-01");
        assert_eq!(envelope.date_time().time(), Some("10:30:00"));
        assert_eq!(envelope.party().party_name(), "DOLVIKA");
        assert!(envelope.declarations().is_empty());
    }
}
