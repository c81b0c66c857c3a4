//! Document reading: one vendor profile applied to every page of a PDF.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::context::DocumentContext;
use super::countries::{code_for_name, vat_country};
use super::issue::{pages_to_double_check, PageIssue, PageIssueKind};
use super::line_items::{remove_empty_rows, LineItem, LineItemParser};
use super::metadata::{MetadataParser, PageHeader};
use super::patterns::ProfilePatterns;
use super::profile::{CountryRule, VendorProfile};
use crate::articles::ArticleResolver;
use crate::declaration::{Clock, DeclarationAssembler, SystemClock};
use crate::error::InstatError;
use crate::export::{write_csv, write_xlsx};
use crate::models::{ExtractionConfig, Instat, InstatConfig, InvoiceMetadata, RawPageRecord};
use crate::pdf::{self, Page, PageExtractor, PdfDocument, TableGrid};
use crate::xml::{validate_xml, write_xml, Schema, ValidationReport};

/// Which files a run writes, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub write_xml: bool,
    pub write_xlsx: bool,
    pub write_csv: bool,
    pub validate_xml: bool,
    /// External XSD; the bundled schema is used when absent.
    pub schema: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&InstatConfig::default())
    }
}

impl RunOptions {
    pub fn from_config(config: &InstatConfig) -> Self {
        Self {
            output_dir: config.output.directory.clone(),
            write_xml: config.output.write_xml,
            write_xlsx: config.output.write_xlsx,
            write_csv: config.output.write_csv,
            validate_xml: config.output.validate_xml,
            schema: config.schema.path.clone(),
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

/// Everything read from one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// Item rows of every accepted page, in page order.
    pub records: Vec<RawPageRecord>,
    pub instat: Instat,
    pub issues: Vec<PageIssue>,
}

impl DocumentOutcome {
    pub fn pages_to_double_check(&self) -> Vec<u32> {
        pages_to_double_check(&self.issues)
    }
}

/// Summary of one processed document.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub document: PathBuf,
    pub xml: Option<PathBuf>,
    pub xlsx: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub declarations: usize,
    pub items: usize,
    /// Schema check of the written XML, when enabled.
    pub validation: Option<ValidationReport>,
    pub issues: Vec<PageIssue>,
    pub pages_to_double_check: Vec<u32>,
    pub processing_time_ms: u64,
}

/// Reads invoice PDFs of one vendor into declarations.
pub struct InvoiceReader<'r> {
    profile: &'r VendorProfile,
    resolver: ArticleResolver<'r>,
    patterns: ProfilePatterns,
    extractor: PageExtractor,
    min_filled_ratio: f64,
    epsilon: Decimal,
    clock: Arc<dyn Clock>,
}

impl<'r> InvoiceReader<'r> {
    /// Fails when a profile pattern does not compile or the tolerances
    /// cannot be represented.
    pub fn new(
        profile: &'r VendorProfile,
        resolver: ArticleResolver<'r>,
        config: &ExtractionConfig,
    ) -> Result<Self, InstatError> {
        let epsilon = Decimal::try_from(config.reconciliation_epsilon).map_err(|e| {
            InstatError::Config(format!(
                "invalid reconciliation epsilon {}: {}",
                config.reconciliation_epsilon, e
            ))
        })?;
        Ok(Self {
            profile,
            resolver,
            patterns: ProfilePatterns::compile(profile)?,
            extractor: PageExtractor::from_config(config),
            min_filled_ratio: config.min_filled_ratio,
            epsilon,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn profile(&self) -> &VendorProfile {
        self.profile
    }

    /// The first page must name the declaring party.
    pub fn check_party(&self, first_page_text: &str) -> Result<(), InstatError> {
        let party = &self.profile.party.name;
        if first_page_text.contains(party.as_str()) {
            Ok(())
        } else {
            Err(InstatError::WrongDocument {
                party: party.clone(),
                page: 1,
            })
        }
    }

    /// Read every page of `document`.
    pub fn read(&self, document: &PdfDocument) -> Result<DocumentOutcome, InstatError> {
        let first = document.page(1)?;
        let mut text = first.text();
        if text.trim().is_empty() {
            debug!("No glyph text on page 1, falling back to full text extraction");
            text = document.extract_text()?;
        }
        self.check_party(&text)?;

        let rest = (2..=document.page_count()).map(|n| document.page(n));
        self.read_pages(std::iter::once(Ok(first)).chain(rest))
    }

    /// Read `pages` in order. A page that fails is put on the double-check
    /// list and the loop moves on.
    pub fn read_pages<I>(&self, pages: I) -> Result<DocumentOutcome, InstatError>
    where
        I: IntoIterator<Item = pdf::Result<Page>>,
    {
        let mut ctx = DocumentContext::new();
        let mut records = Vec::new();

        for (index, page) in pages.into_iter().enumerate() {
            let number = index as u32 + 1;
            info!("Processing page {}", number);
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    ctx.flag(PageIssue::new(number, PageIssueKind::Extraction, e.to_string()));
                    continue;
                }
            };
            match self.read_page(&page, &mut ctx) {
                Ok(page_records) => records.extend(page_records),
                Err(issue) => ctx.flag(issue),
            }
        }

        let assembler = DeclarationAssembler::new(self.profile, self.resolver).with_clock(self.clock.clone());
        let assembly = assembler.assemble(&records)?;
        for issue in assembly.issues {
            ctx.flag(issue);
        }
        let instat = assembler.envelope(assembly.declarations)?;

        let double_check = ctx.pages_to_double_check();
        if !double_check.is_empty() {
            warn!("Pages to double check: {:?}", double_check);
        }
        Ok(DocumentOutcome {
            records,
            instat,
            issues: ctx.into_issues(),
        })
    }

    fn read_page(&self, page: &Page, ctx: &mut DocumentContext) -> Result<Vec<RawPageRecord>, PageIssue> {
        let number = page.number();
        let failed = |e| PageIssue::from_error(number, &e);

        let tables: Vec<TableGrid> = self
            .extractor
            .extract_tables(page, None)
            .into_iter()
            .map(|t| remove_empty_rows(t, self.min_filled_ratio))
            .collect();
        debug!("Page {} has {} tables", number, tables.len());

        let profile = self.profile;
        let header = MetadataParser::new(&profile.metadata, &profile.exceptions, &self.patterns, &self.extractor)
            .parse(page, &tables)
            .map_err(failed)?;
        let metadata = match header {
            PageHeader::Invoice(metadata) => ctx.remember(metadata),
            PageHeader::Continuation(claimed) => ctx.continuation(&claimed).map_err(failed)?,
        };
        self.check_page(number, &metadata)?;

        let items = LineItemParser::new(&profile.line_items, &profile.exceptions, &self.patterns, &self.extractor)
            .with_epsilon(self.epsilon)
            .parse(page, &tables)
            .map_err(failed)?;
        if items.is_empty() {
            return Err(PageIssue::new(number, PageIssueKind::EmptyTable, "no item rows"));
        }

        let destination = self.country(&profile.destination, &metadata);
        let origin = self.country(&profile.origin, &metadata);
        if destination.is_none() {
            ctx.flag(PageIssue::new(
                number,
                PageIssueKind::MissingMetadata,
                format!("no destination country for {:?}", metadata.country),
            ));
        }
        Ok(items
            .into_iter()
            .map(|item| record(number, &metadata, item, &destination, &origin))
            .collect())
    }

    /// Vendor rules on the counterparty of a page.
    fn check_page(&self, number: u32, metadata: &InvoiceMetadata) -> Result<(), PageIssue> {
        let exceptions = &self.profile.exceptions;
        if let Some(min) = exceptions.min_vat_len {
            let long_enough = metadata.vat_id.as_deref().is_some_and(|v| v.chars().count() >= min);
            if !long_enough {
                return Err(PageIssue::new(
                    number,
                    PageIssueKind::Rejected,
                    format!("VAT id {:?} is missing or shorter than {}", metadata.vat_id, min),
                ));
            }
        }
        if let Some(country) = metadata.country.as_deref() {
            if let Some(prefix) = exceptions
                .excluded_destinations
                .iter()
                .find(|p| country.starts_with(p.as_str()))
            {
                return Err(PageIssue::new(
                    number,
                    PageIssueKind::Rejected,
                    format!("destination {} is excluded ({})", country, prefix),
                ));
            }
        }
        Ok(())
    }

    fn country(&self, rule: &CountryRule, metadata: &InvoiceMetadata) -> Option<String> {
        match rule {
            CountryRule::Fixed { code } => Some(code.clone()),
            CountryRule::CountryName { prefix_fallback } => metadata
                .country
                .as_deref()
                .and_then(|name| self.country_from_name(name, *prefix_fallback)),
            CountryRule::VatPrefix { country_fallback } => match metadata.vat_id.as_deref() {
                Some(vat) => vat_country(vat, &self.profile.exceptions.vat_prefix_overrides),
                None if *country_fallback => metadata
                    .country
                    .as_deref()
                    .and_then(|name| self.country_from_name(name, false)),
                None => None,
            },
        }
    }

    fn country_from_name(&self, name: &str, prefix_fallback: bool) -> Option<String> {
        let name = name.trim();
        if let Some(o) = self
            .profile
            .exceptions
            .country_overrides
            .iter()
            .find(|o| o.from.to_lowercase() == name.to_lowercase())
        {
            return Some(o.to.clone());
        }
        let code = code_for_name(name).or_else(|| name.split_whitespace().next().and_then(code_for_name));
        match code {
            Some(code) => Some(code.to_string()),
            None if prefix_fallback => {
                let prefix: String = name.chars().take(2).collect::<String>().to_uppercase();
                (prefix.chars().count() == 2).then_some(prefix)
            }
            None => None,
        }
    }

    /// Read `pdf_path` and write its output files under the output
    /// directory, named after the document.
    pub fn run(&self, pdf_path: &Path, options: &RunOptions) -> Result<RunReport, InstatError> {
        let start = Instant::now();
        info!("Processing {} as {}", pdf_path.display(), self.profile.company);

        let document = PdfDocument::open(pdf_path)?;
        let outcome = self.read(&document)?;

        std::fs::create_dir_all(&options.output_dir)?;
        let stem = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "declarations".to_string());

        let declarations = outcome.instat.envelope().declarations();
        let mut report = RunReport {
            document: pdf_path.to_path_buf(),
            xml: None,
            xlsx: None,
            csv: None,
            declarations: declarations.len(),
            items: declarations.iter().map(|d| d.items().len()).sum(),
            validation: None,
            issues: Vec::new(),
            pages_to_double_check: outcome.pages_to_double_check(),
            processing_time_ms: 0,
        };

        if self.profile.produce_xml && options.write_xml {
            let path = options.output_dir.join(format!("{}.xml", stem));
            write_xml(&path, &outcome.instat, &self.profile.party_tag)?;
            if options.validate_xml {
                let schema = match &options.schema {
                    Some(schema) => Schema::from_file(schema)?,
                    None => Schema::instat()?,
                };
                let written = std::fs::read_to_string(&path)?;
                let validation = validate_xml(&written, &schema);
                for violation in &validation.violations {
                    warn!("Schema violation in {}: {}", path.display(), violation);
                }
                report.validation = Some(validation);
            }
            report.xml = Some(path);
        }
        if options.write_xlsx {
            let path = options.output_dir.join(format!("{}.xlsx", stem));
            write_xlsx(&path, &outcome.instat, &outcome.records)?;
            report.xlsx = Some(path);
        }
        if options.write_csv {
            let path = options.output_dir.join(format!("{}.csv", stem));
            write_csv(&path, &outcome.instat)?;
            report.csv = Some(path);
        }

        report.issues = outcome.issues;
        report.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: {} declarations, {} items in {} ms",
            pdf_path.display(),
            report.declarations,
            report.items,
            report.processing_time_ms
        );
        Ok(report)
    }
}

fn record(
    page: u32,
    metadata: &InvoiceMetadata,
    item: LineItem,
    destination: &Option<String>,
    origin: &Option<String>,
) -> RawPageRecord {
    RawPageRecord {
        article_code: item.article_code,
        description: item.description,
        quantity: item.quantity,
        unit_price: item.unit_price,
        discount_percent: item.discount_percent,
        discount_amount: item.discount_amount,
        net_amount: item.net_amount,
        destination: destination.clone(),
        origin: origin.clone(),
        ..RawPageRecord::from_metadata(page, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::tests::sample_reference;
    use crate::articles::ArticleReference;
    use crate::declaration::FixedClock;
    use crate::error::PdfError;
    use crate::pdf::page::tests::glyph_run;
    use crate::pdf::Glyph;
    use crate::readers::builtin_profiles;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn profile(company: &str) -> VendorProfile {
        builtin_profiles().into_iter().find(|p| p.company == company).unwrap()
    }

    fn reader<'r>(profile: &'r VendorProfile, reference: &'r ArticleReference) -> InvoiceReader<'r> {
        let at = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap().and_hms_opt(10, 30, 0).unwrap();
        InvoiceReader::new(profile, ArticleResolver::new(reference), &ExtractionConfig::default())
            .unwrap()
            .with_clock(Arc::new(FixedClock(at)))
    }

    /// Title, address block and item rows of a DOLVIKA invoice page.
    fn dolvika_glyphs(title: &str, country: &str, vat: Option<&str>, rows: &[&str]) -> Vec<Glyph> {
        let mut glyphs = glyph_run("DOLVIKA", 20.0, 30.0);
        glyphs.extend(glyph_run("FACTURE", 20.0, 215.0));
        glyphs.extend(glyph_run(title, 20.0, 230.0));
        glyphs.extend(glyph_run(country, 320.0, 150.0));
        if let Some(vat) = vat {
            glyphs.extend(glyph_run(&format!("N° TVA : {}", vat), 320.0, 170.0));
        }
        for (i, row) in rows.iter().enumerate() {
            glyphs.extend(glyph_run(row, 20.0, 340.0 + 20.0 * i as f64));
        }
        glyphs
    }

    fn page(number: u32, glyphs: Vec<Glyph>) -> pdf::Result<Page> {
        Ok(Page::new(number, 595.0, 842.0, glyphs, vec![]))
    }

    const ROWS: [&str; 2] = [
        "1234 ROBE 2,00 25,00 50,00 20,00",
        "5678 TSHIRT 1,00 40,00 10,00 36,00 20,00",
    ];

    #[test]
    fn test_check_party() {
        let profile = profile("DOLVIKA");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);
        assert!(reader.check_party("FACTURE\nDOLVIKA SAS\n12 rue").is_ok());

        let err = reader.check_party("IVIVI").unwrap_err();
        assert!(matches!(err, InstatError::WrongDocument { ref party, page: 1 } if party == "DOLVIKA"));
        // Case matters.
        assert!(reader.check_party("Dolvika").is_err());
    }

    #[test]
    fn test_read_single_page() {
        let profile = profile("DOLVIKA");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);
        let glyphs = dolvika_glyphs("FA 2024 0042 15/03/2024", "ESPAGNE 28001", Some("ES12345678"), &ROWS);

        let outcome = reader.read_pages(vec![page(1, glyphs)]).unwrap();
        assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].invoice_number.as_deref(), Some("FA20240042"));
        assert_eq!(outcome.records[0].destination.as_deref(), Some("ES"));
        assert_eq!(outcome.records[0].origin.as_deref(), Some("FR"));

        let envelope = outcome.instat.envelope();
        assert_eq!(envelope.envelope_id(), "S4FW");
        assert_eq!(envelope.date_time().date(), "2024-04-02");
        let declaration = &envelope.declarations()[0];
        assert_eq!(declaration.declaration_id(), "240042");
        assert_eq!(declaration.reference_period(), "2024-03");

        let items = declaration.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].cn8().code(), Some("62044200"));
        assert_eq!(items[0].invoiced_amount(), 50);
        assert_eq!(items[0].net_mass(), Some(1));
        assert_eq!(items[0].partner_id(), Some("ES12345678"));
        assert_eq!(items[1].item_number(), 2);
        assert_eq!(items[1].invoiced_amount(), 36);
    }

    #[test]
    fn test_failing_pages_are_flagged() {
        let mut profile = profile("DOLVIKA");
        profile.exceptions.excluded_destinations = vec!["FR".to_string()];
        profile.exceptions.min_vat_len = Some(4);
        let reference = sample_reference();
        let reader = reader(&profile, &reference);

        let pages = vec![
            page(1, dolvika_glyphs("FA 000001 15/03/2024", "ESPAGNE", Some("ES12345678"), &ROWS)),
            page(2, dolvika_glyphs("FA 000002 15/03/2024", "FRANCE 75008", Some("FR12345678"), &ROWS)),
            page(3, dolvika_glyphs("FA 000003 15/03/2024", "ITALIE", None, &ROWS)),
            page(4, glyph_run("DOLVIKA", 20.0, 30.0)),
            Err(PdfError::InvalidPage(5)),
            page(6, dolvika_glyphs("FA 000006 15/03/2024", "ITALIE", Some("IT123456"), &[])),
        ];
        let outcome = reader.read_pages(pages).unwrap();

        assert_eq!(outcome.pages_to_double_check(), vec![2, 3, 4, 5, 6]);
        let kinds: Vec<(u32, PageIssueKind)> = outcome.issues.iter().map(|i| (i.page, i.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (2, PageIssueKind::Rejected),
                (3, PageIssueKind::Rejected),
                (4, PageIssueKind::MissingMetadata),
                (5, PageIssueKind::Extraction),
                (6, PageIssueKind::EmptyTable),
            ]
        );
        assert_eq!(outcome.instat.envelope().declarations().len(), 1);
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_unresolved_articles_flag_their_page() {
        let profile = profile("DOLVIKA");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);
        let rows = ["1234 ROBE 2,00 25,00 50,00 20,00", "9999 ZZZZ 1,00 40,00 40,00 20,00"];

        let outcome = reader
            .read_pages(vec![page(1, dolvika_glyphs("FA 000001 15/03/2024", "ESPAGNE", Some("ES1234"), &rows))])
            .unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, PageIssueKind::UnresolvedArticle);
        assert_eq!(outcome.instat.envelope().declarations()[0].items().len(), 1);
    }

    #[test]
    fn test_non_numeric_declaration_id_flags_pages() {
        let profile = profile("DOLVIKA");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);

        let pages = vec![
            page(1, dolvika_glyphs("FA 0001 15/03/2024", "ESPAGNE", Some("ES12345678"), &ROWS)),
            page(2, dolvika_glyphs("FA 000002 15/03/2024", "ITALIE", Some("IT123456"), &ROWS)),
        ];
        let outcome = reader.read_pages(pages).unwrap();

        assert_eq!(outcome.pages_to_double_check(), vec![1]);
        assert_eq!(outcome.issues[0].kind, PageIssueKind::InvalidDeclaration);
        assert!(outcome.issues[0].detail.contains("FA0001"));
        let ids: Vec<&str> = outcome
            .instat
            .envelope()
            .declarations()
            .iter()
            .map(|d| d.declaration_id())
            .collect();
        assert_eq!(ids, vec!["000002"]);
    }

    #[test]
    fn test_unknown_destination_flags_page() {
        let profile = profile("DOLVIKA");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);

        let pages = vec![
            page(1, dolvika_glyphs("FA 000001 15/03/2024", "ATLANTIS 101", Some("XX1234"), &ROWS)),
            page(2, dolvika_glyphs("FA 000002 15/03/2024", "ISLANDE 101", Some("IS1234"), &ROWS)),
        ];
        let outcome = reader.read_pages(pages).unwrap();

        assert_eq!(outcome.pages_to_double_check(), vec![1]);
        assert_eq!(outcome.issues[0].kind, PageIssueKind::MissingMetadata);
        assert!(outcome.issues[0].detail.contains("destination"));
        assert_eq!(outcome.records[0].destination, None);
        assert_eq!(outcome.records[2].destination.as_deref(), Some("IS"));
    }

    #[test]
    fn test_country_rules() {
        let reference = sample_reference();
        let metadata = InvoiceMetadata::new("FA1", NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let jessy = profile("Jessy & co");
        let reader = reader(&jessy, &reference);
        let with_vat = metadata.clone().with_vat_id("ESB12345678").with_country("ITALIE");
        assert_eq!(reader.country(&jessy.destination, &with_vat).as_deref(), Some("ES"));
        let without_vat = metadata.clone().with_country("Suisse");
        assert_eq!(reader.country(&jessy.destination, &without_vat).as_deref(), Some("CH"));
        assert_eq!(reader.country(&jessy.origin, &without_vat).as_deref(), Some("IT"));

        let rule = CountryRule::CountryName { prefix_fallback: true };
        let unknown = metadata.clone().with_country("Atlantis");
        assert_eq!(reader.country(&rule, &unknown).as_deref(), Some("AT"));
        let rule = CountryRule::CountryName { prefix_fallback: false };
        assert_eq!(reader.country(&rule, &unknown), None);
    }

    #[test]
    fn test_run_writes_outputs() {
        use crate::pdf::document::tests::sample_pdf;
        use lopdf::content::Operation;
        use lopdf::{Object, StringFormat};

        fn text(x: i64, top: i64, bytes: &[u8]) -> Vec<Operation> {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                // Glyph tops sit 8 points above the baseline.
                Operation::new("Td", vec![x.into(), (842 - 8 - top).into()]),
                Operation::new("Tj", vec![Object::String(bytes.to_vec(), StringFormat::Literal)]),
                Operation::new("ET", vec![]),
            ]
        }

        let mut operations = text(20, 30, b"DOLVIKA");
        operations.extend(text(20, 215, b"FACTURE"));
        operations.extend(text(20, 230, b"FA 2024 0042 15/03/2024"));
        operations.extend(text(320, 150, b"ESPAGNE 28001"));
        operations.extend(text(320, 170, b"N\xb0 TVA : ES12345678"));
        operations.extend(text(20, 340, ROWS[0].as_bytes()));
        operations.extend(text(20, 360, ROWS[1].as_bytes()));

        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("march.pdf");
        std::fs::write(&pdf_path, sample_pdf(operations)).unwrap();

        let profile = profile("DOLVIKA");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);
        let mut options = RunOptions::default().with_output_dir(dir.path().join("out"));
        options.write_csv = true;

        let report = reader.run(&pdf_path, &options).unwrap();
        assert_eq!(report.declarations, 1);
        assert_eq!(report.items, 2);
        assert!(report.pages_to_double_check.is_empty());
        assert!(report.validation.as_ref().unwrap().is_valid());

        let xml_path = report.xml.unwrap();
        assert_eq!(xml_path, dir.path().join("out").join("march.xml"));
        let xml = std::fs::read_to_string(&xml_path).unwrap();
        assert!(xml.contains("<envelopeId>S4FW</envelopeId>"));
        assert!(xml.contains("<declarationId>240042</declarationId>"));
        assert!(report.xlsx.unwrap().exists());
        assert!(report.csv.unwrap().exists());
    }

    #[test]
    fn test_run_rejects_wrong_document() {
        let profile = profile("IVIVI");
        let reference = sample_reference();
        let reader = reader(&profile, &reference);

        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("other.pdf");
        let data = crate::pdf::document::tests::sample_pdf(vec![
            lopdf::content::Operation::new("BT", vec![]),
            lopdf::content::Operation::new("Tf", vec!["F1".into(), 10.into()]),
            lopdf::content::Operation::new("Td", vec![20.into(), 800.into()]),
            lopdf::content::Operation::new("Tj", vec![lopdf::Object::string_literal("DOLVIKA")]),
            lopdf::content::Operation::new("ET", vec![]),
        ]);
        std::fs::write(&pdf_path, data).unwrap();

        let options = RunOptions::default().with_output_dir(dir.path().join("out"));
        let err = reader.run(&pdf_path, &options).unwrap_err();
        assert!(matches!(err, InstatError::WrongDocument { .. }));
        assert!(!dir.path().join("out").exists());
    }
}
