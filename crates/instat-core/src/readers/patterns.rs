//! Common regex patterns for invoice layouts.

use lazy_static::lazy_static;
use regex::Regex;

use super::profile::{LineItemLayout, MetadataLayout, VatLocator, VendorProfile};
use crate::error::InstatError;

lazy_static! {
    /// `dd/mm/yyyy`
    pub static ref DATE_DMY: Regex = Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").unwrap();

    /// Leading letters of a VAT number (`FR`, `ESB`, `ATU`).
    pub static ref ALPHA_PREFIX: Regex = Regex::new(r"^[A-Za-z]+").unwrap();

    /// Bare five-digit identifiers are domestic.
    pub static ref FIVE_DIGITS: Regex = Regex::new(r"^[0-9]{5}$").unwrap();

    /// A word, optionally followed by one digit, in repaired descriptions.
    pub static ref REPAIR_WORD: Regex = Regex::new(r"\b[A-Za-z]+[0-9]?\b").unwrap();
}

/// The regexes of one vendor profile, compiled once per reader.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatterns {
    /// Invoice number and date in a title line.
    pub title: Option<Regex>,
    /// VAT number line in the address block.
    pub vat: Option<Regex>,
    /// One item row in a text-row layout.
    pub row: Option<Regex>,
    /// Words removed before descriptions are re-segmented.
    pub stripped_words: Option<Regex>,
    /// Rewrites applied before descriptions are re-segmented.
    pub repair_rewrites: Vec<(Regex, String)>,
}

fn compile(pattern: &str) -> Result<Regex, InstatError> {
    Regex::new(pattern).map_err(|e| InstatError::Config(format!("invalid pattern {:?}: {}", pattern, e)))
}

impl ProfilePatterns {
    pub fn compile(profile: &VendorProfile) -> Result<Self, InstatError> {
        let mut patterns = Self::default();
        match &profile.metadata {
            MetadataLayout::TitleLine { pattern, .. } => patterns.title = Some(compile(pattern)?),
            MetadataLayout::HeaderStrip {
                vat: VatLocator::Pattern { pattern },
                ..
            } => patterns.vat = Some(compile(pattern)?),
            _ => {}
        }
        if let LineItemLayout::TextRows { pattern, .. } = &profile.line_items {
            patterns.row = Some(compile(pattern)?);
        }

        let exceptions = &profile.exceptions;
        if !exceptions.repair_stripped_words.is_empty() {
            let words: Vec<String> = exceptions.repair_stripped_words.iter().map(|w| regex::escape(w)).collect();
            patterns.stripped_words = Some(compile(&format!(r"(?i)\b({})\b", words.join("|")))?);
        }
        for rewrite in &exceptions.repair_rewrites {
            patterns.repair_rewrites.push((compile(&rewrite.from)?, rewrite.to.clone()));
        }
        Ok(patterns)
    }
}
