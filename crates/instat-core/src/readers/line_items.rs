//! Item table extraction.
//!
//! Ruled item tables on these invoices are two rows: a header and one body
//! row whose cells hold every item, one per line. Multi-line descriptions
//! and blank cells make the per-column line counts disagree, so the item
//! count is taken from an anchor column and the other columns are padded or
//! truncated to it.

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::patterns::{ProfilePatterns, REPAIR_WORD};
use super::profile::{ColumnRoles, ExceptionTables, LineItemLayout};
use super::Result;
use crate::error::ExtractionError;
use crate::pdf::{Page, PageExtractor, TableGrid};
use crate::readers::numbers::{parse_decimal, round_cents, round_units};

/// One item row read from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub article_code: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Option<Decimal>,
    pub net_amount: Decimal,
}

/// Drop table rows that are mostly empty.
///
/// A row is kept when more than `min_filled_ratio` of its cells hold text.
pub fn remove_empty_rows(table: TableGrid, min_filled_ratio: f64) -> TableGrid {
    table
        .into_iter()
        .filter(|row| {
            if row.is_empty() {
                return false;
            }
            let empty = row.iter().filter(|c| c.as_deref().is_none_or(str::is_empty)).count();
            let keep = (empty as f64) / (row.len() as f64) < 1.0 - min_filled_ratio;
            if !keep {
                debug!("Cleaned mostly empty row {:?}", row);
            }
            keep
        })
        .collect()
}

/// Pad with `"0"` or truncate to `len`. A column with no text at all is
/// treated as empty.
pub fn pad_or_truncate(mut values: Vec<String>, len: usize) -> Vec<String> {
    if values.iter().all(|v| v.is_empty()) {
        values.clear();
    }
    values.resize(len, "0".to_string());
    values
}

fn cell_lines(cell: Option<&Option<String>>) -> Vec<String> {
    match cell.and_then(|c| c.as_deref()) {
        Some(text) => text.split('\n').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Reads item rows for one vendor layout.
pub struct LineItemParser<'a> {
    layout: &'a LineItemLayout,
    exceptions: &'a ExceptionTables,
    patterns: &'a ProfilePatterns,
    extractor: &'a PageExtractor,
    epsilon: Decimal,
}

impl<'a> LineItemParser<'a> {
    pub fn new(
        layout: &'a LineItemLayout,
        exceptions: &'a ExceptionTables,
        patterns: &'a ProfilePatterns,
        extractor: &'a PageExtractor,
    ) -> Self {
        Self {
            layout,
            exceptions,
            patterns,
            extractor,
            epsilon: Decimal::new(5, 3),
        }
    }

    /// Largest accepted difference between a declared and a recomputed
    /// discount.
    pub fn with_epsilon(mut self, epsilon: Decimal) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Items of `page`; `tables` are the page's cleaned tables. An empty
    /// result means no item table was found.
    pub fn parse(&self, page: &Page, tables: &[TableGrid]) -> Result<Vec<LineItem>> {
        let items = match self.layout {
            LineItemLayout::ColumnTable {
                columns,
                anchor,
                roles,
                clean_descriptions,
                reconcile_discount,
                round_net_amount,
            } => {
                let Some(table) = tables.iter().find(|t| is_item_table(t, columns)) else {
                    debug!("No item table on page {}", page.number());
                    return Ok(Vec::new());
                };
                let rows = self.column_rows(&table[1], columns, anchor, roles, *clean_descriptions)?;
                let mut items = rows
                    .iter()
                    .map(|row| read_item(row, columns, roles))
                    .collect::<Result<Vec<_>>>()?;
                if *reconcile_discount {
                    self.reconcile(&items)?;
                }
                if *round_net_amount {
                    for item in &mut items {
                        item.net_amount = round_units(item.net_amount);
                    }
                }
                items
            }
            LineItemLayout::TextRows {
                region,
                columns,
                optional_column,
                roles,
                ..
            } => {
                let lines = self.extractor.extract_lines(page, *region);
                self.text_rows(&lines, columns, *optional_column)?
                    .iter()
                    .map(|row| read_item(row, columns, roles))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let dropped = &self.exceptions.dropped_designations;
        Ok(items
            .into_iter()
            .filter(|item| !dropped.contains(&item.description))
            .collect())
    }

    /// Split the body row into one row of cell values per item.
    fn column_rows(
        &self,
        body: &[Option<String>],
        columns: &[String],
        anchor: &str,
        roles: &ColumnRoles,
        clean_descriptions: bool,
    ) -> Result<Vec<Vec<String>>> {
        let anchor_index = columns
            .iter()
            .position(|c| c == anchor)
            .ok_or_else(|| ExtractionError::MissingAnchor(anchor.to_string()))?;
        let anchor_lines = cell_lines(body.get(anchor_index));
        if anchor_lines.iter().all(|l| l.trim().is_empty()) {
            return Err(ExtractionError::MissingAnchor(anchor.to_string()));
        }
        let count = anchor_lines.len();
        debug!("Number of items: {}", count);

        let mut values: Vec<Vec<String>> = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let lines = cell_lines(body.get(i));
            if clean_descriptions && *column == roles.description {
                values.push(self.clean_descriptions(lines, count)?);
            } else {
                values.push(pad_or_truncate(lines, count));
            }
        }

        Ok((0..count)
            .map(|row| values.iter().map(|column| column[row].clone()).collect())
            .collect())
    }

    fn clean_descriptions(&self, lines: Vec<String>, count: usize) -> Result<Vec<String>> {
        let easy = lines.len() == count;
        info!("Description lines match item count: {}", easy);

        let kept: Vec<String> = lines
            .into_iter()
            .filter(|l| !self.exceptions.noise_markers.iter().any(|m| l.contains(m.as_str())))
            .map(|l| {
                self.exceptions
                    .designation_rewrites
                    .iter()
                    .fold(l, |l, r| l.replace(r.from.as_str(), &r.to))
            })
            .collect();

        let descriptions = if easy {
            kept
        } else {
            repair_descriptions(&kept.join("\n"), self.patterns)
        };
        if descriptions.len() != count {
            return Err(ExtractionError::Shape(format!(
                "{} descriptions for {} items",
                descriptions.len(),
                count
            )));
        }
        Ok(descriptions)
    }

    fn text_rows(&self, lines: &[String], columns: &[String], optional: usize) -> Result<Vec<Vec<String>>> {
        let Some(pattern) = self.patterns.row.as_ref() else {
            return Ok(Vec::new());
        };
        let mut rows = Vec::new();
        for line in lines {
            let Some(designation) = pattern.captures(line).and_then(|c| c.get(2)) else {
                continue;
            };
            let joined = format!(
                "{}{}{}",
                &line[..designation.start()],
                designation.as_str().replace(' ', ""),
                &line[designation.end()..]
            );
            let mut tokens: Vec<String> = joined.split_whitespace().map(str::to_string).collect();
            if tokens.len() + 1 == columns.len() && optional <= tokens.len() {
                tokens.insert(optional, "0".to_string());
            }
            if tokens.len() != columns.len() {
                return Err(ExtractionError::Shape(format!(
                    "{} values for {} columns in {:?}",
                    tokens.len(),
                    columns.len(),
                    line
                )));
            }
            rows.push(tokens);
        }
        Ok(rows)
    }

    fn reconcile(&self, items: &[LineItem]) -> Result<()> {
        for (row, item) in items.iter().enumerate() {
            let Some(declared) = item.discount_amount else {
                continue;
            };
            let overflow = || ExtractionError::Overflow(format!("discount of row {}", row));
            let expected = item
                .quantity
                .checked_mul(item.unit_price)
                .and_then(|v| v.checked_mul(item.discount_percent))
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .map(round_cents)
                .ok_or_else(overflow)?;
            let difference = expected.checked_sub(declared).ok_or_else(overflow)?;
            if difference.abs() > self.epsilon {
                return Err(ExtractionError::Reconciliation {
                    row,
                    expected: expected.to_string(),
                    declared: declared.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A two-row table whose header equals `columns`.
fn is_item_table(table: &TableGrid, columns: &[String]) -> bool {
    table.len() == 2
        && table[0].len() == columns.len()
        && table[0]
            .iter()
            .zip(columns)
            .all(|(cell, column)| cell.as_deref() == Some(column.as_str()))
}

/// Re-segment descriptions word by word, after removing stripped words
/// and applying the rewrites.
pub fn repair_descriptions(text: &str, patterns: &ProfilePatterns) -> Vec<String> {
    let mut cleaned = match &patterns.stripped_words {
        Some(stripped) => stripped.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    for (pattern, replacement) in &patterns.repair_rewrites {
        cleaned = pattern.replace_all(&cleaned, replacement.as_str()).into_owned();
    }
    REPAIR_WORD.find_iter(&cleaned).map(|m| m.as_str().to_string()).collect()
}

fn read_item(row: &[String], columns: &[String], roles: &ColumnRoles) -> Result<LineItem> {
    let text = |column: &str| {
        columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    };
    let number = |column: &str| {
        let raw = text(column).ok_or_else(|| ExtractionError::MissingField(column.to_string()))?;
        parse_decimal(raw).ok_or_else(|| ExtractionError::Parse {
            field: column.to_string(),
            value: raw.to_string(),
        })
    };

    Ok(LineItem {
        article_code: roles
            .article_code
            .as_deref()
            .and_then(|c| text(c))
            .map(str::to_string),
        description: text(roles.description.as_str()).unwrap_or_default().trim().to_string(),
        quantity: number(roles.quantity.as_str())?,
        unit_price: number(roles.unit_price.as_str())?,
        discount_percent: match roles.discount_percent.as_deref() {
            Some(column) => number(column)?,
            None => Decimal::ZERO,
        },
        discount_amount: roles.discount_amount.as_deref().map(|c| number(c)).transpose()?,
        net_amount: number(roles.net_amount.as_str())?,
    })
}
