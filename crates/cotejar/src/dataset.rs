//! Dataset codecs: sorted-order CSV files, the ranked-results CSV, and
//! their load/save plumbing.
//!
//! All tabular files are plain comma-separated text written and parsed
//! here directly. The sorted format is one header row carrying the
//! reference order, then one row per (category, transformation) pair.

use crate::aggregate::RankedDataset;
use crate::level::{Level, PairKey, SUBFIELD_DELIM};
use crate::result::{CotejarError, CotejarResult};
use std::path::Path;

/// Label cell of a sorted file's header row
const SORTED_HEADER_LABEL: &str = "CATEGORY#TRANSFORMATION";

/// Header row of the ranked-results file
const RANKED_HEADER: &str = "AGENT,CATEGORY,TRANSFORMATION,spearman_rank,p_value";

/// One data row of a sorted file: a pair and its ordering tokens
/// (level numbers for metric data, symbols for raw human data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedRow {
    /// The pair this ordering belongs to
    pub key: PairKey,
    /// Per-position tokens, most similar first
    pub tokens: Vec<String>,
}

impl SortedRow {
    /// Interpret the tokens as levels.
    ///
    /// # Errors
    ///
    /// Propagates level-parse failures.
    pub fn levels(&self) -> CotejarResult<Vec<Level>> {
        self.tokens.iter().map(|t| t.parse()).collect()
    }

    /// Interpret the tokens as single-character symbols.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::Parse`] for a multi-character token.
    pub fn symbols(&self) -> CotejarResult<Vec<char>> {
        self.tokens
            .iter()
            .map(|t| {
                let mut chars = t.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(CotejarError::Parse {
                        message: format!("'{t}' is not a single symbol"),
                    }),
                }
            })
            .collect()
    }
}

/// A sorted dataset: the reference order plus one ordering row per pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedDataset {
    reference: Vec<String>,
    rows: Vec<SortedRow>,
}

/// A parsed sorted file: the well-formed rows, and the row errors the
/// parse collected instead of aborting on.
#[derive(Debug)]
pub struct ParsedSorted {
    /// The well-formed part of the file
    pub dataset: SortedDataset,
    /// Malformed rows, one error per offending line
    pub malformed: Vec<CotejarError>,
}

impl SortedDataset {
    /// Dataset with the standard reference order of `n` levels
    #[must_use]
    pub fn with_standard_reference(n: usize) -> Self {
        Self {
            reference: crate::level::standard_order(n)
                .iter()
                .map(Level::to_string)
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Dataset with an explicit reference header
    #[must_use]
    pub fn with_reference(reference: Vec<String>) -> Self {
        Self {
            reference,
            rows: Vec::new(),
        }
    }

    /// The reference tokens from the header row
    #[must_use]
    pub fn reference(&self) -> &[String] {
        &self.reference
    }

    /// The reference order parsed as levels.
    ///
    /// # Errors
    ///
    /// Propagates level-parse failures for a symbol header.
    pub fn reference_levels(&self) -> CotejarResult<Vec<Level>> {
        self.reference.iter().map(|t| t.parse()).collect()
    }

    /// Data rows in file order
    #[must_use]
    pub fn rows(&self) -> &[SortedRow] {
        &self.rows
    }

    /// Append a level-ordering row
    pub fn push_levels(&mut self, key: PairKey, order: &[Level]) {
        self.rows.push(SortedRow {
            key,
            tokens: order.iter().map(Level::to_string).collect(),
        });
    }

    /// Append a symbol-ordering row
    pub fn push_symbols(&mut self, key: PairKey, symbols: &[char]) {
        self.rows.push(SortedRow {
            key,
            tokens: symbols.iter().map(char::to_string).collect(),
        });
    }

    /// Render the dataset as CSV text
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(SORTED_HEADER_LABEL);
        for token in &self.reference {
            out.push(',');
            out.push_str(token);
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.key.to_string());
            for token in &row.tokens {
                out.push(',');
                out.push_str(token);
            }
            out.push('\n');
        }
        out
    }

    /// Parse CSV text, keeping well-formed rows and collecting malformed
    /// ones (bad key, wrong arity) as row errors.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::Parse`] only when the header row itself
    /// is missing or empty.
    pub fn parse(text: &str) -> CotejarResult<ParsedSorted> {
        let mut lines = text.lines().enumerate();
        let header = lines
            .next()
            .map(|(_, line)| line)
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| CotejarError::Parse {
                message: "sorted file has no header row".to_string(),
            })?;
        let reference: Vec<String> = header
            .split(',')
            .skip(1)
            .map(str::to_string)
            .collect();
        if reference.is_empty() {
            return Err(CotejarError::Parse {
                message: "sorted file header carries no reference order".to_string(),
            });
        }

        let mut dataset = Self {
            reference,
            rows: Vec::new(),
        };
        let mut malformed = Vec::new();
        for (index, raw) in lines {
            if raw.trim().is_empty() {
                continue;
            }
            let line = index + 1;
            let mut cells = raw.split(',');
            // split always yields at least one cell
            let key_cell = cells.next().unwrap_or_default();
            let key: PairKey = match key_cell.parse() {
                Ok(key) => key,
                Err(error) => {
                    malformed.push(CotejarError::MalformedRow {
                        line,
                        message: error.to_string(),
                    });
                    continue;
                }
            };
            let tokens: Vec<String> = cells.map(str::to_string).collect();
            if tokens.len() != dataset.reference.len() {
                malformed.push(CotejarError::MalformedRow {
                    line,
                    message: format!(
                        "expected {} ordering cells, found {}",
                        dataset.reference.len(),
                        tokens.len()
                    ),
                });
                continue;
            }
            dataset.rows.push(SortedRow { key, tokens });
        }
        Ok(ParsedSorted { dataset, malformed })
    }

    /// Load and parse a sorted file.
    ///
    /// # Errors
    ///
    /// Propagates I/O and header-parse failures.
    pub fn load(path: &Path) -> CotejarResult<ParsedSorted> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Write the dataset to a CSV file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    pub fn save(&self, path: &Path) -> CotejarResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_csv())?;
        Ok(())
    }
}

/// Render a ranked dataset as CSV text, coefficients and p-values rounded
/// to three decimals.
#[must_use]
pub fn ranked_to_csv(dataset: &RankedDataset) -> String {
    let mut out = String::new();
    out.push_str(RANKED_HEADER);
    out.push('\n');
    for record in dataset.records() {
        out.push_str(&format!(
            "{},{},{},{:.3},{:.3}\n",
            record.agent,
            record.key.category,
            record.key.transformation,
            record.coefficient,
            record.p_value
        ));
    }
    out
}

/// Write a ranked dataset to a CSV file, creating parent directories.
///
/// # Errors
///
/// Propagates I/O failures.
pub fn save_ranked(dataset: &RankedDataset, path: &Path) -> CotejarResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, ranked_to_csv(dataset))?;
    Ok(())
}

/// `true` when the delimiter-bearing key format can represent this name
/// (no delimiter or comma inside a category or transformation name).
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SUBFIELD_DELIM) && !name.contains(',')
}
