use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const POPULARITY_HEADER: &str = "product,product_category,number_of_transactions";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AprioriCandidate {
    pub product: String,
    pub product_category: String,
    pub confidence: f64,
}

/// Product name to ranked co-purchase candidates, loaded from a JSON
/// object file.
#[derive(Clone, Debug, Default)]
pub struct AprioriTable {
    by_product: HashMap<String, Vec<AprioriCandidate>>,
}

impl AprioriTable {
    pub fn new(by_product: HashMap<String, Vec<AprioriCandidate>>) -> Self {
        Self { by_product }
    }

    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let raw = fs::read_to_string(path).map_err(|source| DomainError::DataFileRead {
            path: path.display().to_string(),
            reason: source.to_string(),
        })?;

        let by_product: HashMap<String, Vec<AprioriCandidate>> = serde_json::from_str(&raw)
            .map_err(|source| DomainError::DataFileParse {
                path: path.display().to_string(),
                line: source.line(),
                reason: source.to_string(),
            })?;

        if by_product.is_empty() {
            return Err(DomainError::EmptyDataFile { path: path.display().to_string() });
        }

        Ok(Self { by_product })
    }

    /// Candidates associated with a product, in table order. Unknown
    /// products yield an empty slice, never an error.
    pub fn candidates_for(&self, product: &str) -> &[AprioriCandidate] {
        self.by_product.get(product).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_product.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_product.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityRow {
    pub product: String,
    pub product_category: String,
    pub number_of_transactions: u64,
}

/// Aggregate transaction counts per product, loaded from a small CSV with
/// a fixed three-column header.
#[derive(Clone, Debug, Default)]
pub struct PopularityTable {
    rows: Vec<PopularityRow>,
}

impl PopularityTable {
    pub fn new(rows: Vec<PopularityRow>) -> Self {
        Self { rows }
    }

    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let raw = fs::read_to_string(path).map_err(|source| DomainError::DataFileRead {
            path: path.display().to_string(),
            reason: source.to_string(),
        })?;

        let mut rows = Vec::new();
        let mut saw_header = false;
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if !saw_header {
                if line != POPULARITY_HEADER {
                    return Err(DomainError::DataFileParse {
                        path: path.display().to_string(),
                        line: index + 1,
                        reason: format!("expected header `{POPULARITY_HEADER}`, found `{line}`"),
                    });
                }
                saw_header = true;
                continue;
            }

            rows.push(parse_popularity_row(path, index + 1, line)?);
        }

        if rows.is_empty() {
            return Err(DomainError::EmptyDataFile { path: path.display().to_string() });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PopularityRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Product names in table order.
    pub fn products(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.product.as_str()).collect()
    }

    /// Distinct category names in stable alphabetical order.
    pub fn categories(&self) -> Vec<&str> {
        let unique: BTreeSet<&str> =
            self.rows.iter().map(|row| row.product_category.as_str()).collect();
        unique.into_iter().collect()
    }
}

fn parse_popularity_row(path: &Path, line: usize, raw: &str) -> Result<PopularityRow, DomainError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(DomainError::DataFileParse {
            path: path.display().to_string(),
            line,
            reason: format!("expected 3 columns, found {}", parts.len()),
        });
    }

    let number_of_transactions =
        parts[2].parse::<u64>().map_err(|_| DomainError::DataFileParse {
            path: path.display().to_string(),
            line,
            reason: format!("invalid transaction count `{}`", parts[2]),
        })?;

    Ok(PopularityRow {
        product: parts[0].to_owned(),
        product_category: parts[1].to_owned(),
        number_of_transactions,
    })
}
