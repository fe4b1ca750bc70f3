use thiserror::Error;

/// Failures raised while loading or validating reference data. Pipeline
/// stages never surface these to the customer; they exist for startup
/// checks and operator diagnostics.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("could not read data file `{path}`: {reason}")]
    DataFileRead { path: String, reason: String },
    #[error("could not parse data file `{path}` (line {line}): {reason}")]
    DataFileParse { path: String, line: usize, reason: String },
    #[error("data file `{path}` is empty")]
    EmptyDataFile { path: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn operator_summary(&self) -> &'static str {
        match self {
            Self::DataFileRead { .. } => "a reference data file could not be read",
            Self::DataFileParse { .. } => "a reference data file is malformed",
            Self::EmptyDataFile { .. } => "a reference data file has no usable rows",
            Self::InvariantViolation(_) => "a domain invariant was violated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DomainError;

    #[test]
    fn read_failure_names_the_path() {
        let error = DomainError::DataFileRead {
            path: "data/products.jsonl".to_owned(),
            reason: "No such file or directory".to_owned(),
        };

        let rendered = error.to_string();
        assert!(rendered.contains("data/products.jsonl"), "message should name the file");
        assert_eq!(error.operator_summary(), "a reference data file could not be read");
    }

    #[test]
    fn parse_failure_names_the_line() {
        let error = DomainError::DataFileParse {
            path: "data/popularity_recommendation.csv".to_owned(),
            line: 7,
            reason: "expected 3 columns, found 2".to_owned(),
        };

        assert!(error.to_string().contains("line 7"));
    }
}
