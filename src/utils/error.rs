use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Column '{column}' not found in the {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error(
        "No sale price satisfies commission {commission_rate}, VAT {vat_rate} and {margin} (denominator {denominator})"
    )]
    InfeasibleMargin {
        commission_rate: f64,
        vat_rate: f64,
        margin: String,
        denominator: f64,
    },

    #[error("Could not read '{path}' as a table: {message}")]
    FileParse { path: String, message: String },

    #[error("Spreadsheet write error: {0}")]
    XlsxWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Calculation,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::FileParse { .. } | EtlError::CsvError(_) => ErrorCategory::Input,
            EtlError::ColumnNotFound { .. }
            | EtlError::MissingColumns { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::InfeasibleMargin { .. } => ErrorCategory::Calculation,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::XlsxWriteError(_)
            | EtlError::IoError(_)
            | EtlError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Data | ErrorCategory::Calculation => {
                ErrorSeverity::High
            }
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ColumnNotFound { table, .. } => format!(
                "Check the header row of the {}; column names must match exactly",
                table
            ),
            EtlError::MissingColumns { columns } => format!(
                "Add the columns {} to the input file or map them in the [batch] config section",
                columns.join(", ")
            ),
            EtlError::InfeasibleMargin { .. } => {
                "Lower the commission or the requested margin until they leave room for a sale price"
                    .to_string()
            }
            EtlError::ProcessingError { .. } => {
                "The sheet is larger than a worksheet can hold; split it and retry".to_string()
            }
            EtlError::FileParse { .. } | EtlError::CsvError(_) => {
                "Make sure the file is a valid .xlsx workbook or a .csv file with a header row"
                    .to_string()
            }
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Review the command line flags and the TOML config file".to_string()
            }
            EtlError::XlsxWriteError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input file could not be read: {}", self),
            ErrorCategory::Data => format!("Input data is incomplete: {}", self),
            ErrorCategory::Calculation => format!("Price cannot be computed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_names_table_and_column() {
        let err = EtlError::ColumnNotFound {
            table: "main file".to_string(),
            column: "EAN".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'EAN' not found in the main file");
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_missing_columns_lists_every_column() {
        let err = EtlError::MissingColumns {
            columns: vec!["Formato (L)".to_string(), "Prezzo netto".to_string()],
        };
        assert!(err.to_string().contains("Formato (L), Prezzo netto"));
        assert!(err.recovery_suggestion().contains("[batch]"));
    }

    #[test]
    fn test_config_errors_are_medium_severity() {
        let err = EtlError::InvalidConfigValueError {
            field: "pricing.vat_percent".to_string(),
            value: "122".to_string(),
            reason: "Value must be between 0 and 100".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }
}
