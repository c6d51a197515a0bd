use std::fmt;

/// Errors from the XML document layer
#[derive(Debug)]
pub enum DocumentError {
    Io(std::io::Error),
    Xml(String),
    MissingElement { tag: String },
    InvalidNumber { tag: String, text: String },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Io(e) => write!(f, "io error: {e}"),
            DocumentError::Xml(msg) => write!(f, "malformed xml: {msg}"),
            DocumentError::MissingElement { tag } => {
                write!(f, "element <{tag}> not found")
            }
            DocumentError::InvalidNumber { tag, text } => {
                write!(f, "element <{tag}> does not contain a number: {text:?}")
            }
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DocumentError {
    fn from(e: std::io::Error) -> Self {
        DocumentError::Io(e)
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(e: quick_xml::Error) -> Self {
        DocumentError::Xml(e.to_string())
    }
}

/// Errors raised while loading or saving a matrix file
#[derive(Debug)]
pub enum ConfigurationError {
    /// The file declares no dimensions; a matrix needs at least one
    NoDimensions,
    InvalidDimension {
        parameter: String,
        reason: &'static str,
    },
    /// A cell record has no bin center for a declared dimension
    MissingCellDimension { parameter: String },
    /// The nested value tree does not match the dimension list shape
    InvalidCellTree { depth: usize },
    Document(DocumentError),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NoDimensions => {
                write!(f, "matrix has zero dimensions")
            }
            ConfigurationError::InvalidDimension { parameter, reason } => {
                write!(f, "invalid dimension {parameter:?}: {reason}")
            }
            ConfigurationError::MissingCellDimension { parameter } => {
                write!(f, "cell has no bin center for dimension {parameter:?}")
            }
            ConfigurationError::InvalidCellTree { depth } => {
                write!(f, "nested matrix has wrong shape at depth {depth}")
            }
            ConfigurationError::Document(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigurationError::Document(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DocumentError> for ConfigurationError {
    fn from(e: DocumentError) -> Self {
        ConfigurationError::Document(e)
    }
}

/// Errors raised by a matrix query
#[derive(Debug, Clone)]
pub enum LookupError {
    /// The query supplied no value for a dimension's parameter
    MissingParameter(String),
    /// Every parameter was in range but no cell exists for the
    /// resolved bin combination; carries the per-dimension diagnostic
    CellNotFound(String),
    /// Queried a matrix with an empty dimension list; unreachable for
    /// a matrix that loaded successfully
    NoDimensions,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::MissingParameter(parameter) => {
                write!(f, "no value supplied for parameter {parameter:?}")
            }
            LookupError::CellNotFound(message) => write!(f, "{message}"),
            LookupError::NoDimensions => write!(f, "matrix has zero dimensions"),
        }
    }
}

impl std::error::Error for LookupError {}
