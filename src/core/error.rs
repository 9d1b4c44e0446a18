use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Term absent from the term dictionary.
    TermNotFound,
    /// User-level query construction or execution error.
    Query,
    /// Reader has no word graph for the field; callers fall back to a
    /// linear scan.
    NoWordGraph,
    InvalidInput,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn term_not_found(field: &str, text: &str) -> Self {
        Error::new(ErrorKind::TermNotFound, format!("{}:{}", field, text))
    }

    pub fn query(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Query, context.into())
    }

    pub fn no_word_graph(field: &str) -> Self {
        Error::new(ErrorKind::NoWordGraph, format!("no word graph for field {}", field))
    }

    pub fn is_term_not_found(&self) -> bool {
        self.kind == ErrorKind::TermNotFound
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error {
            kind: ErrorKind::Internal,
            context: format!("FST error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
