//! Problem-type catalog: one fixed `(title, type)` pair per failure kind

use crate::problem::ProblemDocument;
use http::StatusCode;

/// Static problem-type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemType {
    pub title: &'static str,
    pub type_url: &'static str,
}

impl ProblemType {
    /// Convert this definition into a document with the given status and detail
    #[inline]
    pub fn as_problem(&self, status: StatusCode, detail: impl Into<String>) -> ProblemDocument {
        ProblemDocument::new(status, self.title, detail).with_type(self.type_url)
    }
}

pub const VALIDATION: ProblemType = ProblemType {
    title: "Validation Error",
    type_url: "https://tools.ietf.org/html/rfc9110#section-15.5.1",
};

pub const NOT_FOUND: ProblemType = ProblemType {
    title: "Resource Not Found",
    type_url: "https://tools.ietf.org/html/rfc9110#section-15.5.5",
};

pub const APPLICATION: ProblemType = ProblemType {
    title: "Application Error",
    type_url: "https://tools.ietf.org/html/rfc9110#section-15.6.1",
};

pub const INTERNAL: ProblemType = ProblemType {
    title: "Internal Server Error",
    type_url: "https://tools.ietf.org/html/rfc9110#section-15.6.1",
};

/// Detail used for every unclassified failure, in every mode.
pub const UNCLASSIFIED_DETAIL: &str = "An unexpected error occurred. Please try again later.";
