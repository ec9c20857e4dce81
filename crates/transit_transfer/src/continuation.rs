//! Paged export results and the cursors that link them.
//!
//! An export call returns an [`ExportResult`]. `Continue` results carry a
//! [`ContinuationData`] naming the next page and, optionally, containers to
//! drill into. The transfer loop threads these back to the exporter as
//! [`ExportInformation`] without looking inside them.

use serde::{Deserialize, Serialize};

/// A connector-defined page cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PaginationData {
    /// An opaque next-page token.
    Token(String),
    /// A numeric offset into the result set.
    Offset(u64),
}

impl PaginationData {
    /// Creates a token cursor.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    /// Returns the token, if this is a token cursor.
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token),
            Self::Offset(_) => None,
        }
    }
}

/// A container to export the contents of, such as an album or task list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerResource {
    /// Source-side container id.
    pub id: String,
    /// Connector-defined container kind.
    pub kind: String,
}

impl ContainerResource {
    /// Creates a container reference.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// What an export call should fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportInformation {
    /// Page cursor, absent for the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationData>,
    /// Container being exported, absent for the top level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerResource>,
}

impl ExportInformation {
    /// The next page of the current scope.
    #[must_use]
    pub fn page(pagination: PaginationData, container: Option<ContainerResource>) -> Self {
        Self {
            pagination: Some(pagination),
            container,
        }
    }

    /// The first page of a container.
    #[must_use]
    pub fn container(container: ContainerResource) -> Self {
        Self {
            pagination: None,
            container: Some(container),
        }
    }
}

/// Cursor state returned with a `Continue` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationData {
    /// Next page of the current scope, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationData>,
    /// Containers discovered on this page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerResource>,
}

impl ContinuationData {
    /// Continuation pointing at the next page only.
    #[must_use]
    pub fn next_page(pagination: PaginationData) -> Self {
        Self {
            pagination: Some(pagination),
            containers: Vec::new(),
        }
    }

    /// Adds a container to drill into.
    #[must_use]
    pub fn with_container(mut self, container: ContainerResource) -> Self {
        self.containers.push(container);
        self
    }

    /// Returns true if there is nothing left to fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pagination.is_none() && self.containers.is_empty()
    }
}

/// Kind of an export result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    /// Last page of this scope.
    End,
    /// More to fetch; see the continuation.
    Continue,
    /// Terminal failure; no payload.
    Error,
}

/// One page of exported data.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult<T> {
    result_type: ResultType,
    data: Option<T>,
    continuation: Option<ContinuationData>,
}

impl<T> ExportResult<T> {
    /// A final page.
    pub fn end(data: T) -> Self {
        Self {
            result_type: ResultType::End,
            data: Some(data),
            continuation: None,
        }
    }

    /// A final result with nothing to import.
    pub fn end_empty() -> Self {
        Self {
            result_type: ResultType::End,
            data: None,
            continuation: None,
        }
    }

    /// A page followed by more work.
    pub fn continue_with(data: Option<T>, continuation: ContinuationData) -> Self {
        Self {
            result_type: ResultType::Continue,
            data,
            continuation: Some(continuation),
        }
    }

    /// A terminal error.
    pub fn error() -> Self {
        Self {
            result_type: ResultType::Error,
            data: None,
            continuation: None,
        }
    }

    /// Returns the result type.
    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    /// Returns the page payload.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Returns the continuation.
    pub fn continuation(&self) -> Option<&ContinuationData> {
        self.continuation.as_ref()
    }

    /// Splits the result into its parts.
    pub fn into_parts(self) -> (ResultType, Option<T>, Option<ContinuationData>) {
        (self.result_type, self.data, self.continuation)
    }
}
