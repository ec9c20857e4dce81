//! Job records and the lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Globally unique, immutable job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a new random job id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the raw 16 bytes of the id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a job.
///
/// States are strictly forward-moving:
///
/// ```text
/// PENDING_AUTH_DATA -> PENDING_WORKER_ASSIGNMENT -> ASSIGNED_WITHOUT_AUTH_DATA
///     -> ASSIGNED_WITH_AUTH_DATA -> COMPLETE
/// ```
///
/// Any non-terminal state may move to `ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Created; the client-facing tier is collecting credentials.
    PendingAuthData,
    /// Credentials collected; waiting for a worker to claim the job.
    PendingWorkerAssignment,
    /// Claimed by a worker that has published its public key.
    AssignedWithoutAuthData,
    /// Encrypted credentials are attached; the worker may run the transfer.
    AssignedWithAuthData,
    /// Transfer finished.
    Complete,
    /// Transfer failed.
    Error,
}

impl JobState {
    /// Every state, in lifecycle order.
    pub const ALL: [JobState; 6] = [
        JobState::PendingAuthData,
        JobState::PendingWorkerAssignment,
        JobState::AssignedWithoutAuthData,
        JobState::AssignedWithAuthData,
        JobState::Complete,
        JobState::Error,
    ];

    /// Returns the persisted name of this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobState::PendingAuthData => "PENDING_AUTH_DATA",
            JobState::PendingWorkerAssignment => "PENDING_WORKER_ASSIGNMENT",
            JobState::AssignedWithoutAuthData => "ASSIGNED_WITHOUT_AUTH_DATA",
            JobState::AssignedWithAuthData => "ASSIGNED_WITH_AUTH_DATA",
            JobState::Complete => "COMPLETE",
            JobState::Error => "ERROR",
        }
    }

    /// Position of the state in the lifecycle. `ERROR` ranks last.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            JobState::PendingAuthData => 0,
            JobState::PendingWorkerAssignment => 1,
            JobState::AssignedWithoutAuthData => 2,
            JobState::AssignedWithAuthData => 3,
            JobState::Complete => 4,
            JobState::Error => 5,
        }
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Error)
    }

    /// Returns true if a worker holds the job.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        matches!(
            self,
            JobState::AssignedWithoutAuthData | JobState::AssignedWithAuthData
        )
    }

    /// Returns true if the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Complete | Error, _) => false,
            (_, Error) => true,
            (PendingAuthData, PendingWorkerAssignment) => true,
            (PendingWorkerAssignment, AssignedWithoutAuthData) => true,
            (AssignedWithoutAuthData, AssignedWithAuthData) => true,
            (AssignedWithAuthData, Complete) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job state: {s}"))
    }
}

/// One user-initiated transfer of one data vertical between two services.
///
/// Jobs are created in [`JobState::PendingAuthData`] and mutated only
/// through [`JobStore::update`](crate::JobStore::update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job id.
    pub id: JobId,
    /// Current state.
    pub state: JobState,
    /// Service the data is exported from.
    pub export_service: String,
    /// Service the data is imported into.
    pub import_service: String,
    /// Data vertical, e.g. `PHOTOS`.
    pub data_type: String,
    /// Export credentials, encrypted to the worker's public key.
    #[serde(default, with = "base64_bytes")]
    pub encrypted_export_auth: Option<Vec<u8>>,
    /// Import credentials, encrypted to the worker's public key.
    #[serde(default, with = "base64_bytes")]
    pub encrypted_import_auth: Option<Vec<u8>>,
    /// Public key published by the assigned worker.
    #[serde(default, with = "base64_bytes")]
    pub worker_public_key: Option<Vec<u8>>,
    /// Best-effort detail of a fatal failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last successful update.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a new job in [`JobState::PendingAuthData`].
    pub fn new(
        export_service: impl Into<String>,
        import_service: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            state: JobState::PendingAuthData,
            export_service: export_service.into(),
            import_service: import_service.into(),
            data_type: data_type.into(),
            encrypted_export_auth: None,
            encrypted_import_auth: None,
            worker_public_key: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy moved to `state`.
    #[must_use]
    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = state;
        self
    }

    /// Returns a copy carrying the assigned worker's public key.
    #[must_use]
    pub fn with_worker_key(mut self, public_key: Vec<u8>) -> Self {
        self.worker_public_key = Some(public_key);
        self
    }

    /// Returns a copy carrying both encrypted auth blobs.
    #[must_use]
    pub fn with_encrypted_auth(mut self, export_auth: Vec<u8>, import_auth: Vec<u8>) -> Self {
        self.encrypted_export_auth = Some(export_auth);
        self.encrypted_import_auth = Some(import_auth);
        self
    }

    /// Returns a copy carrying a failure reason.
    #[must_use]
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    /// Returns true if both encrypted auth blobs are present.
    #[must_use]
    pub fn has_auth_data(&self) -> bool {
        self.encrypted_export_auth.is_some() && self.encrypted_import_auth.is_some()
    }
}

/// Serializes optional byte blobs as standard base64 strings.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
