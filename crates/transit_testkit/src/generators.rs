//! Property-based test generators using proptest.

use proptest::prelude::*;
use transit_store::{Job, JobState};
use transit_transfer::{ContainerResource, ContinuationData, PaginationData};

/// Strategy for any job state.
pub fn job_state_strategy() -> impl Strategy<Value = JobState> {
    prop::sample::select(JobState::ALL.to_vec())
}

/// Strategy for a fresh job with arbitrary service names.
pub fn job_strategy() -> impl Strategy<Value = Job> {
    (
        "[a-z]{1,12}",
        "[a-z]{1,12}",
        prop::sample::select(vec!["PHOTOS", "TASKS", "CALENDAR", "PLAYLISTS"]),
    )
        .prop_map(|(export, import, data_type)| Job::new(export, import, data_type))
}

/// Strategy for a job with arbitrary encrypted blobs and worker key.
pub fn job_with_blobs_strategy() -> impl Strategy<Value = Job> {
    (
        job_strategy(),
        prop::collection::vec(any::<u8>(), 0..256),
        prop::collection::vec(any::<u8>(), 0..256),
        prop::array::uniform32(any::<u8>()),
    )
        .prop_map(|(job, export, import, key)| {
            job.with_state(JobState::AssignedWithAuthData)
                .with_worker_key(key.to_vec())
                .with_encrypted_auth(export, import)
        })
}

/// Strategy for a page cursor.
pub fn pagination_strategy() -> impl Strategy<Value = PaginationData> {
    prop_oneof![
        "[A-Za-z0-9_-]{1,32}".prop_map(PaginationData::Token),
        any::<u64>().prop_map(PaginationData::Offset),
    ]
}

/// Strategy for continuation data with up to four containers.
pub fn continuation_strategy() -> impl Strategy<Value = ContinuationData> {
    (
        prop::option::of(pagination_strategy()),
        prop::collection::vec(
            ("[a-z0-9]{1,8}", prop::sample::select(vec!["album", "list"])),
            0..4,
        ),
    )
        .prop_map(|(pagination, containers)| ContinuationData {
            pagination,
            containers: containers
                .into_iter()
                .map(|(id, kind)| ContainerResource::new(id, kind))
                .collect(),
        })
}
