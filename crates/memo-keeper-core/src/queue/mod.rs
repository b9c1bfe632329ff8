mod manifest;
mod pending;
mod pipeline;
#[allow(clippy::module_inception)]
mod queue;
mod uploader;

pub use {
    manifest::{MANIFEST_VERSION, read_manifest, write_manifest},
    pending::{PendingRecording, UploadTrigger},
    pipeline::{FailedUpload, SubmitOutcome, UploadPipeline, UploadReport},
    queue::PendingUploadQueue,
    uploader::{UploadOutcome, Uploader},
};
