mod file_store;

pub use file_store::{CACHEDIR_TAG_SIGNATURE, RecordingFileStore};
