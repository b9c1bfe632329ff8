use crate::CaptureResult;

use std::path::Path;

/// Hardware audio input driven exclusively by [`CaptureSession`](crate::CaptureSession).
///
/// Implementations own the platform audio session and the writer for the
/// output file. All calls arrive serialized through the session handle, so
/// implementations do not need their own locking around these methods.
pub trait CaptureDevice: Send {
    /// Apply (or re-apply) the platform audio session configuration.
    ///
    /// Called before a session starts, after a route change and after a
    /// media-service reset.
    fn configure_session(&mut self) -> CaptureResult<()>;

    /// Open the input and start writing captured audio to `output`.
    fn begin(&mut self, output: &Path) -> CaptureResult<()>;

    /// Stop delivering audio into the output file without closing it.
    fn suspend(&mut self);

    /// Re-acquire the input after [`suspend`](Self::suspend).
    fn reacquire(&mut self) -> CaptureResult<()>;

    /// Close the output file so it is complete on disk, then release the input.
    fn finalize(&mut self) -> CaptureResult<()>;

    /// Tear the input down immediately. The output file is left as-is.
    fn abort(&mut self);

    /// Instantaneous input power in dBFS.
    fn input_power_db(&self) -> f32;

    /// Device name for logging.
    fn name(&self) -> &str;
}
