use crate::{
    CaptureError, CaptureResult, InterruptionEvent, RouteChangeReason,
    capture::{
        CaptureDevice,
        level::{METER_FLOOR_DB, rms_db},
    },
};

use std::{
    fs::File,
    io::BufWriter,
    panic::Location,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use cpal::{
    Device, Stream, StreamConfig, StreamError,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

type SharedWriter = Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>;

/// Default input device captured through cpal and written as 32-bit float WAV.
pub struct CpalCaptureDevice {
    device: Option<Device>,
    config: Option<StreamConfig>,
    stream: Option<Stream>,
    writer: SharedWriter,
    /// Set before the stream is dropped so an in-flight callback stops
    /// writing before `finalize()` takes the writer.
    shutdown: Arc<AtomicBool>,
    level_bits: Arc<AtomicU32>,
    events: Option<mpsc::Sender<InterruptionEvent>>,
    name: String,
}

impl CpalCaptureDevice {
    /// Create an unconfigured device. Hardware is touched on `configure_session()`.
    ///
    /// When `events` is provided, stream failures are reported on it as
    /// interruption events.
    pub fn new(events: Option<mpsc::Sender<InterruptionEvent>>) -> Self {
        Self {
            device: None,
            config: None,
            stream: None,
            writer: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(true)),
            level_bits: Arc::new(AtomicU32::new(METER_FLOOR_DB.to_bits())),
            events,
            name: "default input".to_string(),
        }
    }

    #[track_caller]
    fn build_stream(&self) -> CaptureResult<Stream> {
        let (Some(device), Some(config)) = (self.device.as_ref(), self.config.as_ref()) else {
            return Err(CaptureError::DeviceUnavailable {
                reason: "Audio session not configured".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let writer = Arc::clone(&self.writer);
        let shutdown = Arc::clone(&self.shutdown);
        let level_bits = Arc::clone(&self.level_bits);
        let events = self.events.clone();

        let stream = device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    level_bits.store(rms_db(data).to_bits(), Ordering::Relaxed);

                    // A poisoned lock still holds a usable writer.
                    let mut guard = writer.lock().unwrap_or_else(|e| {
                        error!("Writer lock poisoned, recovering: {}", e);
                        e.into_inner()
                    });
                    if let Some(wav) = guard.as_mut() {
                        for &sample in data {
                            if let Err(e) = wav.write_sample(sample) {
                                error!("Failed to write sample: {}", e);
                                break;
                            }
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    let event = match err {
                        StreamError::DeviceNotAvailable => InterruptionEvent::RouteChanged {
                            reason: RouteChangeReason::DeviceDisconnected,
                        },
                        _ => InterruptionEvent::MediaServicesReset,
                    };
                    if let Some(tx) = events.as_ref()
                        && let Err(e) = tx.try_send(event)
                    {
                        warn!("Dropped interruption event: {}", e);
                    }
                },
                None,
            )
            .map_err(|e| CaptureError::DeviceUnavailable {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| CaptureError::DeviceUnavailable {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(stream)
    }

    fn release_stream(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Some backends return from drop() before the last callback ends.
            std::thread::sleep(std::time::Duration::from_millis(5));
            debug!("Input stream released");
        }
        self.level_bits
            .store(METER_FLOOR_DB.to_bits(), Ordering::Relaxed);
    }

    #[track_caller]
    fn take_writer(&self) -> CaptureResult<Option<WavWriter<BufWriter<File>>>> {
        let mut guard = self.writer.lock().map_err(|e| CaptureError::FinalizeFailed {
            reason: format!("Failed to lock writer: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
        Ok(guard.take())
    }
}

impl CaptureDevice for CpalCaptureDevice {
    #[track_caller]
    #[instrument(skip(self))]
    fn configure_session(&mut self) -> CaptureResult<()> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(CaptureError::DeviceUnavailable {
                reason: "No microphone found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();

        if self.stream.is_some() {
            // Mid-recording the WAV header is fixed; only follow the route if
            // the new default input delivers the same format.
            if let Some(current) = self.config.as_ref()
                && (current.sample_rate != config.sample_rate
                    || current.channels != config.channels)
            {
                return Err(CaptureError::DeviceUnavailable {
                    reason: format!(
                        "New input format {} Hz/{} ch differs from recording format {} Hz/{} ch",
                        config.sample_rate, config.channels, current.sample_rate, current.channels
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            self.device = Some(device);
            self.config = Some(config);

            self.release_stream();
            self.shutdown.store(false, Ordering::Release);
            match self.build_stream() {
                Ok(stream) => self.stream = Some(stream),
                Err(e) => {
                    self.shutdown.store(true, Ordering::Release);
                    return Err(e);
                }
            }

            info!("Input stream moved to current default device");
            return Ok(());
        }

        info!(
            device_id = ?device.id(),
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Audio session configured"
        );

        self.device = Some(device);
        self.config = Some(config);

        Ok(())
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn begin(&mut self, output: &Path) -> CaptureResult<()> {
        if self.config.is_none() {
            self.configure_session()?;
        }
        let Some(config) = self.config.as_ref() else {
            return Err(CaptureError::DeviceUnavailable {
                reason: "Audio session not configured".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let spec = WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let wav = WavWriter::create(output, spec).map_err(|e| CaptureError::DeviceUnavailable {
            reason: format!("Failed to create {:?}: {}", output, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        {
            let mut guard = self.writer.lock().map_err(|e| CaptureError::DeviceUnavailable {
                reason: format!("Failed to lock writer: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
            *guard = Some(wav);
        }

        self.shutdown.store(false, Ordering::Release);
        match self.build_stream() {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                self.shutdown.store(true, Ordering::Release);
                drop(self.take_writer());
                let _ = std::fs::remove_file(output);
                return Err(e);
            }
        }

        info!(output = ?output, "Audio capture started");

        Ok(())
    }

    fn suspend(&mut self) {
        self.release_stream();
        info!("Audio capture suspended");
    }

    #[track_caller]
    fn reacquire(&mut self) -> CaptureResult<()> {
        self.shutdown.store(false, Ordering::Release);
        match self.build_stream() {
            Ok(stream) => {
                self.stream = Some(stream);
                info!("Audio capture re-acquired");
                Ok(())
            }
            Err(e) => {
                self.shutdown.store(true, Ordering::Release);
                Err(e)
            }
        }
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn finalize(&mut self) -> CaptureResult<()> {
        self.release_stream();

        if let Some(wav) = self.take_writer()? {
            let samples = wav.len();
            wav.finalize().map_err(|e| CaptureError::FinalizeFailed {
                reason: format!("Failed to finalize WAV file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
            debug!(sample_count = samples, "Output file finalized");
        }

        Ok(())
    }

    fn abort(&mut self) {
        self.release_stream();
        match self.take_writer() {
            // Dropping the writer closes the file; nothing relies on its header.
            Ok(writer) => drop(writer),
            Err(e) => warn!(error = %e, "Writer unavailable during abort"),
        }
        self.device = None;
        self.config = None;
        warn!("Audio capture aborted");
    }

    fn input_power_db(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
