use engine::{AudioBackend, SilentBackend};
#[cfg(feature = "audio")]
use tracing::warn;

/// Speaker backend when built with the `audio` feature and an output device exists,
/// otherwise the silent one.
pub(crate) fn default_backend() -> Box<dyn AudioBackend> {
    #[cfg(feature = "audio")]
    {
        match output::RodioBackend::open() {
            Ok(backend) => return Box::new(backend),
            Err(error) => warn!(error = %error, "audio_output_unavailable_using_silent_backend"),
        }
    }
    Box::<SilentBackend>::default()
}

#[cfg(feature = "audio")]
mod output {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use std::thread;

    use engine::{AudioBackend, AudioError};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    /// The rodio output stream is not `Send`, so it lives on its own thread for as long
    /// as the backend holds `_keepalive`.
    pub(super) struct RodioBackend {
        handle: OutputStreamHandle,
        sink: Option<Sink>,
        track: Option<PathBuf>,
        volume: f32,
        _keepalive: mpsc::Sender<()>,
    }

    impl RodioBackend {
        pub(super) fn open() -> Result<Self, AudioError> {
            let (ready_tx, ready_rx) = mpsc::channel();
            let (keepalive_tx, keepalive_rx) = mpsc::channel::<()>();

            thread::Builder::new()
                .name("audio-output".to_string())
                .spawn(move || match OutputStream::try_default() {
                    Ok((_stream, handle)) => {
                        if ready_tx.send(Ok(handle)).is_ok() {
                            // Returns once the backend drops its sender.
                            let _ = keepalive_rx.recv();
                        }
                    }
                    Err(error) => {
                        let _ = ready_tx.send(Err(error.to_string()));
                    }
                })
                .map_err(|error| AudioError::Unavailable {
                    reason: error.to_string(),
                })?;

            let handle = ready_rx
                .recv()
                .map_err(|error| AudioError::Unavailable {
                    reason: error.to_string(),
                })?
                .map_err(|reason| AudioError::Unavailable { reason })?;

            Ok(Self {
                handle,
                sink: None,
                track: None,
                volume: 1.0,
                _keepalive: keepalive_tx,
            })
        }

        fn open_sink(&self, path: &Path) -> Result<Sink, AudioError> {
            let file = File::open(path).map_err(|source| AudioError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            let source = Decoder::new(BufReader::new(file)).map_err(|error| AudioError::Decode {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;
            let sink = Sink::try_new(&self.handle).map_err(|error| AudioError::Unavailable {
                reason: error.to_string(),
            })?;
            sink.pause();
            sink.set_volume(self.volume);
            sink.append(source);
            Ok(sink)
        }
    }

    impl AudioBackend for RodioBackend {
        fn load(&mut self, path: &Path) -> Result<(), AudioError> {
            self.close();
            self.volume = 1.0;
            let sink = self.open_sink(path)?;
            debug!(path = %path.display(), "audio_track_loaded");
            self.sink = Some(sink);
            self.track = Some(path.to_path_buf());
            Ok(())
        }

        fn play(&mut self) {
            if let Some(sink) = &self.sink {
                sink.play();
            }
        }

        fn pause(&mut self) {
            if let Some(sink) = &self.sink {
                sink.pause();
            }
        }

        fn rewind(&mut self) {
            let Some(path) = self.track.clone() else {
                return;
            };
            let was_paused = self.sink.as_ref().map_or(true, Sink::is_paused);
            match self.open_sink(&path) {
                Ok(sink) => {
                    if let Some(previous) = self.sink.replace(sink) {
                        previous.stop();
                    }
                    if !was_paused {
                        self.play();
                    }
                }
                Err(error) => warn!(error = %error, "audio_rewind_failed"),
            }
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(sink) = &self.sink {
                sink.set_volume(self.volume);
            }
        }

        fn is_playing(&self) -> bool {
            self.sink
                .as_ref()
                .is_some_and(|sink| !sink.is_paused() && !sink.empty())
        }

        fn close(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.track = None;
        }
    }
}
