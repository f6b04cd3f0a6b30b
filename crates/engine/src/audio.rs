use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

/// Volume changes per fade.
pub const FADE_STEPS: u32 = 30;

static MUSIC_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_music_lock_poison_once(operation: &'static str) {
    if MUSIC_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "music lock poisoned; recovered inner value");
    }
}

fn lock_recovering<'a, T: ?Sized>(
    mutex: &'a Mutex<T>,
    operation: &'static str,
) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_music_lock_poison_once(operation);
            poisoned.into_inner()
        }
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode audio file {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("no audio output available: {reason}")]
    Unavailable { reason: String },
}

/// Playback primitives the music player drives. Implementations own a single track.
pub trait AudioBackend: Send {
    fn load(&mut self, path: &Path) -> Result<(), AudioError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn rewind(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn is_playing(&self) -> bool;
    fn close(&mut self);
}

/// Headless backend: tracks playback state without producing sound.
#[derive(Debug, Default)]
pub struct SilentBackend {
    loaded: Option<PathBuf>,
    playing: bool,
    volume: f32,
}

impl SilentBackend {
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl AudioBackend for SilentBackend {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        fs::metadata(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.loaded = Some(path.to_path_buf());
        self.playing = false;
        self.volume = 1.0;
        Ok(())
    }

    fn play(&mut self) {
        self.playing = self.loaded.is_some();
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn rewind(&mut self) {}

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn close(&mut self) {
        self.loaded = None;
        self.playing = false;
    }
}

/// Mutual-exclusion flag for music fades and track swaps. Acquired with
/// compare-exchange so only one can be in flight.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    fn guard(&self) -> Option<BusyGuard> {
        self.try_acquire().then(|| BusyGuard(self.clone()))
    }
}

/// Releases the busy flag when dropped, including when a swap task never runs.
struct BusyGuard(BusyFlag);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Completion signal of a background fade.
#[derive(Debug)]
pub struct FadeHandle {
    done: Receiver<()>,
}

impl FadeHandle {
    /// Blocks until the fade finished. Returns `false` if the fade task died.
    pub fn wait(self) -> bool {
        self.done.recv().is_ok()
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.done.try_recv(), Err(mpsc::TryRecvError::Empty))
    }

    /// Runs `continuation` on a background thread once the fade has finished.
    pub fn on_complete<F>(self, continuation: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let done = self.done;
        let worker = spawn_worker("music-swap", move || {
            let _ = done.recv();
            continuation();
        });
        TaskHandle { worker }
    }
}

#[derive(Debug)]
pub struct TaskHandle {
    worker: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Waits for the task. Returns `false` if it could not be started or panicked.
    pub fn join(self) -> bool {
        match self.worker {
            Some(worker) => worker.join().is_ok(),
            None => false,
        }
    }
}

fn spawn_worker<F>(name: &str, body: F) -> Option<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    match thread::Builder::new().name(name.to_string()).spawn(body) {
        Ok(handle) => Some(handle),
        Err(error) => {
            warn!(thread = name, error = %error, "music_worker_spawn_failed");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeTimings {
    pub stop: Duration,
    pub swap: Duration,
    pub toggle: Duration,
}

impl Default for FadeTimings {
    fn default() -> Self {
        Self {
            stop: Duration::from_millis(500),
            swap: Duration::from_secs(1),
            toggle: Duration::from_millis(500),
        }
    }
}

struct MusicShared {
    backend: Mutex<Box<dyn AudioBackend>>,
    current_track: Mutex<Option<String>>,
    failed_track: Mutex<Option<String>>,
    paused: AtomicBool,
}

impl MusicShared {
    fn backend(&self) -> MutexGuard<'_, Box<dyn AudioBackend>> {
        lock_recovering(&self.backend, "backend")
    }

    fn current_track(&self) -> MutexGuard<'_, Option<String>> {
        lock_recovering(&self.current_track, "current_track")
    }

    fn failed_track(&self) -> MutexGuard<'_, Option<String>> {
        lock_recovering(&self.failed_track, "failed_track")
    }

    fn run_fade(&self, direction: FadeDirection, duration: Duration) {
        let pause_per_step = duration / FADE_STEPS;
        for step in 0..FADE_STEPS {
            let volume = match direction {
                FadeDirection::In => (step + 1) as f32 / FADE_STEPS as f32,
                FadeDirection::Out => (FADE_STEPS - step - 1) as f32 / FADE_STEPS as f32,
            };
            self.backend().set_volume(volume);
            if !pause_per_step.is_zero() {
                thread::sleep(pause_per_step);
            }
        }

        let mut backend = self.backend();
        match direction {
            FadeDirection::Out => {
                backend.set_volume(0.0);
                backend.pause();
                self.paused.store(true, Ordering::Release);
            }
            FadeDirection::In => {
                backend.set_volume(1.0);
                backend.play();
                self.paused.store(false, Ordering::Release);
            }
        }
    }

    fn load_and_play(&self, asset_dir: &Path, track: &str) -> Result<(), AudioError> {
        let path = asset_dir.join(track);
        let mut backend = self.backend();
        if let Err(error) = backend.load(&path) {
            *self.current_track() = None;
            *self.failed_track() = Some(track.to_string());
            return Err(error);
        }
        backend.set_volume(1.0);
        backend.play();
        self.paused.store(false, Ordering::Release);
        *self.current_track() = Some(track.to_string());
        *self.failed_track() = None;
        Ok(())
    }
}

/// Background music channel with non-blocking fades and guarded track swaps.
///
/// Only one stop, pause toggle or swap runs at a time: a request made while another
/// is in flight is dropped, not queued.
pub struct MusicPlayer {
    shared: Arc<MusicShared>,
    busy: BusyFlag,
    asset_dir: PathBuf,
    timings: FadeTimings,
}

impl MusicPlayer {
    pub fn new(backend: Box<dyn AudioBackend>, asset_dir: PathBuf, timings: FadeTimings) -> Self {
        Self {
            shared: Arc::new(MusicShared {
                backend: Mutex::new(backend),
                current_track: Mutex::new(None),
                failed_track: Mutex::new(None),
                paused: AtomicBool::new(false),
            }),
            busy: BusyFlag::default(),
            asset_dir,
            timings,
        }
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    pub fn is_playing(&self) -> bool {
        self.shared.backend().is_playing()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.current_track().is_none()
    }

    pub fn current_track(&self) -> Option<String> {
        self.shared.current_track().clone()
    }

    pub fn timings(&self) -> FadeTimings {
        self.timings
    }

    /// Loads `track` and starts it at full volume on the calling thread.
    pub fn load_and_play(&self, track: &str) -> Result<(), AudioError> {
        self.shared.load_and_play(&self.asset_dir, track)
    }

    pub fn start_fade(&self, direction: FadeDirection, duration: Duration) -> FadeHandle {
        self.spawn_fade(direction, duration, None)
    }

    /// The guard, if any, is released before the handle reports completion.
    fn spawn_fade(
        &self,
        direction: FadeDirection,
        duration: Duration,
        guard: Option<BusyGuard>,
    ) -> FadeHandle {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let shared = Arc::clone(&self.shared);
        spawn_worker("music-fade", move || {
            shared.run_fade(direction, duration);
            drop(guard);
            let _ = done_tx.send(());
        });
        FadeHandle { done: done_rx }
    }

    /// Fades the channel out in the background; the player counts as paused at once.
    /// Dropped while another fade or swap is in flight.
    pub fn stop(&self) -> Option<FadeHandle> {
        let Some(guard) = self.busy.guard() else {
            debug!("music_stop_dropped_busy");
            return None;
        };
        let handle = self.spawn_fade(FadeDirection::Out, self.timings.stop, Some(guard));
        self.shared.paused.store(true, Ordering::Release);
        Some(handle)
    }

    /// Resumes a paused channel with a fade-in, or fades a playing one out. Dropped
    /// while another fade or swap is in flight.
    pub fn toggle_pause(&self) -> Option<FadeHandle> {
        let Some(guard) = self.busy.guard() else {
            debug!("music_toggle_dropped_busy");
            return None;
        };
        if self.is_paused() && !self.is_playing() {
            {
                let mut backend = self.shared.backend();
                backend.set_volume(0.0);
                backend.play();
            }
            Some(self.spawn_fade(FadeDirection::In, self.timings.toggle, Some(guard)))
        } else {
            let handle = self.spawn_fade(FadeDirection::Out, self.timings.toggle, Some(guard));
            self.shared.paused.store(true, Ordering::Release);
            Some(handle)
        }
    }

    /// Fades out, swaps to `track` and plays it. Returns `None` when a swap is already
    /// in flight; the request is then dropped.
    pub fn change_track(&self, track: &str) -> Option<TaskHandle> {
        let Some(guard) = self.busy.guard() else {
            debug!(track, "music_swap_dropped_busy");
            return None;
        };
        info!(track, "music_swap_started");

        let shared = Arc::clone(&self.shared);
        let asset_dir = self.asset_dir.clone();
        let track = track.to_string();
        let fade = self.start_fade(FadeDirection::Out, self.timings.swap);
        Some(fade.on_complete(move || {
            let _guard = guard;
            {
                let mut backend = shared.backend();
                if backend.is_playing() || shared.paused.load(Ordering::Acquire) {
                    backend.close();
                }
            }
            match shared.load_and_play(&asset_dir, &track) {
                Ok(()) => info!(track = %track, "music_swap_finished"),
                Err(error) => warn!(track = %track, error = %error, "music_swap_load_failed"),
            }
        }))
    }

    /// Keeps the channel on the scene's track: first load, looping and, when
    /// `allow_swap` is set, swapping to a different track.
    pub fn sync_scene_track(&self, track: &str, allow_swap: bool) -> Option<TaskHandle> {
        if track.is_empty() || self.is_busy() {
            return None;
        }

        if self.is_empty() {
            if self.shared.failed_track().as_deref() == Some(track) {
                return None;
            }
            match self.load_and_play(track) {
                Ok(()) => info!(track, "music_started"),
                Err(error) => warn!(track, error = %error, "music_load_failed"),
            }
            return None;
        }

        if !self.is_playing() && !self.is_paused() {
            let mut backend = self.shared.backend();
            backend.rewind();
            backend.play();
            return None;
        }

        if allow_swap && self.current_track().as_deref() != Some(track) {
            return self.change_track(track);
        }
        None
    }
}
