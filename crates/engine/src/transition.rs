use crate::audio::BusyFlag;

/// Screen fade, shared tick timer and music-swap flag read by the state machine and
/// by cutscene actions.
#[derive(Debug, Clone)]
pub struct TransitionState {
    alpha: f32,
    pub fade_speed: f32,
    pub timer: u32,
    music_busy: BusyFlag,
}

impl TransitionState {
    pub fn new(fade_speed: f32, music_busy: BusyFlag) -> Self {
        Self {
            alpha: 0.0,
            fade_speed,
            timer: 0,
            music_busy,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Raises alpha by `step`; returns `true` once fully opaque.
    pub fn fade_out_step(&mut self, step: f32) -> bool {
        self.alpha += step;
        if self.alpha >= 1.0 {
            self.alpha = 1.0;
            return true;
        }
        if self.alpha < 0.0 {
            self.alpha = 0.0;
        }
        false
    }

    /// Lowers alpha by `step`; returns `true` once fully transparent.
    pub fn fade_in_step(&mut self, step: f32) -> bool {
        self.alpha -= step;
        if self.alpha <= 0.0 {
            self.alpha = 0.0;
            return true;
        }
        if self.alpha > 1.0 {
            self.alpha = 1.0;
        }
        false
    }

    /// Counts one tick; returns `true` and resets when `target` is reached.
    pub fn wait_step(&mut self, target: u32) -> bool {
        self.timer = self.timer.saturating_add(1);
        if self.timer >= target {
            self.timer = 0;
            return true;
        }
        false
    }

    pub fn music_busy(&self) -> bool {
        self.music_busy.is_set()
    }
}
