use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AbilityKind {
    #[default]
    None,
    GhostMode,
    StopTime,
}

impl AbilityKind {
    const CYCLE: [AbilityKind; 2] = [AbilityKind::GhostMode, AbilityKind::StopTime];

    pub fn as_token(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::GhostMode => "ghost_mode",
            Self::StopTime => "stop_time",
        }
    }
}

/// The player's selected ability. Cycling never lands back on `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ability {
    kind: AbilityKind,
    activated: bool,
}

impl Ability {
    pub fn kind(&self) -> AbilityKind {
        self.kind
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn is_active(&self, kind: AbilityKind) -> bool {
        self.activated && self.kind == kind
    }

    /// Selects the next ability and deactivates it.
    pub fn cycle(&mut self) {
        let next_index = AbilityKind::CYCLE
            .iter()
            .position(|kind| *kind == self.kind)
            .map_or(0, |index| (index + 1) % AbilityKind::CYCLE.len());
        self.kind = AbilityKind::CYCLE[next_index];
        self.activated = false;
        debug!(ability = self.kind.as_token(), "ability_cycled");
    }

    pub fn activate(&mut self) {
        if self.kind != AbilityKind::None {
            self.activated = true;
            debug!(ability = self.kind.as_token(), "ability_activated");
        }
    }

    pub fn deactivate(&mut self) {
        self.activated = false;
    }

    pub fn toggle(&mut self) {
        if self.activated {
            self.deactivate();
        } else {
            self.activate();
        }
    }
}
