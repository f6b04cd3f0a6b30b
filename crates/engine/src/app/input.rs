#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Confirm,
    TriggerCutscene,
    CycleAbility,
    UseAbility,
    ToggleMusic,
    Quit,
}

const ACTION_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Confirm,
        InputAction::TriggerCutscene,
        InputAction::CycleAbility,
        InputAction::UseAbility,
        InputAction::ToggleMusic,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Confirm => 4,
            InputAction::TriggerCutscene => 5,
            InputAction::CycleAbility => 6,
            InputAction::UseAbility => 7,
            InputAction::ToggleMusic => 8,
            InputAction::Quit => 9,
        }
    }
}

/// Held keys sampled once per fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(actions: ActionStates) -> Self {
        Self { actions }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn quit_requested(&self) -> bool {
        self.is_down(InputAction::Quit)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }
}

/// Held state plus rising edges for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEdges {
    held: ActionStates,
    pressed: ActionStates,
}

impl InputEdges {
    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    /// Down this tick and up the tick before.
    pub fn pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }
}

/// Remembers last tick's held keys. Must see every tick, whatever the game state.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyEdges {
    previous: ActionStates,
}

impl KeyEdges {
    pub fn update(&mut self, input: &InputSnapshot) -> InputEdges {
        let mut pressed = ActionStates::default();
        for action in InputAction::ALL {
            let is_down = input.is_down(action);
            pressed.set(action, is_down && !self.previous.is_down(action));
        }
        self.previous = input.actions;
        InputEdges {
            held: input.actions,
            pressed,
        }
    }
}
