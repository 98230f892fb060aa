#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Left,
    Right,
    Up,
    Down,
    Attack,
    Throw,
    Climb,
    JumpThrow,
    Reset,
    Back,
    Confirm,
    Background0,
    Background1,
    Background2,
    Background3,
    ExtraLife,
    FeatherCheat,
    ToggleCharacter,
    ToggleMonochrome,
    ToggleFps,
    ToggleDebug,
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::Left,
        InputAction::Right,
        InputAction::Up,
        InputAction::Down,
        InputAction::Attack,
        InputAction::Throw,
        InputAction::Climb,
        InputAction::JumpThrow,
        InputAction::Reset,
        InputAction::Back,
        InputAction::Confirm,
        InputAction::Background0,
        InputAction::Background1,
        InputAction::Background2,
        InputAction::Background3,
        InputAction::ExtraLife,
        InputAction::FeatherCheat,
        InputAction::ToggleCharacter,
        InputAction::ToggleMonochrome,
        InputAction::ToggleFps,
        InputAction::ToggleDebug,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

const ACTION_COUNT: usize = 21;

/// Held state plus press edges. An edge is raised on the transition from up
/// to down and survives until the next tick snapshot clears it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn set_pressed(&mut self, action: InputAction, pressed: bool) {
        self.pressed[action.index()] = pressed;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_edges(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}
