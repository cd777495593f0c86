pub type Buttons = u16;

pub const A: Buttons = 1 << 0;
pub const B: Buttons = 1 << 1;
pub const X: Buttons = 1 << 2;
pub const Y: Buttons = 1 << 3;
pub const LEFT_BUMPER: Buttons = 1 << 4;
pub const RIGHT_BUMPER: Buttons = 1 << 5;
pub const DPAD_UP: Buttons = 1 << 6;
pub const DPAD_DOWN: Buttons = 1 << 7;
pub const DPAD_LEFT: Buttons = 1 << 8;
pub const DPAD_RIGHT: Buttons = 1 << 9;

/// One sampled frame of a gamepad as the driver station reports it.
/// Stick Y axes are negative when pushed forward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadState {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
    pub buttons: Buttons,
}

impl GamepadState {
    pub fn with_buttons(buttons: Buttons) -> Self {
        Self {
            buttons,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gamepad {
    last: GamepadState,
    current: GamepadState,
}

impl From<[GamepadState; 2]> for Gamepad {
    fn from([current, last]: [GamepadState; 2]) -> Self {
        Self { last, current }
    }
}

impl Gamepad {
    pub fn left_x(&self) -> f64 {
        self.current.left_x
    }
    pub fn left_y(&self) -> f64 {
        self.current.left_y
    }
    pub fn right_x(&self) -> f64 {
        self.current.right_x
    }
    pub fn right_y(&self) -> f64 {
        self.current.right_y
    }
    pub fn state(&self) -> GamepadState {
        self.current
    }
    // only a single bit should be matched at a time, matching several
    // buttons at once is almost certainly a bug in the caller
    fn bit_matches(button: Buttons, matcher: Buttons) -> bool {
        debug_assert_eq!(button.count_ones(), 1);
        matcher & button == button
    }
    pub fn held(&self, button: Buttons) -> bool {
        Self::bit_matches(button, self.current.buttons)
    }
    pub fn released(&self, button: Buttons) -> bool {
        // matches last frame but not current
        Self::bit_matches(button, self.last.buttons)
            && !Self::bit_matches(button, self.current.buttons)
    }
    pub fn pressed(&self, button: Buttons) -> bool {
        // matches current frame but not last
        !Self::bit_matches(button, self.last.buttons)
            && Self::bit_matches(button, self.current.buttons)
    }
    /// Shift in a new frame. Called exactly once per control cycle so a held
    /// button reports `pressed` for one cycle only.
    pub fn advance(&mut self, next: GamepadState) {
        self.last = self.current;
        self.current = next;
    }
}
