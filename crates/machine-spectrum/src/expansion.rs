//! Expansion-port peripherals.
//!
//! Two joystick interfaces are modelled. The Kempston interface answers
//! port reads itself (low byte $1F, active-high bits); the Interface 2
//! variant has no port presence at all — it presses number keys on the
//! keyboard matrix, so the machine routes its events to the ULA.

use sinclair_ula::Key;

/// Joystick inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickButton {
    Up,
    Down,
    Left,
    Right,
    Fire,
}

/// A peripheral plugged into the expansion port.
pub enum Expansion {
    Kempston(KempstonJoystick),
    Interface2(Interface2Joystick),
}

impl Expansion {
    pub(crate) fn raise_power(&mut self) {
        if let Self::Kempston(joystick) = self {
            joystick.contents = 0;
        }
    }

    pub(crate) fn lower_power(&mut self) {}

    /// Supply a byte for a port read, if this expansion claims the port.
    pub(crate) fn input(&self, port: u16) -> Option<u8> {
        match self {
            Self::Kempston(joystick) => joystick.input(port),
            Self::Interface2(_) => None,
        }
    }
}

/// Kempston joystick: one byte of active-high switch state on port $1F.
#[derive(Debug, Default)]
pub struct KempstonJoystick {
    contents: u8,
}

impl KempstonJoystick {
    /// Port low byte the interface decodes.
    const PORT: u8 = 0x1F;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: JoystickButton) {
        self.contents |= Self::switch(button);
    }

    pub fn release(&mut self, button: JoystickButton) {
        self.contents &= !Self::switch(button);
    }

    fn input(&self, port: u16) -> Option<u8> {
        ((port & 0xFF) as u8 == Self::PORT).then_some(self.contents)
    }

    const fn switch(button: JoystickButton) -> u8 {
        match button {
            JoystickButton::Right => 0b0000_0001,
            JoystickButton::Left => 0b0000_0010,
            JoystickButton::Down => 0b0000_0100,
            JoystickButton::Up => 0b0000_1000,
            JoystickButton::Fire => 0b0001_0000,
        }
    }
}

/// Interface 2 joystick: button presses become number-key presses.
#[derive(Debug, Default)]
pub struct Interface2Joystick;

impl Interface2Joystick {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The key this joystick closes for a button (right-hand layout:
    /// 1-4 directions, 5 fire).
    #[must_use]
    pub fn key(button: JoystickButton) -> Key {
        match button {
            JoystickButton::Left => Key::N1,
            JoystickButton::Right => Key::N2,
            JoystickButton::Down => Key::N3,
            JoystickButton::Up => Key::N4,
            JoystickButton::Fire => Key::N5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kempston_switches_accumulate() {
        let mut joystick = KempstonJoystick::new();
        joystick.press(JoystickButton::Right);
        joystick.press(JoystickButton::Fire);
        assert_eq!(joystick.input(0x001F), Some(0b0001_0001));

        joystick.release(JoystickButton::Right);
        assert_eq!(joystick.input(0x001F), Some(0b0001_0000));
    }

    #[test]
    fn kempston_decodes_the_port_low_byte() {
        let joystick = KempstonJoystick::new();
        assert_eq!(joystick.input(0xFA1F), Some(0));
        assert_eq!(joystick.input(0x001E), None);
    }

    #[test]
    fn kempston_clears_on_power() {
        let mut expansion = Expansion::Kempston(KempstonJoystick::new());
        if let Expansion::Kempston(joystick) = &mut expansion {
            joystick.press(JoystickButton::Up);
        }
        expansion.raise_power();
        assert_eq!(expansion.input(0x001F), Some(0));
    }

    #[test]
    fn interface2_maps_buttons_to_number_keys() {
        assert_eq!(Interface2Joystick::key(JoystickButton::Left), Key::N1);
        assert_eq!(Interface2Joystick::key(JoystickButton::Right), Key::N2);
        assert_eq!(Interface2Joystick::key(JoystickButton::Down), Key::N3);
        assert_eq!(Interface2Joystick::key(JoystickButton::Up), Key::N4);
        assert_eq!(Interface2Joystick::key(JoystickButton::Fire), Key::N5);
    }

    #[test]
    fn interface2_claims_no_port() {
        let expansion = Expansion::Interface2(Interface2Joystick::new());
        assert_eq!(expansion.input(0x001F), None);
    }
}
