//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hungrybat::{Direction, PowerUpKind};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the cursor, or swap when a fruit is grabbed.
    Move(Direction),
    /// Grab / drop the fruit under the cursor, or fire the armed power-up.
    Select,
    /// Arm a power-up; the next Select fires it at the cursor.
    PowerUp(PowerUpKind),
    /// Drop the grab or the armed power-up.
    Cancel,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') if no_mod => Action::Quit,
        KeyCode::Esc if no_mod => Action::Cancel,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Char('r') if no_mod => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::Move(Direction::Right),
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::Move(Direction::Down),
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Select,
        KeyCode::Char('1') if no_mod => Action::PowerUp(PowerUpKind::Bomb),
        KeyCode::Char('2') if no_mod => Action::PowerUp(PowerUpKind::Lightning),
        KeyCode::Char('3') if no_mod => Action::PowerUp(PowerUpKind::Potion),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Action {
        key_to_action(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrows_and_vim_keys_move() {
        assert_eq!(press(KeyCode::Up), Action::Move(Direction::Up));
        assert_eq!(press(KeyCode::Char('k')), Action::Move(Direction::Up));
        assert_eq!(press(KeyCode::Char('h')), Action::Move(Direction::Left));
        assert_eq!(press(KeyCode::Down), Action::Move(Direction::Down));
    }

    #[test]
    fn digits_arm_power_ups() {
        assert_eq!(press(KeyCode::Char('1')), Action::PowerUp(PowerUpKind::Bomb));
        assert_eq!(press(KeyCode::Char('3')), Action::PowerUp(PowerUpKind::Potion));
    }

    #[test]
    fn alt_chords_are_ignored() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::ALT);
        assert_eq!(key_to_action(key), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }
}
