//! Terminal input backend: turns crossterm events into [`PlatformEvent`]s.
//!
//! Terminal-hosted [`crate::platform::Window`] implementations call
//! [`drain_terminal_events`] from `process_events`.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use super::{KeyEvent, KeyState, Modifiers};
use crate::platform::PlatformEvent;

/// Map a crossterm event onto the platform event stream.
///
/// Ctrl+C becomes [`PlatformEvent::Quit`]; keys with no name in our key
/// vocabulary and non-keyboard events are dropped.
pub fn platform_event(event: Event) -> Option<PlatformEvent> {
    match event {
        Event::Key(raw) => {
            let key = key_event(raw)?;
            if key.modifiers.ctrl && key.key.eq_ignore_ascii_case("c") {
                return Some(PlatformEvent::Quit);
            }
            Some(PlatformEvent::Key(key))
        }
        Event::Resize(columns, rows) => Some(PlatformEvent::Resize {
            width: f32::from(columns),
            height: f32::from(rows),
        }),
        _ => None,
    }
}

/// Convert a crossterm key event, or `None` for keys we do not name.
pub fn key_event(raw: event::KeyEvent) -> Option<KeyEvent> {
    let key = match raw.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::F(n) => format!("F{n}"),
        code => named_key(code)?.to_string(),
    };
    let state = match raw.kind {
        KeyEventKind::Press => KeyState::Press,
        KeyEventKind::Repeat => KeyState::Repeat,
        KeyEventKind::Release => KeyState::Release,
    };
    Some(KeyEvent {
        key,
        modifiers: modifiers(raw.modifiers),
        state,
    })
}

/// Read every event already queued on the terminal without blocking.
pub fn drain_terminal_events() -> std::io::Result<Vec<PlatformEvent>> {
    let mut events = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Some(event) = platform_event(event::read()?) {
            events.push(event);
        }
    }
    Ok(events)
}

fn named_key(code: KeyCode) -> Option<&'static str> {
    Some(match code {
        KeyCode::Enter => "Enter",
        KeyCode::Tab => "Tab",
        KeyCode::BackTab => "BackTab",
        KeyCode::Backspace => "Backspace",
        KeyCode::Delete => "Delete",
        KeyCode::Insert => "Insert",
        KeyCode::Esc => "Escape",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        _ => return None,
    })
}

fn modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        shift: mods.contains(KeyModifiers::SHIFT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Direction;
    use crossterm::event::KeyEventState;

    fn raw(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> Event {
        Event::Key(event::KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        })
    }

    fn press(code: KeyCode) -> Event {
        raw(code, KeyModifiers::empty(), KeyEventKind::Press)
    }

    fn key_of(event: Option<PlatformEvent>) -> KeyEvent {
        match event {
            Some(PlatformEvent::Key(key)) => key,
            other => panic!("expected key event, got {other:?}"),
        }
    }

    #[test]
    fn test_arrows_carry_directions() {
        let arrows = [
            (KeyCode::Up, Direction::Up),
            (KeyCode::Down, Direction::Down),
            (KeyCode::Left, Direction::Left),
            (KeyCode::Right, Direction::Right),
        ];
        for (code, expected) in arrows {
            let key = key_of(platform_event(press(code)));
            assert_eq!(key.direction(), Some(expected));
            assert!(key.is_press());
        }
    }

    #[test]
    fn test_chars_and_modifiers() {
        let key = key_of(platform_event(raw(
            KeyCode::Char('x'),
            KeyModifiers::ALT | KeyModifiers::SHIFT,
            KeyEventKind::Press,
        )));
        assert_eq!(key.key, "x");
        assert!(key.modifiers.alt);
        assert!(key.modifiers.shift);
        assert!(!key.modifiers.ctrl);
    }

    #[test]
    fn test_release_keeps_state() {
        let key = key_of(platform_event(raw(KeyCode::Enter, KeyModifiers::empty(), KeyEventKind::Release)));
        assert_eq!(key.key, "Enter");
        assert_eq!(key.state, KeyState::Release);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = platform_event(raw(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press));
        assert!(matches!(event, Some(PlatformEvent::Quit)));

        let plain = key_of(platform_event(press(KeyCode::Char('c'))));
        assert_eq!(plain.key, "c");
    }

    #[test]
    fn test_resize_in_cells() {
        let event = platform_event(Event::Resize(80, 24));
        assert!(matches!(event, Some(PlatformEvent::Resize { width, height }) if width == 80.0 && height == 24.0));
    }

    #[test]
    fn test_unnamed_keys_and_focus_dropped() {
        assert!(platform_event(press(KeyCode::CapsLock)).is_none());
        assert!(platform_event(Event::FocusGained).is_none());
        assert!(platform_event(Event::Paste("hello".into())).is_none());
    }
}
