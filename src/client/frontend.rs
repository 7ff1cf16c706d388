//! The line-based text protocol spoken with the interactive front-end.

use std::fmt;

/// One line forwarded to the front-end. `Display` renders the line without
/// its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendUpdate {
    NewGame {
        maxx: u32,
        maxy: u32,
        player_names: Vec<String>,
    },
    Pixel {
        x: u32,
        y: u32,
        player_name: String,
    },
    PlayerEliminated {
        player_name: String,
    },
}

impl fmt::Display for FrontendUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontendUpdate::NewGame {
                maxx,
                maxy,
                player_names,
            } => {
                write!(f, "NEW_GAME {maxx} {maxy}")?;
                for name in player_names {
                    write!(f, " {name}")?;
                }
                Ok(())
            }
            FrontendUpdate::Pixel { x, y, player_name } => {
                write!(f, "PIXEL {x} {y} {player_name}")
            }
            FrontendUpdate::PlayerEliminated { player_name } => {
                write!(f, "PLAYER_ELIMINATED {player_name}")
            }
        }
    }
}

/// One key transition reported by the front-end, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
}

pub fn parse_key_line(line: &str) -> Option<KeyEvent> {
    match line.trim() {
        "LEFT_KEY_DOWN" => Some(KeyEvent::LeftDown),
        "LEFT_KEY_UP" => Some(KeyEvent::LeftUp),
        "RIGHT_KEY_DOWN" => Some(KeyEvent::RightDown),
        "RIGHT_KEY_UP" => Some(KeyEvent::RightUp),
        _ => None,
    }
}

/// Left/right key state. Right turns clockwise (+1); both keys held cancel
/// out.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyState {
    left: bool,
    right: bool,
}

impl KeyState {
    pub fn apply(&mut self, key: KeyEvent) {
        match key {
            KeyEvent::LeftDown => self.left = true,
            KeyEvent::LeftUp => self.left = false,
            KeyEvent::RightDown => self.right = true,
            KeyEvent::RightUp => self.right = false,
        }
    }

    pub fn turn_direction(&self) -> i8 {
        i8::from(self.right) - i8::from(self.left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_render_the_documented_format() {
        let new_game = FrontendUpdate::NewGame {
            maxx: 800,
            maxy: 600,
            player_names: vec!["alice".into(), "bob".into()],
        };
        assert_eq!(new_game.to_string(), "NEW_GAME 800 600 alice bob");

        let pixel = FrontendUpdate::Pixel {
            x: 4,
            y: 2,
            player_name: "alice".into(),
        };
        assert_eq!(pixel.to_string(), "PIXEL 4 2 alice");

        let eliminated = FrontendUpdate::PlayerEliminated {
            player_name: "bob".into(),
        };
        assert_eq!(eliminated.to_string(), "PLAYER_ELIMINATED bob");
    }

    #[test]
    fn key_lines_parse_and_unknown_lines_do_not() {
        assert_eq!(parse_key_line("LEFT_KEY_DOWN"), Some(KeyEvent::LeftDown));
        assert_eq!(parse_key_line("RIGHT_KEY_UP\r"), Some(KeyEvent::RightUp));
        assert_eq!(parse_key_line("JUMP"), None);
        assert_eq!(parse_key_line(""), None);
    }

    #[test]
    fn both_keys_held_cancel_out() {
        let mut keys = KeyState::default();
        keys.apply(KeyEvent::RightDown);
        assert_eq!(keys.turn_direction(), 1);
        keys.apply(KeyEvent::LeftDown);
        assert_eq!(keys.turn_direction(), 0);
        keys.apply(KeyEvent::RightUp);
        assert_eq!(keys.turn_direction(), -1);
        keys.apply(KeyEvent::LeftUp);
        assert_eq!(keys.turn_direction(), 0);
    }
}
