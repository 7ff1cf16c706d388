//! Player-name rules, shared by the codec and the server's admission path.

pub const MAX_PLAYER_NAME_LEN: usize = 64;

// Printable ASCII minus space: '!' (33) through '~' (126).
const MIN_NAME_BYTE: u8 = 33;
const MAX_NAME_BYTE: u8 = 126;

/// The empty name is valid and denotes a spectator.
pub fn is_valid_player_name(name: &str) -> bool {
    name.len() <= MAX_PLAYER_NAME_LEN
        && name
            .bytes()
            .all(|b| (MIN_NAME_BYTE..=MAX_NAME_BYTE).contains(&b))
}

#[cfg(test)]
mod tests {
    use super::is_valid_player_name;

    #[test]
    fn accepts_typical_names() {
        assert!(is_valid_player_name("alice"));
        assert!(is_valid_player_name("Bob_42"));
        assert!(is_valid_player_name("!~"));
    }

    #[test]
    fn empty_name_is_a_spectator() {
        assert!(is_valid_player_name(""));
    }

    #[test]
    fn rejects_spaces_and_control_bytes() {
        assert!(!is_valid_player_name("two words"));
        assert!(!is_valid_player_name("tab\there"));
        assert!(!is_valid_player_name("nul\0"));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(!is_valid_player_name("żółw"));
    }

    #[test]
    fn rejects_over_64_bytes() {
        let name = "x".repeat(65);
        assert!(!is_valid_player_name(&name));
        assert!(is_valid_player_name(&name[..64]));
    }
}
