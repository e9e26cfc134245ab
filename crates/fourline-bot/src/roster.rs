use std::sync::atomic::{AtomicU64, Ordering};

use fourline_protocol::PlayerId;
use fourline_session::PlayerProfile;

const NAMES: [&str; 8] = [
    "ConnectBot",
    "AI_Master",
    "BotPlayer",
    "SmartBot",
    "ChallengerBot",
    "ProBot",
    "GameBot",
    "WinBot",
];

/// Hands out bot identities: a fresh random id and a rotating display
/// name with a sequence suffix (`ConnectBot_1`, `AI_Master_2`, ...).
#[derive(Debug, Default)]
pub struct BotRoster {
    issued: AtomicU64,
}

impl BotRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_profile(&self) -> PlayerProfile {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let name = NAMES[((n - 1) % NAMES.len() as u64) as usize];
        PlayerProfile::bot(PlayerId::random(), format!("{name}_{n}"))
    }

    /// How many bots have been issued so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_profile_rotates_names() {
        let roster = BotRoster::new();
        let names: Vec<String> = (0..9).map(|_| roster.next_profile().name).collect();
        assert_eq!(names[0], "ConnectBot_1");
        assert_eq!(names[1], "AI_Master_2");
        assert_eq!(names[7], "WinBot_8");
        assert_eq!(names[8], "ConnectBot_9");
        assert_eq!(roster.issued(), 9);
    }

    #[test]
    fn test_next_profile_is_bot_with_fresh_id() {
        let roster = BotRoster::new();
        let a = roster.next_profile();
        let b = roster.next_profile();
        assert!(a.is_bot && b.is_bot);
        assert_ne!(a.id, b.id);
    }
}
