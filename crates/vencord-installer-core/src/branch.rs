//! Discord release branches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Discord release channel.
///
/// Each branch ships as its own installation with its own directory name
/// (`Discord`, `DiscordPTB`, `discord-canary`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    /// The regular release.
    Stable,
    /// Public test build.
    Ptb,
    /// Canary (nightly) build.
    Canary,
    /// Internal development build.
    Development,
}

impl Branch {
    /// Returns the branch name as reported to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Ptb => "ptb",
            Self::Canary => "canary",
            Self::Development => "development",
        }
    }

    /// Detects the branch from an installation directory name.
    ///
    /// Matching ignores case as well as `-`, `_`, `.` and spaces, so
    /// `DiscordPTB`, `discord-ptb` and `Discord PTB.app` all map to
    /// [`Branch::Ptb`]. Returns `None` for anything that is not a Discord
    /// installation directory.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let name = name.strip_suffix(".app").unwrap_or(name);
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '.' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "discord" => Some(Self::Stable),
            "discordptb" => Some(Self::Ptb),
            "discordcanary" => Some(Self::Canary),
            "discorddevelopment" => Some(Self::Development),
            _ => None,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
