//! App metadata resolution and category classification.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::types::AppId;

/// Usage category for an app. Every app lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Social,
    Productivity,
    Game,
    Other,
}

impl Category {
    /// Classifies by case-insensitive substring match against fixed keyword
    /// sets, checked in priority order. An app matching both a social and a
    /// game keyword is social.
    #[must_use]
    pub fn classify(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        let matches_any = |keywords: &[&str]| keywords.iter().any(|k| label.contains(k));

        if matches_any(SOCIAL_KEYWORDS) {
            Self::Social
        } else if matches_any(PRODUCTIVITY_KEYWORDS) {
            Self::Productivity
        } else if matches_any(GAME_KEYWORDS) {
            Self::Game
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Productivity => "productivity",
            Self::Game => "game",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SOCIAL_KEYWORDS: &[&str] = &[
    "facebook",
    "instagram",
    "twitter",
    "tiktok",
    "snapchat",
    "whatsapp",
    "telegram",
    "messenger",
    "discord",
    "reddit",
    "chat",
    "social",
];

const PRODUCTIVITY_KEYWORDS: &[&str] = &[
    "mail",
    "calendar",
    "docs",
    "office",
    "notes",
    "sheets",
    "slides",
    "drive",
    "task",
    "todo",
];

const GAME_KEYWORDS: &[&str] = &[
    "game",
    "minecraft",
    "chess",
    "puzzle",
    "arcade",
    "solitaire",
];

/// Resolved metadata for an installed app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub display_name: String,
    /// Carries the platform system flag.
    pub system_flagged: bool,
    /// Whether the app exposes a launchable entry point.
    pub launchable: bool,
}

impl AppInfo {
    /// True system apps carry the system flag and expose no launchable entry
    /// point. System-flagged but launchable apps (pre-installed browsers) are
    /// user apps.
    #[must_use]
    pub const fn is_true_system(&self) -> bool {
        self.system_flagged && !self.launchable
    }
}

/// Resolves app identifiers to display metadata.
///
/// A `None` result means the app has no resolvable metadata (typically
/// uninstalled after generating events); callers drop such records rather
/// than show them with missing fields.
pub trait AppDirectory {
    fn lookup(&self, app: &AppId) -> Option<AppInfo>;
}

/// An in-memory app directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    apps: BTreeMap<AppId, AppInfo>,
}

impl StaticDirectory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            apps: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, app: AppId, info: AppInfo) {
        self.apps.insert(app, info);
    }
}

impl FromIterator<(AppId, AppInfo)> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = (AppId, AppInfo)>>(iter: I) -> Self {
        Self {
            apps: iter.into_iter().collect(),
        }
    }
}

impl AppDirectory for StaticDirectory {
    fn lookup(&self, app: &AppId) -> Option<AppInfo> {
        self.apps.get(app).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_keywords() {
        assert_eq!(Category::classify("Instagram"), Category::Social);
        assert_eq!(Category::classify("ProtonMail"), Category::Productivity);
        assert_eq!(Category::classify("Minecraft"), Category::Game);
        assert_eq!(Category::classify("Flashlight"), Category::Other);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(Category::classify("TIKTOK"), Category::Social);
        assert_eq!(Category::classify("gAmE zone"), Category::Game);
    }

    #[test]
    fn social_outranks_game() {
        // Matches both a social keyword ("chat") and a game keyword ("game"):
        // the first-priority category wins.
        assert_eq!(Category::classify("game-chat"), Category::Social);
    }

    #[test]
    fn productivity_outranks_game() {
        assert_eq!(Category::classify("Task Game"), Category::Productivity);
    }

    #[test]
    fn true_system_requires_both_conditions() {
        let hidden_service = AppInfo {
            display_name: "Config Provider".to_string(),
            system_flagged: true,
            launchable: false,
        };
        assert!(hidden_service.is_true_system());

        // Pre-installed browser: system-flagged but user-launchable.
        let browser = AppInfo {
            display_name: "Browser".to_string(),
            system_flagged: true,
            launchable: true,
        };
        assert!(!browser.is_true_system());

        let user_app = AppInfo {
            display_name: "Notes".to_string(),
            system_flagged: false,
            launchable: true,
        };
        assert!(!user_app.is_true_system());
    }

    #[test]
    fn static_directory_lookup() {
        let app = AppId::new("com.example.mail").unwrap();
        let directory: StaticDirectory = [(
            app.clone(),
            AppInfo {
                display_name: "Mail".to_string(),
                system_flagged: false,
                launchable: true,
            },
        )]
        .into_iter()
        .collect();

        assert_eq!(directory.lookup(&app).unwrap().display_name, "Mail");
        assert!(directory.lookup(&AppId::new("com.gone").unwrap()).is_none());
    }
}
