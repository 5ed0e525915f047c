/// The three screens of the navigation shell, in tab-bar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Chat,
    Game,
    Describe,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Chat, Tab::Game, Tab::Describe];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Game => "Game",
            Tab::Describe => "Describe",
        }
    }

    /// FontAwesome glyph name the tab bar shows.
    pub fn icon(self) -> &'static str {
        match self {
            Tab::Chat => "comment",
            Tab::Game => "hand-rock-o",
            Tab::Describe => "camera",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Tab::Chat => "chat",
            Tab::Game => "game",
            Tab::Describe => "describe",
        }
    }

    pub fn from_slug(raw: &str) -> Option<Tab> {
        let normalized = raw.trim().to_ascii_lowercase();
        Tab::ALL.into_iter().find(|tab| tab.slug() == normalized)
    }
}
