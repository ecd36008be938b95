//! Navigation sidebar.
//!
//! The layout is static: sections of items, each item a route. The only
//! state is the collapse flag and the embedded language switch.

use studio_settings::Language;

use crate::language::{LanguageEvent, LanguageSwitch, translate};

/// One navigation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavItem {
    /// Label key.
    pub key: &'static str,
    /// Route prefix this item owns.
    pub route: &'static str,
    /// Icon name.
    pub icon: &'static str,
}

/// A titled group of entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavSection {
    /// Label key for the section title.
    pub key: &'static str,
    /// Entries in display order.
    pub items: &'static [NavItem],
}

/// Sidebar layout.
pub const SECTIONS: &[NavSection] = &[
    NavSection {
        key: "sidebar.section.develop",
        items: &[
            NavItem {
                key: "sidebar.home",
                route: "/home",
                icon: "home",
            },
            NavItem {
                key: "sidebar.projects",
                route: "/projects",
                icon: "folder",
            },
            NavItem {
                key: "sidebar.traces",
                route: "/traces",
                icon: "activity",
            },
            NavItem {
                key: "sidebar.evaluation",
                route: "/eval",
                icon: "gauge",
            },
        ],
    },
    NavSection {
        key: "sidebar.section.apps",
        items: &[NavItem {
            key: "sidebar.friday",
            route: "/friday",
            icon: "bot",
        }],
    },
    NavSection {
        key: "sidebar.section.system",
        items: &[NavItem {
            key: "sidebar.settings",
            route: "/settings",
            icon: "settings",
        }],
    },
];

/// `route` is `path` or a whole-segment prefix of it.
fn owns(route: &str, path: &str) -> bool {
    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || route.ends_with('/'),
        None => false,
    }
}

/// The item whose route is the longest prefix of `path`.
pub fn active_item(path: &str) -> Option<&'static NavItem> {
    SECTIONS
        .iter()
        .flat_map(|section| section.items.iter())
        .filter(|item| owns(item.route, path))
        .max_by_key(|item| item.route.len())
}

/// Sidebar events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidebarEvent {
    /// Collapse button clicked.
    ToggleCollapsed,
    /// Language switch event.
    Language(LanguageEvent),
}

/// A rendered entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavEntry {
    /// The item.
    pub item: &'static NavItem,
    /// Translated label; empty when collapsed (icon only).
    pub label: String,
    /// Highlighted.
    pub active: bool,
}

/// Sidebar state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SidebarState {
    collapsed: bool,
    language: LanguageSwitch,
}

impl SidebarState {
    /// Expanded sidebar in `language`.
    pub fn new(language: Language) -> Self {
        Self {
            collapsed: false,
            language: LanguageSwitch::new(language),
        }
    }

    /// Icons only.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Embedded language switch.
    pub fn language(&self) -> &LanguageSwitch {
        &self.language
    }

    /// Apply one event.
    #[must_use]
    pub fn reduce(self, event: SidebarEvent) -> Self {
        match event {
            SidebarEvent::ToggleCollapsed => Self {
                collapsed: !self.collapsed,
                ..self
            },
            SidebarEvent::Language(event) => Self {
                language: self.language.reduce(event),
                ..self
            },
        }
    }

    /// Sections with their entries for the current path.
    pub fn sections(&self, path: &str) -> Vec<(String, Vec<NavEntry>)> {
        let lang = self.language.current();
        let active = active_item(path);
        SECTIONS
            .iter()
            .map(|section| {
                let entries = section
                    .items
                    .iter()
                    .map(|item| NavEntry {
                        item,
                        label: if self.collapsed {
                            String::new()
                        } else {
                            translate(lang, item.key).to_string()
                        },
                        active: active.is_some_and(|a| std::ptr::eq(a, item)),
                    })
                    .collect();
                (translate(lang, section.key).to_string(), entries)
            })
            .collect()
    }

    /// Label for the collapse button.
    pub fn collapse_label(&self) -> &'static str {
        let key = if self.collapsed {
            "sidebar.expand"
        } else {
            "sidebar.collapse"
        };
        translate(self.language.current(), key)
    }
}
