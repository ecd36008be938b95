//! Interface language switch and label translations.

use studio_settings::Language;

/// `(key, English, Chinese)` label table.
const LABELS: &[(&str, &str, &str)] = &[
    ("sidebar.section.develop", "Develop", "开发"),
    ("sidebar.section.apps", "Applications", "应用"),
    ("sidebar.section.system", "System", "系统"),
    ("sidebar.home", "Overview", "概览"),
    ("sidebar.projects", "Projects", "项目"),
    ("sidebar.traces", "Traces", "追踪"),
    ("sidebar.evaluation", "Evaluation", "评测"),
    ("sidebar.friday", "Friday", "Friday"),
    ("sidebar.settings", "Settings", "设置"),
    ("sidebar.collapse", "Collapse", "收起"),
    ("sidebar.expand", "Expand", "展开"),
    ("language.en", "English", "英文"),
    ("language.zh", "Chinese", "中文"),
    ("chat.placeholder", "Type a message...", "输入消息..."),
    ("chat.send", "Send", "发送"),
    ("chat.interrupt", "Interrupt", "中断"),
    ("chat.display.byReply", "Group by reply", "按回复分组"),
    ("chat.display.byMessage", "Show every message", "逐条显示"),
    ("chat.markdown", "Render markdown", "渲染 Markdown"),
    ("chat.randomAvatar", "Random avatars", "随机头像"),
    ("chat.empty", "No messages yet", "暂无消息"),
    ("chat.thinking", "thinking", "思考"),
    ("chat.tool", "tool", "工具"),
];

/// Label for `key` in `language`. Unknown keys come back unchanged.
pub fn translate(language: Language, key: &str) -> &str {
    LABELS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map_or(key, |&(_, en, zh)| match language {
            Language::En => en,
            Language::Zh => zh,
        })
}

/// Label key for a language's own menu entry.
pub fn language_label_key(language: Language) -> &'static str {
    match language {
        Language::En => "language.en",
        Language::Zh => "language.zh",
    }
}

/// Switch button events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanguageEvent {
    /// Button clicked.
    Toggle,
    /// Clicked outside the dropdown.
    Dismiss,
    /// A language was picked.
    Select(Language),
}

/// One dropdown row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageOption {
    /// The language.
    pub language: Language,
    /// Label in the current interface language.
    pub label: String,
    /// Currently active.
    pub selected: bool,
}

/// Language switch button with its dropdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LanguageSwitch {
    current: Language,
    open: bool,
}

impl LanguageSwitch {
    /// Closed switch showing `current`.
    pub fn new(current: Language) -> Self {
        Self {
            current,
            open: false,
        }
    }

    /// Active language.
    pub fn current(&self) -> Language {
        self.current
    }

    /// Dropdown visible.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Apply one event. Selecting closes the dropdown.
    #[must_use]
    pub fn reduce(self, event: LanguageEvent) -> Self {
        match event {
            LanguageEvent::Toggle => Self {
                open: !self.open,
                ..self
            },
            LanguageEvent::Dismiss => Self {
                open: false,
                ..self
            },
            LanguageEvent::Select(language) => Self {
                current: language,
                open: false,
            },
        }
    }

    /// Dropdown rows, in menu order.
    pub fn options(&self) -> Vec<LanguageOption> {
        Language::ALL
            .iter()
            .map(|&language| LanguageOption {
                language,
                label: translate(self.current, language_label_key(language)).to_string(),
                selected: language == self.current,
            })
            .collect()
    }

    /// Translate with the active language.
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        translate(self.current, key)
    }
}
