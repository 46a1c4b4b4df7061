//! Host-facing result items
//!
//! Every piece of text shown to the host is a [`DisplayText`]: `markup` is
//! escaped and wrapped for display, `plain` is the original string. Clipboard
//! payloads are always taken from `plain`.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::core::errors::TranslationError;
use crate::core::models::{CandidateSet, LanguagePair, TranslationResult};

/// Title shown for empty input
pub const PROMPT_TITLE: &str = "Type text to translate";
/// Title shown while the worker runs
pub const PLACEHOLDER_TITLE: &str = "Translating…";
/// Title shown when no result could be produced
pub const FAILED_TITLE: &str = "Translation failed";

/// Text with a display form and a plain form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    /// Escaped, possibly wrapped
    pub markup: String,
    /// Unmodified text
    pub plain: String,
}

impl DisplayText {
    /// Escaped, unwrapped
    pub fn new(plain: impl Into<String>) -> Self {
        let plain = plain.into();
        Self {
            markup: escape_markup(&plain),
            plain,
        }
    }

    /// Escaped and wrapped to `width` columns; `None` or `0` leaves lines alone
    pub fn wrapped(plain: impl Into<String>, width: Option<usize>) -> Self {
        let plain = plain.into();
        let markup = match width {
            Some(width) if width > 0 => escape_markup(&wrap(&plain, width)),
            _ => escape_markup(&plain),
        };
        Self { markup, plain }
    }

    /// Plain text with a bold markup rendering
    pub fn bold(plain: impl Into<String>) -> Self {
        let plain = plain.into();
        Self {
            markup: format!("<b>{}</b>", escape_markup(&plain)),
            plain,
        }
    }
}

/// What the host does when an item is chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ItemAction {
    /// Close the launcher
    Hide,
    /// Copy the payload
    CopyToClipboard(String),
}

/// One row of the host's result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Main line
    pub title: DisplayText,
    /// Secondary line
    pub description: Option<DisplayText>,
    /// Icon path
    pub icon: String,
    /// Effect of choosing the item
    pub action: ItemAction,
}

/// Builds result items with shared icon and wrap settings
#[derive(Debug, Clone)]
pub struct ItemRenderer {
    icon: String,
    wrap_width: Option<usize>,
}

impl ItemRenderer {
    /// Renderer attaching `icon` and wrapping at `wrap_width`
    pub fn new(icon: impl Into<String>, wrap_width: Option<usize>) -> Self {
        Self {
            icon: icon.into(),
            wrap_width,
        }
    }

    fn item(&self, title: DisplayText, description: Option<DisplayText>, action: ItemAction) -> ResultItem {
        ResultItem {
            title,
            description,
            icon: self.icon.clone(),
            action,
        }
    }

    /// Shown for empty input
    pub fn prompt(&self) -> Vec<ResultItem> {
        vec![self.item(DisplayText::new(PROMPT_TITLE), None, ItemAction::Hide)]
    }

    /// Shown while the worker runs
    pub fn placeholder(&self, pair: &LanguagePair) -> Vec<ResultItem> {
        vec![self.item(
            DisplayText::new(PLACEHOLDER_TITLE),
            Some(DisplayText::new(pair.to_string())),
            ItemAction::Hide,
        )]
    }

    fn description(&self, usage: &str, pair: &LanguagePair) -> DisplayText {
        let plain = format!("{} | {}", usage, pair);
        DisplayText {
            markup: format!("{} | <b>{}</b>", escape_markup(usage), escape_markup(&pair.to_string())),
            plain,
        }
    }

    /// One copyable item for a single translation
    pub fn translation(&self, result: &TranslationResult, usage: &str, pair: &LanguagePair) -> Vec<ResultItem> {
        vec![self.item(
            DisplayText::wrapped(result.translated_text.clone(), self.wrap_width),
            Some(self.description(usage, pair)),
            ItemAction::CopyToClipboard(result.translated_text.clone()),
        )]
    }

    /// One copyable item per distinct candidate
    pub fn candidates(&self, set: &CandidateSet, usage: &str, pair: &LanguagePair) -> Vec<ResultItem> {
        if set.all_failed() {
            return vec![self.item(
                DisplayText::new(FAILED_TITLE),
                Some(DisplayText::wrapped(set.entries().join(" "), self.wrap_width)),
                ItemAction::Hide,
            )];
        }

        set.entries()
            .iter()
            .map(|text| {
                self.item(
                    DisplayText::wrapped(text.clone(), self.wrap_width),
                    Some(self.description(usage, pair)),
                    ItemAction::CopyToClipboard(text.clone()),
                )
            })
            .collect()
    }

    /// A translate-path error, with category title and status/message detail
    pub fn translation_error(&self, error: &TranslationError, pair: &LanguagePair) -> Vec<ResultItem> {
        let detail = format!("{} | {}", error, pair);
        vec![self.item(
            DisplayText::bold(error.category()),
            Some(DisplayText::wrapped(detail, self.wrap_width)),
            ItemAction::Hide,
        )]
    }

    /// The worker died before producing an outcome
    pub fn failure(&self, message: &str) -> Vec<ResultItem> {
        vec![self.item(
            DisplayText::bold(FAILED_TITLE),
            Some(DisplayText::wrapped(format!("Error: {}", message), self.wrap_width)),
            ItemAction::Hide,
        )]
    }
}

/// Escape the characters that are significant in Pango-style markup
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Greedy wrap on word boundaries, counting graphemes. Words longer than
/// `width` (and unspaced scripts such as CJK) are broken hard.
pub fn wrap(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0usize;

        for word in paragraph.split_word_bounds() {
            let word_len = word.graphemes(true).count();
            let is_space = word.chars().all(char::is_whitespace);

            if line_len + word_len <= width {
                if !(is_space && line_len == 0) {
                    line.push_str(word);
                    line_len += word_len;
                }
                continue;
            }

            if is_space {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line).trim_end().to_string());
                    line_len = 0;
                }
                continue;
            }

            if line_len > 0 && word_len <= width {
                lines.push(std::mem::take(&mut line).trim_end().to_string());
                line.push_str(word);
                line_len = word_len;
                continue;
            }

            for grapheme in word.graphemes(true) {
                if line_len == width {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                line.push_str(grapheme);
                line_len += 1;
            }
        }

        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}
