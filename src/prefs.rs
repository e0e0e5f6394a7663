//! Theme and font-size preferences.
//!
//! Storage is best-effort: a failing [`KeyValueStore`] is logged at debug
//! level and otherwise ignored, so the page always reflects the requested
//! preference.

use crate::page::Page;
use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const THEME_KEY: &str = "theme";
pub const FONT_SIZE_KEY: &str = "fontSize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn body_class(&self) -> &'static str {
        match self {
            Theme::Light => "light-mode",
            Theme::Dark => "dark-mode",
        }
    }

    pub fn other(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Label for the toggle control, naming the theme it would switch to.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            Theme::Dark => "Switch to light",
            Theme::Light => "Switch to dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    Xlarge,
}

impl FontSize {
    /// Ordered smallest to largest.
    pub const SCALE: [FontSize; 4] = [
        FontSize::Small,
        FontSize::Medium,
        FontSize::Large,
        FontSize::Xlarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
            FontSize::Xlarge => "xlarge",
        }
    }

    pub fn pixels(&self) -> u32 {
        match self {
            FontSize::Small => 14,
            FontSize::Medium => 16,
            FontSize::Large => 18,
            FontSize::Xlarge => 20,
        }
    }

    pub fn css_value(&self) -> String {
        format!("{}px", self.pixels())
    }

    fn index(&self) -> usize {
        Self::SCALE
            .iter()
            .position(|size| size == self)
            .unwrap_or(0)
    }

    /// One step larger, staying at the top of the scale.
    pub fn larger(&self) -> FontSize {
        Self::SCALE[(self.index() + 1).min(Self::SCALE.len() - 1)]
    }

    /// One step smaller, staying at the bottom of the scale.
    pub fn smaller(&self) -> FontSize {
        Self::SCALE[self.index().saturating_sub(1)]
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::SCALE
            .iter()
            .copied()
            .find(|size| size.as_str() == value)
            .ok_or_else(|| format!("unknown font size {value:?}"))
    }
}

/// Applies preferences to a [`Page`] and persists them through `S`.
#[derive(Debug)]
pub struct PreferenceStore<S> {
    store: S,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Restores saved preferences, defaulting the theme to dark.
    pub fn init(&self, page: &mut Page) {
        self.init_theme(page);
        self.init_font_size(page);
    }

    pub fn init_theme(&self, page: &mut Page) {
        let saved = self
            .read(THEME_KEY)
            .and_then(|value| value.parse::<Theme>().ok());
        self.set_theme(page, saved.unwrap_or_default());
    }

    pub fn set_theme(&self, page: &mut Page, theme: Theme) {
        for known in Theme::ALL {
            page.body_classes.remove(known.body_class());
        }
        page.body_classes.insert(theme.body_class().to_string());
        self.write(THEME_KEY, theme.as_str());
        if let Some(label) = page.theme_toggle.as_mut() {
            *label = theme.toggle_label().to_string();
        }
    }

    /// Flips the theme currently shown on the page and returns the new one.
    pub fn toggle_theme(&self, page: &mut Page) -> Theme {
        let next = current_theme(page).other();
        self.set_theme(page, next);
        next
    }

    pub fn init_font_size(&self, page: &mut Page) {
        if let Some(saved) = self.read(FONT_SIZE_KEY).filter(|saved| !saved.is_empty()) {
            self.apply_font_size(page, &saved);
        }
    }

    /// Applies a size by name; unrecognized names resolve to medium.
    pub fn apply_font_size(&self, page: &mut Page, name: &str) -> FontSize {
        let size = name.parse::<FontSize>().unwrap_or_default();
        page.root_font_size = Some(size.css_value());
        self.write(FONT_SIZE_KEY, size.as_str());
        size
    }

    pub fn increase_text(&self, page: &mut Page) -> FontSize {
        let next = self.saved_font_size().larger();
        self.apply_font_size(page, next.as_str())
    }

    pub fn decrease_text(&self, page: &mut Page) -> FontSize {
        let next = self.saved_font_size().smaller();
        self.apply_font_size(page, next.as_str())
    }

    pub fn reset_text(&self, page: &mut Page) -> FontSize {
        self.apply_font_size(page, FontSize::Medium.as_str())
    }

    /// The persisted size. Nothing saved reads as medium; a value outside the
    /// scale reads as the smallest step.
    pub fn saved_font_size(&self) -> FontSize {
        match self.read(FONT_SIZE_KEY) {
            None => FontSize::Medium,
            Some(value) => value.parse().unwrap_or(FontSize::Small),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                debug!(key, error = %err, "preference read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            debug!(key, value, error = %err, "preference write failed");
        }
    }
}

/// The theme the page currently shows, judged by its body class.
pub fn current_theme(page: &Page) -> Theme {
    if page.has_body_class(Theme::Dark.body_class()) {
        Theme::Dark
    } else {
        Theme::Light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::testing::UnavailableStore;

    fn prefs_with(entries: &[(&str, &str)]) -> PreferenceStore<MemoryStore> {
        PreferenceStore::new(MemoryStore::with_entries(entries.iter().copied()))
    }

    #[test]
    fn theme_defaults_to_dark() {
        let prefs = prefs_with(&[]);
        let mut page = Page::new();
        prefs.init(&mut page);
        assert!(page.has_body_class("dark-mode"));
        assert_eq!(page.theme_toggle.as_deref(), Some("Switch to light"));
        assert_eq!(
            prefs.store().get(THEME_KEY).unwrap().as_deref(),
            Some("dark")
        );
        assert_eq!(page.root_font_size, None);
    }

    #[test]
    fn saved_light_theme_is_restored() {
        let prefs = prefs_with(&[("theme", "light")]);
        let mut page = Page::new();
        prefs.init_theme(&mut page);
        assert!(page.has_body_class("light-mode"));
        assert!(!page.has_body_class("dark-mode"));
        assert_eq!(page.theme_toggle.as_deref(), Some("Switch to dark"));
    }

    #[test]
    fn invalid_saved_theme_falls_back() {
        let prefs = prefs_with(&[("theme", "solarized")]);
        let mut page = Page::new();
        prefs.init_theme(&mut page);
        assert_eq!(current_theme(&page), Theme::Dark);
    }

    #[test]
    fn toggle_flips_body_class() {
        let prefs = prefs_with(&[]);
        let mut page = Page::new();
        page.body_classes.insert("compact".into());
        prefs.init_theme(&mut page);
        assert_eq!(prefs.toggle_theme(&mut page), Theme::Light);
        assert!(page.has_body_class("light-mode"));
        assert!(page.has_body_class("compact"));
        assert_eq!(prefs.toggle_theme(&mut page), Theme::Dark);
        assert_eq!(page.body_classes.len(), 2);
    }

    #[test]
    fn toggle_without_theme_class_goes_dark() {
        let prefs = prefs_with(&[]);
        let mut page = Page::minimal();
        assert_eq!(prefs.toggle_theme(&mut page), Theme::Dark);
        assert_eq!(page.theme_toggle, None);
    }

    #[test]
    fn font_size_steps_clamp() {
        let prefs = prefs_with(&[("fontSize", "xlarge")]);
        let mut page = Page::new();
        assert_eq!(prefs.increase_text(&mut page), FontSize::Xlarge);
        assert_eq!(page.root_font_size.as_deref(), Some("20px"));

        prefs.apply_font_size(&mut page, "small");
        assert_eq!(prefs.decrease_text(&mut page), FontSize::Small);
        assert_eq!(page.root_font_size.as_deref(), Some("14px"));

        assert_eq!(prefs.increase_text(&mut page), FontSize::Medium);
        assert_eq!(prefs.increase_text(&mut page), FontSize::Large);
        assert_eq!(prefs.reset_text(&mut page), FontSize::Medium);
        assert_eq!(page.root_font_size.as_deref(), Some("16px"));
    }

    #[test]
    fn nothing_saved_steps_from_medium() {
        let prefs = prefs_with(&[]);
        let mut page = Page::new();
        assert_eq!(prefs.decrease_text(&mut page), FontSize::Small);
    }

    #[test]
    fn unknown_saved_size_steps_from_smallest() {
        let prefs = prefs_with(&[("fontSize", "huge")]);
        let mut page = Page::new();
        assert_eq!(prefs.increase_text(&mut page), FontSize::Medium);
    }

    #[test]
    fn unknown_name_applies_medium() {
        let prefs = prefs_with(&[]);
        let mut page = Page::new();
        assert_eq!(prefs.apply_font_size(&mut page, "gigantic"), FontSize::Medium);
        assert_eq!(page.root_font_size.as_deref(), Some("16px"));
        assert_eq!(
            prefs.store().get(FONT_SIZE_KEY).unwrap().as_deref(),
            Some("medium")
        );
    }

    #[test]
    fn saved_font_is_restored_on_init() {
        let prefs = prefs_with(&[("fontSize", "large")]);
        let mut page = Page::new();
        prefs.init(&mut page);
        assert_eq!(page.root_font_size.as_deref(), Some("18px"));
    }

    #[test]
    fn empty_saved_font_is_left_alone() {
        let prefs = prefs_with(&[("fontSize", "")]);
        let mut page = Page::new();
        prefs.init(&mut page);
        assert_eq!(page.root_font_size, None);
        assert_eq!(
            prefs.store().get(FONT_SIZE_KEY).unwrap().as_deref(),
            Some("")
        );
    }

    #[test]
    fn storage_failures_do_not_change_the_page() {
        let prefs = PreferenceStore::new(UnavailableStore);
        let mut page = Page::new();
        prefs.init(&mut page);
        assert!(page.has_body_class("dark-mode"));
        assert_eq!(page.theme_toggle.as_deref(), Some("Switch to light"));
        prefs.toggle_theme(&mut page);
        assert!(page.has_body_class("light-mode"));
        assert_eq!(prefs.increase_text(&mut page), FontSize::Large);
        assert_eq!(page.root_font_size.as_deref(), Some("18px"));
    }

    #[test]
    fn font_scale_names_roundtrip() {
        for size in FontSize::SCALE {
            assert_eq!(size.as_str().parse::<FontSize>().unwrap(), size);
        }
        assert!("XL".parse::<FontSize>().is_err());
    }
}
