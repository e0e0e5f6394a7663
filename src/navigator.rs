use crate::page::ElementId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationError {
    message: String,
}

impl NavigationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "navigation error: {}", self.message)
    }
}

impl std::error::Error for NavigationError {}

/// Window-level effects a host environment performs on behalf of the page.
pub trait Navigator {
    fn open_external(&mut self, url: &str) -> Result<(), NavigationError>;

    fn scroll_to_origin(&mut self) -> Result<(), NavigationError>;

    fn focus(&mut self, target: ElementId) -> Result<(), NavigationError>;

    /// Sets the location fragment (without the leading `#`), jumping to the
    /// element with that id.
    fn set_fragment(&mut self, fragment: &str) -> Result<(), NavigationError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "at", content = "id")]
pub enum ScrollPosition {
    #[default]
    Origin,
    Anchor(String),
}

/// A navigator that records every effect. Front ends read it back after each
/// operation to decide what to show.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Viewport {
    pub fragment: Option<String>,
    pub position: ScrollPosition,
    pub focused: Option<ElementId>,
    pub opened: Vec<String>,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus starts on the search field, as with an autofocused input.
    pub fn with_search_focus() -> Self {
        Self {
            focused: Some(ElementId::SearchInput),
            ..Self::default()
        }
    }

    pub fn take_opened(&mut self) -> Vec<String> {
        std::mem::take(&mut self.opened)
    }
}

impl Navigator for Viewport {
    fn open_external(&mut self, url: &str) -> Result<(), NavigationError> {
        self.opened.push(url.to_string());
        Ok(())
    }

    fn scroll_to_origin(&mut self) -> Result<(), NavigationError> {
        self.position = ScrollPosition::Origin;
        Ok(())
    }

    fn focus(&mut self, target: ElementId) -> Result<(), NavigationError> {
        self.focused = Some(target);
        Ok(())
    }

    fn set_fragment(&mut self, fragment: &str) -> Result<(), NavigationError> {
        self.fragment = Some(fragment.to_string());
        self.position = ScrollPosition::Anchor(fragment.to_string());
        Ok(())
    }
}
