use crate::detail::DetailView;
use crate::model::Article;
use serde::Serialize;
use std::collections::BTreeSet;

/// Elements the host page provides, by their DOM id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementId {
    #[serde(rename = "searchInput")]
    SearchInput,
    #[serde(rename = "exactOnly")]
    ExactOnly,
    #[serde(rename = "results")]
    Results,
    #[serde(rename = "resultsSummary")]
    ResultsSummary,
    #[serde(rename = "detailPanel")]
    DetailPanel,
    #[serde(rename = "themeToggle")]
    ThemeToggle,
}

impl ElementId {
    pub fn dom_id(&self) -> &'static str {
        match self {
            ElementId::SearchInput => "searchInput",
            ElementId::ExactOnly => "exactOnly",
            ElementId::Results => "results",
            ElementId::ResultsSummary => "resultsSummary",
            ElementId::DetailPanel => "detailPanel",
            ElementId::ThemeToggle => "themeToggle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultLink {
    pub href: String,
    pub label: String,
    pub new_context: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionButton {
    pub label: String,
    pub highlighted: bool,
}

/// One rendered list item. Button `i` belongs to `article.sections[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub link: ResultLink,
    pub meta: String,
    pub buttons: Vec<SectionButton>,
    #[serde(skip)]
    pub article: Article,
}

impl ResultEntry {
    pub fn from_article(article: Article) -> Self {
        let link = ResultLink {
            href: article.href().to_string(),
            label: article.display_name().to_string(),
            new_context: true,
        };
        let buttons = article
            .sections
            .iter()
            .enumerate()
            .map(|(idx, section)| SectionButton {
                label: section
                    .title
                    .clone()
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| format!("section {}", idx + 1)),
                highlighted: section.matched,
            })
            .collect();
        Self {
            link,
            meta: article.meta_line(),
            buttons,
            article,
        }
    }
}

/// Content of the `results` container: either status text or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum ResultsArea {
    Text(String),
    List(Vec<ResultEntry>),
}

impl Default for ResultsArea {
    fn default() -> Self {
        ResultsArea::Text(String::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailPanel {
    pub view: Option<DetailView>,
    pub tabindex: Option<i32>,
}

/// View model of the host document.
///
/// Optional elements of the page contract are `Option` fields; `None` means
/// the host does not provide that element and writes to it are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub search_input: String,
    pub exact_only: Option<bool>,
    pub results: ResultsArea,
    pub results_summary: Option<String>,
    pub detail_panel: DetailPanel,
    pub theme_toggle: Option<String>,
    pub body_classes: BTreeSet<String>,
    pub root_font_size: Option<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self {
            search_input: String::new(),
            exact_only: Some(false),
            results: ResultsArea::default(),
            results_summary: Some(String::new()),
            detail_panel: DetailPanel::default(),
            theme_toggle: Some(String::new()),
            body_classes: BTreeSet::new(),
            root_font_size: None,
        }
    }

    /// A page with only the required elements.
    pub fn minimal() -> Self {
        Self {
            exact_only: None,
            results_summary: None,
            theme_toggle: None,
            ..Self::new()
        }
    }

    pub fn has_element(&self, id: ElementId) -> bool {
        match id {
            ElementId::ExactOnly => self.exact_only.is_some(),
            ElementId::ResultsSummary => self.results_summary.is_some(),
            ElementId::ThemeToggle => self.theme_toggle.is_some(),
            ElementId::SearchInput | ElementId::Results | ElementId::DetailPanel => true,
        }
    }

    pub fn exact_only_checked(&self) -> bool {
        self.exact_only.unwrap_or(false)
    }

    pub fn set_results_text(&mut self, text: impl Into<String>) {
        self.results = ResultsArea::Text(text.into());
    }

    pub fn results_text(&self) -> Option<&str> {
        match &self.results {
            ResultsArea::Text(text) => Some(text),
            ResultsArea::List(_) => None,
        }
    }

    pub fn entries(&self) -> &[ResultEntry] {
        match &self.results {
            ResultsArea::List(entries) => entries,
            ResultsArea::Text(_) => &[],
        }
    }

    pub fn set_summary(&mut self, text: impl Into<String>) {
        if let Some(summary) = self.results_summary.as_mut() {
            *summary = text.into();
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.results_summary.as_deref()
    }

    pub fn clear_detail(&mut self) {
        self.detail_panel.view = None;
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail_panel.view.as_ref()
    }

    pub fn has_body_class(&self, class: &str) -> bool {
        self.body_classes.contains(class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDispatch {
    pub default_prevented: bool,
    pub submitted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    #[test]
    fn minimal_page_drops_optional_writes() {
        let mut page = Page::minimal();
        page.set_summary("Found 0 articles.");
        assert_eq!(page.summary(), None);
        assert!(!page.has_element(ElementId::ThemeToggle));
        assert!(!page.exact_only_checked());
        assert!(page.has_element(ElementId::DetailPanel));
    }

    #[test]
    fn entry_buttons_follow_sections() {
        let article = Article {
            name: Some("Voyager".into()),
            match_count: 1,
            sections: vec![
                Section {
                    title: Some("Launch".into()),
                    matched: true,
                    ..Section::default()
                },
                Section::default(),
            ],
            ..Article::default()
        };
        let entry = ResultEntry::from_article(article);
        assert_eq!(entry.link.href, "#");
        assert_eq!(entry.link.label, "Voyager");
        assert!(entry.link.new_context);
        assert_eq!(entry.meta, "1 matches");
        assert_eq!(
            entry.buttons,
            vec![
                SectionButton {
                    label: "Launch".into(),
                    highlighted: true
                },
                SectionButton {
                    label: "section 2".into(),
                    highlighted: false
                },
            ]
        );
    }

    #[test]
    fn results_area_accessors() {
        let mut page = Page::new();
        page.set_results_text("Searching...");
        assert_eq!(page.results_text(), Some("Searching..."));
        assert!(page.entries().is_empty());
        page.results = ResultsArea::List(vec![ResultEntry::from_article(Article::default())]);
        assert_eq!(page.results_text(), None);
        assert_eq!(page.entries().len(), 1);
    }
}
