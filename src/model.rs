use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub matched: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub excerpt: Option<String>,
}

impl Section {
    pub fn label(&self) -> &str {
        non_empty(&self.title)
            .or(non_empty(&self.kind))
            .unwrap_or("section")
    }

    /// Body text: `content` when non-empty, else `excerpt`, else nothing.
    pub fn body(&self) -> &str {
        non_empty(&self.content)
            .or(non_empty(&self.excerpt))
            .unwrap_or("")
    }
}

/// Which field of the response the canonical section list came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionOrigin {
    Sections,
    Matches,
    #[default]
    None,
}

/// One search result. The `sections` / `matches` split of the wire format is
/// resolved once here, so renderers only ever see `sections`. `origin` is
/// always derived from that split and never read from input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ArticleRecord")]
pub struct Article {
    pub name: Option<String>,
    pub link: Option<String>,
    pub match_count: u64,
    pub occurrence_count: u64,
    pub word_match_count: u64,
    pub sections: Vec<Section>,
    pub origin: SectionOrigin,
}

impl Article {
    pub fn href(&self) -> &str {
        non_empty(&self.link).unwrap_or("#")
    }

    pub fn display_name(&self) -> &str {
        non_empty(&self.name)
            .or(non_empty(&self.link))
            .unwrap_or("Untitled")
    }

    pub fn anchor_base(&self) -> &str {
        non_empty(&self.name)
            .or(non_empty(&self.link))
            .unwrap_or("article")
    }

    /// `"{n} matches"` followed by occurrences, or failing that words.
    pub fn meta_line(&self) -> String {
        let mut parts = vec![format!("{} matches", self.match_count)];
        if self.occurrence_count > 0 {
            parts.push(format!("{} occurrences", self.occurrence_count));
        } else if self.word_match_count > 0 {
            parts.push(format!("{} words", self.word_match_count));
        }
        parts.join(" • ")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

#[derive(Deserialize)]
struct ArticleRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    link: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    match_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    occurrence_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    word_match_count: u64,
    #[serde(default, deserialize_with = "lenient_sections")]
    sections: Option<Vec<Section>>,
    #[serde(default, deserialize_with = "lenient_sections")]
    matches: Option<Vec<Section>>,
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        let (sections, origin) = match (record.sections, record.matches) {
            (Some(sections), _) if !sections.is_empty() => (sections, SectionOrigin::Sections),
            (_, Some(matches)) if !matches.is_empty() => (matches, SectionOrigin::Matches),
            _ => (Vec::new(), SectionOrigin::None),
        };
        Self {
            name: record.name,
            link: record.link,
            match_count: record.match_count,
            occurrence_count: record.occurrence_count,
            word_match_count: record.word_match_count,
            sections,
            origin,
        }
    }
}

/// Interprets a successful response body.
///
/// Anything other than a JSON array is an empty result set. Array elements
/// that are not objects become default articles.
pub fn articles_from_value(value: Value) -> Vec<Article> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) if !text.is_empty() => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v > 0.0).map(|v| v as u64))
            .unwrap_or(0),
        _ => 0,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|v| v != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    })
}

fn lenient_sections<'de, D>(deserializer: D) -> Result<Option<Vec<Section>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(_) => serde_json::from_value(item).map_err(de::Error::custom),
                _ => Ok(Section::default()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Ok(None),
    }
}
