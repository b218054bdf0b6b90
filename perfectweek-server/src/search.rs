use std::collections::HashSet;
use std::str::FromStr;

use perfectweek_common::non_api_structs::FieldKind;
use serde_json::Value;

use crate::query::text_of;

/// How text columns are matched, mirroring the full-text behaviour of the
/// SQL backend a deployment used to run on.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Default)]
pub enum SearchDialect {
    /// `MATCH(..) AGAINST('*q*' IN BOOLEAN MODE)`: substring of any text column.
    MySql,
    /// `to_tsvector(..) @@ to_tsquery(q)`: every query word is a word of the text.
    #[default]
    Postgres,
}

impl FromStr for SearchDialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(SearchDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SearchDialect::Postgres),
            other => Err(anyhow::anyhow!("unknown search dialect `{other}`")),
        }
    }
}

/// Keeps ASCII alphanumerics, `.`, `-` and whitespace.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-' || c.is_whitespace())
        .collect()
}

pub struct Matcher {
    lowered: String,
    number: Option<f64>,
    boolean: Option<bool>,
    dialect: SearchDialect,
}

impl Matcher {
    pub fn new(raw: &str, dialect: SearchDialect) -> Self {
        let query = sanitize(raw);
        let trimmed = query.trim();
        Self {
            number: trimmed.parse().ok(),
            boolean: match trimmed {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            lowered: trimmed.to_lowercase(),
            dialect,
        }
    }

    pub fn matches(&self, schema: &'static [(&'static str, FieldKind)], record: &Value) -> bool {
        if self.lowered.is_empty() {
            return true;
        }
        let field = |name: &str| record.get(name).unwrap_or(&Value::Null);

        let other = FieldKind::fields_of(schema, FieldKind::Other)
            .map(field)
            .filter(|value| !value.is_null())
            .any(|value| text_of(value).to_lowercase().contains(&self.lowered));
        let numeric = self.number.map_or(false, |number| {
            FieldKind::fields_of(schema, FieldKind::Numeric)
                .filter_map(|name| field(name).as_f64())
                .any(|value| value == number)
        });
        let boolean = self.boolean.map_or(false, |flag| {
            FieldKind::fields_of(schema, FieldKind::Boolean)
                .filter_map(|name| field(name).as_bool())
                .any(|value| value == flag)
        });

        other || numeric || boolean || self.matches_text(schema, record)
    }

    fn matches_text(&self, schema: &'static [(&'static str, FieldKind)], record: &Value) -> bool {
        let texts = FieldKind::fields_of(schema, FieldKind::Text)
            .filter_map(|name| record.get(name).and_then(Value::as_str))
            .map(str::to_lowercase);
        match self.dialect {
            SearchDialect::MySql => texts.into_iter().any(|text| text.contains(&self.lowered)),
            SearchDialect::Postgres => {
                let words: HashSet<String> = texts
                    .flat_map(|text| words_of(&text).map(str::to_string).collect::<Vec<_>>())
                    .collect();
                let mut terms = words_of(&self.lowered).peekable();
                terms.peek().is_some() && terms.all(|term| words.contains(term))
            }
        }
    }
}

fn words_of(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}
