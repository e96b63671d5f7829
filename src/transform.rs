//! Declared field mapping between the frontends' camelCase JSON and the
//! backend's snake_case JSON.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Key-case policy applied to every object key a `FieldMap` touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    #[default]
    Preserve,
    Snake,
    Camel,
}

/// FieldMap
///
/// A request or response transformer: explicit renames first, then the key-case
/// policy for every key that was not renamed. Applied recursively to nested
/// objects and arrays so list endpoints and `{ data: ... }` envelopes are covered.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    renames: Vec<(&'static str, &'static str)>,
    case: KeyCase,
}

impl FieldMap {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn rename(mut self, from: &'static str, to: &'static str) -> Self {
        self.renames.push((from, to));
        self
    }

    pub fn keys(mut self, case: KeyCase) -> Self {
        self.case = case;
        self
    }

    pub fn is_identity(&self) -> bool {
        self.renames.is_empty() && self.case == KeyCase::Preserve
    }

    pub fn apply(&self, value: Value) -> Value {
        if self.is_identity() {
            return value;
        }
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, v)| (self.map_key(&key), self.apply(v)))
                    .collect::<Map<String, Value>>(),
            ),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
            other => other,
        }
    }

    fn map_key(&self, key: &str) -> String {
        if let Some((_, to)) = self.renames.iter().find(|(from, _)| *from == key) {
            return to.to_string();
        }
        match self.case {
            KeyCase::Preserve => key.to_string(),
            KeyCase::Snake => camel_to_snake(key),
            KeyCase::Camel => snake_to_camel(key),
        }
    }
}

/// `storyId` -> `story_id`, `bankAccountID` -> `bank_account_id`.
pub fn camel_to_snake(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // End of an acronym run: "HTMLParser" splits before "P".
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `story_id` -> `storyId`. Leading underscores are kept.
pub fn snake_to_camel(key: &str) -> String {
    let leading = key.len() - key.trim_start_matches('_').len();
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..leading]);
    let mut upper = false;
    for c in key[leading..].chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Body schema check used by catalog routes: the mapped body must deserialize into `T`.
pub type Validator = fn(&Value) -> Result<(), String>;

pub fn validate_as<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
}
