//! Reverse Translator
//!
//! Reads a persisted manifest and maps short keys in optimized code or
//! runtime error text back to what they stood for. The translator is
//! immutable after construction and can be shared across threads.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::collect::LiteralValue;
use crate::manifest::Manifest;

lazy_static::lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").unwrap();

    /// Ordered `(pattern, suggestion)` table scanned against translated text.
    static ref SUGGESTION_RULES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"is not a function").unwrap(),
            "A function is missing or incorrectly defined: check that it is declared, imported, and spelled correctly before it is called.",
        ),
        (
            Regex::new(r"is not defined").unwrap(),
            "A name is referenced outside its scope or before it is declared: check imports and declarations.",
        ),
        (
            Regex::new(r"Cannot read propert(y|ies) of (undefined|null)|is (undefined|null)").unwrap(),
            "A value was null or undefined when one of its members was accessed: guard the access or check where the value comes from.",
        ),
        (
            Regex::new(r"is not a constructor").unwrap(),
            "The value used with `new` is not a class or constructor function: check the import and export shape.",
        ),
        (
            Regex::new(r"ENOENT|[Nn]o such file or directory|Cannot find module|Module not found").unwrap(),
            "A file or module could not be found: check the path and that the dependency is installed.",
        ),
        (
            Regex::new(r"Invalid hook call|Rendered (more|fewer) hooks|Hooks can only be called").unwrap(),
            "A framework hook was called incorrectly: hooks must run at the top level of a component or custom hook, in the same order on every render.",
        ),
        (
            Regex::new(r"Maximum call stack size exceeded|too much recursion").unwrap(),
            "Unbounded recursion: look for a function or effect that calls itself without a base case.",
        ),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTranslation {
    pub translated_message: String,
    pub translated_stack: Option<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReverseTranslator {
    table: HashMap<String, String>,
}

impl ReverseTranslator {
    /// Flatten a manifest into one key table. Literal keys translate back to
    /// source form (quoted strings, canonical numbers).
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut table = HashMap::new();
        for category in manifest.categories.values() {
            for (key, original) in category {
                table.insert(key.clone(), original.clone());
            }
        }
        for (key, value) in &manifest.strings {
            table.insert(key.clone(), LiteralValue::String(value.clone()).source_text());
        }
        for (key, value) in &manifest.numbers {
            table.insert(key.clone(), value.to_string());
        }
        Self { table }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.table.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Whole-token substitution. Tokens are matched maximally, so `v12` is
    /// never read as `v1` followed by `2`.
    pub fn translate_code(&self, optimized: &str) -> String {
        if self.table.is_empty() {
            return optimized.to_string();
        }
        TOKEN
            .replace_all(optimized, |caps: &Captures| {
                let token = &caps[0];
                self.table
                    .get(token)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }

    pub fn translate_error(&self, message: &str, stack: Option<&str>) -> ErrorTranslation {
        let translated_message = self.translate_code(message);
        let translated_stack = stack.map(|s| self.translate_code(s));

        let mut suggestions: Vec<String> = Vec::new();
        let haystacks = std::iter::once(translated_message.as_str()).chain(translated_stack.as_deref());
        for text in haystacks {
            for (pattern, suggestion) in SUGGESTION_RULES.iter() {
                if pattern.is_match(text) && !suggestions.iter().any(|s| s == suggestion) {
                    suggestions.push(suggestion.to_string());
                }
            }
        }

        ErrorTranslation {
            translated_message,
            translated_stack,
            suggestions,
        }
    }
}
