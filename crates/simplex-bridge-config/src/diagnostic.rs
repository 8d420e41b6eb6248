// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Unknown keys are checked against the key tables in [`crate::model`] and get
//! a "did you mean" hint. When the offending file is known, the diagnostic
//! points at the key inside it.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model;

const MIN_SIMILARITY: f64 = 0.8;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(simplex_bridge::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted where `key` was found.
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(simplex_bridge::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted key path, e.g. `simplex.event_queue_capacity`.
        key: String,
        found: String,
        expected: String,
        #[label("this value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value parsed fine but is out of range or malformed.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(simplex_bridge::config::validation))]
    Validation { key: String, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(simplex_bridge::config::other))]
    Other(String),
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error carried by `err` into a diagnostic.
///
/// `sources` pairs file paths with their contents and is used to attach
/// spans. A lone source is used for errors that name no file, which covers
/// configs loaded from a string.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            let source = source_for(&error, sources);
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let valid: Vec<&str> = match model::keys_at(&path) {
                        Some(keys) => keys.to_vec(),
                        None => expected.to_vec(),
                    };
                    let (span, src) = locate(source, &path, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: closest_key(field, &valid).map(str::to_string),
                        valid_keys: valid.join(", "),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(found, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((key, table)) => locate(source, table, key),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: found.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn source_for<'a>(
    error: &figment::Error,
    sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| s.file_path());
    match (file, sources) {
        (Some(file), _) => {
            let file = file.display().to_string();
            sources.iter().find(|(path, _)| *path == file)
        }
        (None, [only]) => Some(only),
        (None, _) => None,
    }
}

fn locate(
    source: Option<&(String, String)>,
    table: &[String],
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((path, content)) = source else {
        return (None, None);
    };
    match key_offset(content, table, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside the table at `table`.
///
/// Only root keys and single-level `[section]` tables occur in this config.
/// For the root, a section name matches its `[name]` header.
fn key_offset(content: &str, table: &[String], key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            let header = header.trim();
            if table.is_empty() && header == key {
                return Some(offset + line.find(key)?);
            }
            current = Some(header);
        } else if let Some((name, _)) = trimmed.split_once('=') {
            let in_table = match (current, table) {
                (None, []) => true,
                (Some(section), [wanted]) => section == wanted,
                _ => false,
            };
            if in_table && name.trim() == key {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

fn closest_key<'a>(unknown: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), *c))
        .filter(|(score, _)| *score >= MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

/// Prints each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
