//! Shared output helpers for CLI commands
//!
//! Command results go to stdout as JSON. Warnings and notices go to stderr.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::errors::{Error, Warning};

/// Print data as pretty JSON on stdout
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

pub fn print_warning(warning: &Warning) {
    eprintln!("Warning: {}", warning.summary);
    eprintln!("  {}", warning.detail);
}

/// Surface the warning of a partial failure before handing the error to anyhow.
pub fn report(error: Error) -> anyhow::Error {
    if let Some(warning) = error.warning() {
        print_warning(warning);
    }
    anyhow::Error::new(error)
}

/// Parse a `key=value` metadata argument.
pub fn parse_metadata_entry(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("invalid metadata '{}': expected key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid metadata '{}': key cannot be empty", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn metadata_map(entries: Vec<(String, String)>) -> HashMap<String, String> {
    entries.into_iter().collect()
}
