//! Show command.
//!
//! Prints the entries of one environment, or of one multiline secret.

use serde_json::json;

use crate::cli::output;
use crate::core::config::Config;
use crate::core::domain::Entry;
use crate::error::{Result, StagedChangeError};

/// Show entries of `project/environment`.
pub fn execute(
    config: &Config,
    project: &str,
    environment: &str,
    filter: Option<&str>,
    blob: Option<&str>,
    json: bool,
) -> Result<()> {
    let session = super::open_session(config, project, environment)?;
    let changes = session.changes();

    let entries: Vec<Entry> = match blob {
        Some(key) => {
            if changes.get(key).is_none() {
                return Err(StagedChangeError::UnknownKey(key.to_string()).into());
            }
            changes
                .blob(key)
                .ok_or_else(|| StagedChangeError::NotABlob(key.to_string()))?
                .into_entries()
        }
        None => changes.effective_view(),
    };

    let entries: Vec<Entry> = match filter {
        Some(query) => entries.into_iter().filter(|e| e.matches(query)).collect(),
        None => entries,
    };

    if json {
        let items: Vec<_> = entries
            .iter()
            .map(|e| json!({ "key": e.key(), "value": e.value(), "blob": e.is_blob() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let title = match blob {
        Some(key) => format!("{} {}", session.scope(), key),
        None => session.scope().to_string(),
    };
    output::header(&title);
    output::rule();

    let width = entries.iter().map(|e| e.key().len()).max().unwrap_or(0);
    for entry in &entries {
        let padded = format!("{:width$}", entry.key(), width = width);
        if entry.is_blob() {
            let count = crate::core::blob::parse(entry.value()).len();
            println!(
                "  {}  {}",
                output::key(&padded),
                output::dim(&format!("[{} entries]", count))
            );
        } else {
            println!("  {}  {}", output::key(&padded), entry.value());
        }
    }

    if entries.is_empty() {
        output::warn("no matching entries");
    }

    Ok(())
}
