//! Contexts command.
//!
//! Lists every project/environment pair the configuration can resolve.

use serde_json::json;

use crate::cli::output;
use crate::core::config::Config;
use crate::error::Result;

/// List configured contexts.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let contexts = config.contexts();

    if json {
        let items: Vec<_> = contexts
            .iter()
            .map(|(project, environment)| json!({ "project": project, "environment": environment }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if contexts.is_empty() {
        output::warn("no contexts configured");
        if let Ok(path) = Config::path() {
            output::hint(&format!("edit {}", path.display()));
        }
        return Ok(());
    }

    output::header(&format!("Contexts ({})", config.store.backend));
    for (project, environment) in &contexts {
        println!("  {}/{}", output::key(project), environment);
    }

    Ok(())
}
