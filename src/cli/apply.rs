//! Apply command.
//!
//! Stages a list of operations, prints the net diff, asks for
//! confirmation, and commits.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use dialoguer::Confirm;
use serde_json::json;
use thiserror::Error;

use crate::cli::output;
use crate::core::config::Config;
use crate::core::diff::{DiffEntry, DiffKind, DiffReport};
use crate::core::reconcile::{CancelToken, CommitResult, Reconciler};
use crate::core::stage::{Change, Target};
use crate::error::{Error, Result};

const VERBS: [&str; 5] = ["add", "edit", "rename", "delete", "undo"];

/// Why an operation argument could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid operation '{input}': {reason}")]
pub struct OpSpecError {
    input: String,
    reason: &'static str,
}

/// One operation argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpSpec {
    Stage { target: Target, change: Change },
    Undo,
}

impl FromStr for OpSpec {
    type Err = OpSpecError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let fail = |reason| OpSpecError {
            input: input.to_string(),
            reason,
        };

        let (target, body) = split_target(input.trim());
        let (verb, arg) = match body.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim_start()),
            None => (body, ""),
        };

        let pair = |arg: &str| -> std::result::Result<(String, String), OpSpecError> {
            let (key, value) = arg.split_once('=').ok_or_else(|| fail("expected KEY=VALUE"))?;
            Ok((key.trim().to_string(), value.to_string()))
        };

        let change = match verb {
            "undo" if target == Target::Root && arg.is_empty() => return Ok(OpSpec::Undo),
            "undo" => return Err(fail("undo takes no key or blob prefix")),
            "add" => {
                let (key, value) = pair(arg)?;
                Change::Add { key, value }
            }
            "edit" => {
                let (key, value) = pair(arg)?;
                Change::Edit { key, value }
            }
            "rename" => {
                let (from, to) = pair(arg)?;
                Change::Rename {
                    from,
                    to: to.trim().to_string(),
                }
            }
            "delete" if !arg.trim().is_empty() => Change::Delete {
                key: arg.trim().to_string(),
            },
            "delete" => return Err(fail("expected a key")),
            _ => return Err(fail("expected add, edit, rename, delete, or undo")),
        };

        Ok(OpSpec::Stage { target, change })
    }
}

/// Split an optional `BLOB: ` prefix off an operation.
fn split_target(input: &str) -> (Target, &str) {
    if let Some((head, rest)) = input.split_once(':') {
        let rest = rest.trim_start();
        let starts_with_verb = VERBS.iter().any(|v| {
            rest.strip_prefix(v)
                .is_some_and(|tail| tail.is_empty() || tail.starts_with(char::is_whitespace))
        });
        if !head.is_empty()
            && !head.contains(char::is_whitespace)
            && !head.contains('=')
            && starts_with_verb
        {
            return (Target::Blob(head.to_string()), rest);
        }
    }
    (Target::Root, input)
}

/// Stage `ops` on `project/environment`, review, and commit.
pub fn execute(
    config: &Config,
    project: &str,
    environment: &str,
    ops: &[String],
    yes: bool,
    json: bool,
) -> Result<()> {
    let specs = ops
        .iter()
        .map(|op| op.parse::<OpSpec>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut session = super::open_session(config, project, environment)?;
    for spec in specs {
        match spec {
            OpSpec::Undo => {
                if session.undo()?.is_none() {
                    output::warn("nothing to undo");
                }
            }
            OpSpec::Stage { target, change } => {
                session.stage(target, change)?;
            }
        }
    }

    let diff = session.build_diff();
    if diff.is_empty() {
        if json {
            println!("{}", json!({ "changes": [], "committed": false }));
        } else {
            output::success("nothing to commit");
        }
        return Ok(());
    }

    if !json {
        output::header(&format!("Pending changes for {}", session.scope()));
        print_diff(&diff);
    }

    if !yes {
        if !io::stdin().is_terminal() {
            return Err(Error::Other(
                "refusing to commit without confirmation; pass --yes".to_string(),
            ));
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Commit {} change(s)?", diff.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            output::warn("aborted, nothing committed");
            return Ok(());
        }
    }

    let reconciler = Reconciler::new(config.store.max_in_flight);
    let result = session.commit(&reconciler, &CancelToken::new());

    if json {
        let failed: serde_json::Map<_, _> = result
            .failed
            .iter()
            .map(|(key, err)| (key.clone(), json!(err.to_string())))
            .collect();
        let report = json!({
            "changes": diff,
            "committed": true,
            "succeeded": result.succeeded,
            "failed": failed,
            "skipped": result.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_result(&result);
    }

    if !result.is_complete() {
        return Err(Error::Other(format!(
            "{} change(s) were not committed",
            result.pending().len()
        )));
    }
    Ok(())
}

/// Print a diff, nested blob changes indented under their entry.
pub fn print_diff(diff: &DiffReport) {
    for entry in diff.entries() {
        print_entry(entry, 1);
    }
}

fn print_entry(entry: &DiffEntry, depth: usize) {
    let label = match entry.old_key() {
        Some(old) => format!("{} → {}", old, entry.key()),
        None => entry.key().to_string(),
    };
    let line = format!("{}{} {}", "  ".repeat(depth), entry.kind().marker(), label);
    let styled = output::styled(line);
    let styled = match entry.kind() {
        DiffKind::Added => styled.green(),
        DiffKind::Removed => styled.red(),
        DiffKind::Renamed => styled.yellow(),
        DiffKind::Edited => styled.blue(),
    };
    println!("{}", styled);

    if let Some(nested) = entry.nested() {
        for inner in nested.entries() {
            print_entry(inner, depth + 1);
        }
    }
}

fn print_result(result: &CommitResult) {
    for key in &result.succeeded {
        output::success(&format!("committed {}", output::key(key)));
    }
    for (key, err) in &result.failed {
        output::error(&format!("{}: {}", output::key(key), err));
    }
    for key in &result.skipped {
        output::warn(&format!("skipped {}", output::key(key)));
    }
    if result.failed.values().any(|e| e.is_retryable()) {
        output::hint("transient failures can be retried by running the same command again");
    }
}
