//! Azure Key Vault backend.
//!
//! Shells out to `az keyvault secret` so no Azure SDK is needed. The `az`
//! CLI must already be signed in (`az login` or a service principal in the
//! environment).
//!
//! Every call runs under the configured timeout; a call that overruns is
//! killed and reported as [`StoreError::Transient`].

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::SecretStore;
use crate::core::constants::AZ_BINARY;
use crate::core::domain::{Entry, ScopeHandle};
use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Values fetched concurrently while listing a vault.
const FETCH_WORKERS: usize = 8;

/// Secret store backed by the `az` CLI.
#[derive(Debug, Clone)]
pub struct AzureCliStore {
    binary: PathBuf,
    timeout: Duration,
}

impl AzureCliStore {
    /// Find `az` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unknown` if the CLI is not installed.
    pub fn locate(timeout: Duration) -> Result<Self> {
        let binary = which::which(AZ_BINARY).map_err(|_| {
            StoreError::Unknown(
                "az CLI not found. Install it from https://aka.ms/installazurecli".to_string(),
            )
        })?;
        debug!(path = %binary.display(), "found az CLI");
        Ok(Self::with_binary(binary, timeout))
    }

    /// Use a specific `az` executable.
    pub fn with_binary(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn args(scope: &ScopeHandle, verb: &str, key: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = ["keyvault", "secret", verb, "--vault-name", scope.vault()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(key) = key {
            args.extend(["--name".to_string(), key.to_string()]);
        }
        if let Some(subscription) = scope.subscription() {
            args.extend(["--subscription".to_string(), subscription.to_string()]);
        }
        args
    }

    fn names(&self, scope: &ScopeHandle) -> Result<Vec<String>> {
        let mut args = Self::args(scope, "list", None);
        args.extend(
            ["--query", "[?attributes.enabled].name", "--output", "json"]
                .iter()
                .map(|s| s.to_string()),
        );
        let out = self.run(&args)?;
        serde_json::from_str(&out)
            .map_err(|e| StoreError::Unknown(format!("unexpected az list output: {}", e)))
    }

    fn run(&self, args: &[String]) -> Result<Zeroizing<String>> {
        // args[2] is the verb; values never reach the log
        trace!(verb = args.get(2).map(String::as_str), "running az");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoreError::Unknown(format!("failed to spawn az: {}", e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = thread::spawn(move || read_pipe(stdout));
        let err_reader = thread::spawn(move || read_pipe(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StoreError::Transient(format!(
                        "az timed out after {}s",
                        self.timeout.as_secs()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(StoreError::Unknown(format!("failed to wait for az: {}", e))),
            }
        };

        let stdout = Zeroizing::new(out_reader.join().unwrap_or_default());
        let stderr = err_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&stderr)));
        }

        Ok(Zeroizing::new(String::from_utf8_lossy(&stdout).into_owned()))
    }
}

impl SecretStore for AzureCliStore {
    fn list(&self, scope: &ScopeHandle) -> Result<Vec<Entry>> {
        let names = self.names(scope)?;
        debug!(vault = scope.vault(), secrets = names.len(), "listed vault");

        let mut entries = Vec::with_capacity(names.len());
        for chunk in names.chunks(FETCH_WORKERS) {
            let values = thread::scope(|s| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|name| s.spawn(move || self.get(scope, name)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|_| {
                            Err(StoreError::Unknown("value fetch panicked".to_string()))
                        })
                    })
                    .collect::<Vec<_>>()
            });

            for (name, value) in chunk.iter().zip(values) {
                entries.push(Entry::new(name.as_str(), value?.as_str()));
            }
        }

        Ok(entries)
    }

    fn get(&self, scope: &ScopeHandle, key: &str) -> Result<Zeroizing<String>> {
        let mut args = Self::args(scope, "show", Some(key));
        args.extend(
            ["--query", "value", "--output", "json"]
                .iter()
                .map(|s| s.to_string()),
        );
        let out = self.run(&args)?;
        let value: String = serde_json::from_str(&out)
            .map_err(|e| StoreError::Unknown(format!("unexpected az show output: {}", e)))?;
        Ok(Zeroizing::new(value))
    }

    fn set(&self, scope: &ScopeHandle, key: &str, value: &str) -> Result<()> {
        let mut args = Self::args(scope, "set", Some(key));
        args.extend(["--output".to_string(), "none".to_string()]);

        // Multiline values go through a file to survive argument quoting
        if value.contains('\n') || value.contains("\\n") {
            let mut file = tempfile::NamedTempFile::new()
                .map_err(|e| StoreError::Unknown(format!("failed to create temp file: {}", e)))?;
            file.write_all(value.as_bytes())
                .and_then(|_| file.flush())
                .map_err(|e| StoreError::Unknown(format!("failed to write temp file: {}", e)))?;

            args.extend([
                "--file".to_string(),
                file.path().display().to_string(),
                "--encoding".to_string(),
                "utf-8".to_string(),
            ]);
            self.run(&args)?;
        } else {
            let mut args = Zeroizing::new(args);
            args.extend(["--value".to_string(), value.to_string()]);
            self.run(&args)?;
        }

        debug!(key, "set secret");
        Ok(())
    }

    fn delete(&self, scope: &ScopeHandle, key: &str) -> Result<()> {
        let mut args = Self::args(scope, "delete", Some(key));
        args.extend(["--output".to_string(), "none".to_string()]);
        self.run(&args)?;
        debug!(key, "deleted secret");
        Ok(())
    }
}

fn read_pipe(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Map `az` stderr onto a store error kind.
pub(crate) fn classify_failure(stderr: &str) -> StoreError {
    let message = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("az exited with an error")
        .to_string();
    let lower = stderr.to_lowercase();

    if lower.contains("secretnotfound") || lower.contains("was not found") {
        StoreError::NotFound(message)
    } else if lower.contains("forbidden")
        || lower.contains("authorizationfailed")
        || lower.contains("does not have secrets")
        || lower.contains("az login")
    {
        StoreError::PermissionDenied(message)
    } else if lower.contains("timed out")
        || lower.contains("too many requests")
        || lower.contains("serviceunavailable")
        || lower.contains("temporarily unavailable")
        || lower.contains("connection")
    {
        StoreError::Transient(message)
    } else {
        StoreError::Unknown(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_subscription() {
        let scope = ScopeHandle::new("kv-app-stg", Some("sub-123".into()));
        let args = AzureCliStore::args(&scope, "show", Some("API_KEY"));

        assert_eq!(
            args,
            [
                "keyvault",
                "secret",
                "show",
                "--vault-name",
                "kv-app-stg",
                "--name",
                "API_KEY",
                "--subscription",
                "sub-123",
            ]
        );
    }

    #[test]
    fn test_args_without_subscription() {
        let scope = ScopeHandle::new("kv-app-stg", None);
        let args = AzureCliStore::args(&scope, "list", None);

        assert_eq!(args, ["keyvault", "secret", "list", "--vault-name", "kv-app-stg"]);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("ERROR: (SecretNotFound) A secret with (name/id) X was not found"),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: (Forbidden) The user does not have secrets set permission"),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: Please run 'az login' to setup account."),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: (Throttled) Too Many Requests"),
            StoreError::Transient(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: something odd"),
            StoreError::Unknown(_)
        ));
    }

    #[test]
    fn test_classify_keeps_last_line() {
        let err = classify_failure("WARNING: preview\nERROR: boom\n");
        assert_eq!(err, StoreError::Unknown("ERROR: boom".into()));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_binary_maps_to_unknown() {
        let store = AzureCliStore::with_binary("false", Duration::from_secs(5));
        let scope = ScopeHandle::new("kv", None);

        assert!(matches!(
            store.delete(&scope, "X"),
            Err(StoreError::Unknown(_))
        ));
    }
}
