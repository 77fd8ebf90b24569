//! kvt - Stage, review, and commit changes to key vault secrets.
//!
//! Every edit is recorded locally first. Nothing reaches the vault until
//! the net diff has been reviewed and committed, and a commit that fails
//! part-way keeps the failed entries staged for a retry.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── contexts      # List configured environments
//! │   ├── show          # Print entries or a blob's inner entries
//! │   ├── apply         # Stage, review, and commit operations
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── domain/       # Entry and Scope types
//!     ├── blob          # Multiline KEY=value codec
//!     ├── stage/        # Staged change set
//!     │   ├── operation # Add/Edit/Rename/Delete and inverses
//!     │   ├── view      # Effective view with rename lineage
//!     │   └── undo      # Undo stack
//!     ├── diff          # Net diff builder
//!     ├── reconcile     # Commit with bounded fan-out
//!     ├── session       # Scope + store + stage + undo
//!     ├── store/        # Secret store backends
//!     │   ├── mod       # SecretStore trait
//!     │   ├── memory    # In-memory store
//!     │   └── azure     # Azure Key Vault via the az CLI
//!     └── config        # config.toml management
//! ```
//!
//! # Example
//!
//! ```
//! use kvt::core::domain::Entry;
//! use kvt::core::stage::StagedChangeSet;
//!
//! let mut set = StagedChangeSet::new(vec![Entry::new("API_KEY", "old")]);
//! set.stage_rename("API_KEY", "API_TOKEN").unwrap();
//! set.stage_edit("API_TOKEN", "new").unwrap();
//!
//! let diff = set.build_diff();
//! assert_eq!(diff.len(), 1);
//! assert_eq!(diff.entries()[0].old_key(), Some("API_KEY"));
//! ```

pub mod cli;
pub mod core;
pub mod error;
