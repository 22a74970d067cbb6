//! h2mm-runner - process execution core for the h2mm mod manager front-end
//!
//! The front-end never talks to mods directly; it shells out to `h2mm-cli`
//! and shows what the tool prints. This library provides:
//! - A single-slot [`ProcessRunner`] that launches the tool, streams stdout
//!   and stderr line by line, supports cancellation and reports one
//!   completion per invocation
//! - Observer plumbing for callbacks or a tokio channel ([`event`])
//! - Tool location, availability probe and the command catalog ([`tool`])
//! - Persisted settings ([`config`])
//!
//! # Example
//!
//! ```no_run
//! use h2mm_runner::{ProcessRunner, ToolSource, ModCommand};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runner = ProcessRunner::new(ToolSource::Bundled.resolve()?)?;
//!     let (done_tx, done_rx) = tokio::sync::oneshot::channel();
//!
//!     runner.execute_with(
//!         ModCommand::List.into(),
//!         |line| println!("{}", line),
//!         |line| eprintln!("{}", line),
//!         move |result| {
//!             let _sent = done_tx.send(result);
//!         },
//!     )?;
//!
//!     println!("list {}", done_rx.await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod runner;
pub mod tool;
pub mod utils;

// Re-export commonly used types
pub use error::RunnerError;
pub use event::{Callbacks, RunObserver, RunnerEvent, init_runner_eventsource};
pub use runner::{CompletionResult, Invocation, InvocationId, OutputEvent, ProcessRunner, RunnerOptions, StreamKind};
pub use tool::{ModCommand, ResolvedTool, ToolSource, is_available};
