//! sluice: composable process pipelines.
//!
//! Describe shell-style process graphs — commands, pipes, `&&`/`||`
//! chains, redirections, output captures — as an immutable expression
//! tree, then execute the tree against the real OS process model with
//! explicit file-descriptor plumbing and deterministic completion.
//!
//! This crate provides:
//!
//! - **Expression tree**: [`Expr`] nodes built from [`cmd`], [`echo`],
//!   [`capture`], [`open_file`], and the [`Expr::True`]/[`Expr::False`]
//!   literals, composed with [`Expr::pipe`], [`Expr::and`], [`Expr::or`],
//!   the redirect helpers, or `|` sugar
//! - **Environments**: [`Env`] maps of variables, either a frozen snapshot
//!   of the host environment or a writable copy that captures feed into
//! - **Stream wiring**: [`StreamSet`]/[`StreamSlot`] descriptor requests
//!   checked against per-node capability declarations ([`StreamCaps`])
//! - **Execution**: [`run`]/[`run_all`] drive a tree to completion;
//!   [`start`] exposes the lower-level handle per started tree
//!
//! # Example
//!
//! ```no_run
//! use sluice::{capture, echo, Env};
//!
//! # async fn demo() -> sluice::Result<()> {
//! let env = Env::writable();
//! let expr = echo(["hello", "world"]) | capture("GREETING");
//! let status = sluice::run(&expr, &env).await?;
//! assert_eq!(status, 0);
//! assert_eq!(env.get("GREETING")?, "hello world");
//! # Ok(())
//! # }
//! ```
//!
//! Execution blocks only inside [`Handle::wait`] (or the `run` helpers
//! that call it); building and wiring a tree never blocks. There is no
//! cancellation: `wait` is unconditional.

pub mod env;
pub mod error;
pub mod expr;
pub mod scheduler;
pub mod stream;

pub use env::Env;
pub use error::{Error, Result};
pub use expr::{capture, cmd, dev, echo, open_file, var, Arg, Expr, OpenMode};
pub use scheduler::{run, run_all, start, Handle};
pub use stream::{Cap, CapSet, StreamCaps, StreamName, StreamSet, StreamSlot};
