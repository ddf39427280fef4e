//! The pipeline expression tree.
//!
//! An [`Expr`] is an immutable description of work: external commands,
//! pipes, short-circuit logic, file endpoints, captures, and the literal
//! true/false nodes. Building a tree never touches the operating system;
//! everything observable happens when the tree is handed to [`crate::run`].
//!
//! Combinators share their operands through `Arc`, so a node bound into one
//! expression can be reused in another without either tree observing the
//! other — nodes are immutable, sharing is indistinguishable from copying.

use std::ops::BitOr;
use std::sync::Arc;

use crate::env::Env;
use crate::error::Result;
use crate::stream::{StreamCaps, CAP_ANY, CAP_WIRED, CAP_UNUSED, CAP_CREATES};

/// An argument evaluated at node start time, not at tree construction time.
///
/// A `Var` argument is looked up in the running environment the moment the
/// node that holds it starts, which is what allows a value captured earlier
/// in a script to be consumed later in the same script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(String),
    Var(String),
}

impl Arg {
    pub fn resolve(&self, env: &Env) -> Result<String> {
        match self {
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Var(name) => env.get(name),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Literal(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Literal(value)
    }
}

/// A deferred reference to the variable `name`.
pub fn var(name: impl Into<String>) -> Arg {
    Arg::Var(name.into())
}

/// How a [`Expr::File`] endpoint opens its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open for reading; the node becomes a data source.
    Read,
    /// Open for writing, truncating any existing content.
    Truncate,
    /// Open for writing, appending to existing content.
    Append,
}

/// One node of a pipeline expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// An external program: argv[0] plus arguments.
    Command(Vec<Arg>),
    /// Writes its arguments, space-joined plus a newline, to its stdout.
    Echo(Vec<Arg>),
    /// Left's stdout feeds right's stdin.
    Pipe(Arc<Expr>, Arc<Expr>),
    /// Runs right only if left exited zero.
    And(Arc<Expr>, Arc<Expr>),
    /// Runs right only if left exited non-zero.
    Or(Arc<Expr>, Arc<Expr>),
    /// Reads its stdin to end-of-stream and stores the newline-trimmed
    /// result under the given variable name.
    Capture(String),
    /// A file opened at start time, exposed as a stream endpoint.
    File { path: Arg, mode: OpenMode },
    /// Completes immediately with status 0.
    True,
    /// Completes immediately with status -1.
    False,
}

/// An external command. The first argument is the program name, resolved
/// against `PATH` at spawn time.
pub fn cmd<I, A>(args: I) -> Expr
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Expr::Command(args.into_iter().map(Into::into).collect())
}

/// A builtin that writes its arguments, space-joined and newline-terminated.
pub fn echo<I, A>(args: I) -> Expr
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Expr::Echo(args.into_iter().map(Into::into).collect())
}

/// A builtin that stores its whole input under `name` in the environment.
pub fn capture(name: impl Into<String>) -> Expr {
    Expr::Capture(name.into())
}

/// A file endpoint. Usually reached through [`Expr::write_to`],
/// [`Expr::append_to`], or [`Expr::read_from`] rather than directly.
pub fn open_file(path: impl Into<Arg>, mode: OpenMode) -> Expr {
    Expr::File { path: path.into(), mode }
}

impl Expr {
    /// `self | rhs`: this node's stdout feeds `rhs`'s stdin.
    pub fn pipe(&self, rhs: &Expr) -> Expr {
        Expr::Pipe(Arc::new(self.clone()), Arc::new(rhs.clone()))
    }

    /// `self && rhs`: run `rhs` only if this node succeeds.
    pub fn and(&self, rhs: &Expr) -> Expr {
        Expr::And(Arc::new(self.clone()), Arc::new(rhs.clone()))
    }

    /// `self || rhs`: run `rhs` only if this node fails.
    pub fn or(&self, rhs: &Expr) -> Expr {
        Expr::Or(Arc::new(self.clone()), Arc::new(rhs.clone()))
    }

    /// `self > path`: redirect stdout to a file, truncating it.
    pub fn write_to(&self, path: impl Into<Arg>) -> Expr {
        self.pipe(&open_file(path, OpenMode::Truncate))
    }

    /// `self >> path`: redirect stdout to a file, appending.
    pub fn append_to(&self, path: impl Into<Arg>) -> Expr {
        self.pipe(&open_file(path, OpenMode::Append))
    }

    /// `self < path`: read stdin from a file.
    pub fn read_from(&self, path: impl Into<Arg>) -> Expr {
        open_file(path, OpenMode::Read).pipe(self)
    }

    /// `self << text`: feed a here-string (one resolved argument plus a
    /// trailing newline) into stdin.
    pub fn feed(&self, text: impl Into<Arg>) -> Expr {
        echo([text.into()]).pipe(self)
    }

    /// The descriptor kinds each of this node's streams can be wired with.
    pub fn caps(&self) -> StreamCaps {
        match self {
            Expr::Command(_) => StreamCaps::new(CAP_ANY, CAP_ANY, CAP_ANY),
            Expr::Echo(_) => StreamCaps::new(CAP_UNUSED, CAP_WIRED, CAP_UNUSED),
            Expr::Capture(_) => StreamCaps::new(CAP_WIRED, CAP_UNUSED, CAP_UNUSED),
            Expr::File { mode, .. } => match mode {
                OpenMode::Read => StreamCaps::new(CAP_UNUSED, CAP_CREATES, CAP_UNUSED),
                OpenMode::Truncate | OpenMode::Append => {
                    StreamCaps::new(CAP_CREATES, CAP_UNUSED, CAP_UNUSED)
                }
            },
            Expr::Pipe(lhs, rhs) => {
                let (lhs, rhs) = (lhs.caps(), rhs.caps());
                StreamCaps::new(lhs.stdin, rhs.stdout, rhs.stderr)
            }
            Expr::And(..) | Expr::Or(..) | Expr::True | Expr::False => {
                StreamCaps::new(CAP_UNUSED, CAP_UNUSED, CAP_UNUSED)
            }
        }
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        Expr::Pipe(Arc::new(self), Arc::new(rhs))
    }
}

impl BitOr for &Expr {
    type Output = Expr;

    fn bitor(self, rhs: &Expr) -> Expr {
        self.pipe(rhs)
    }
}

/// Well-known device paths, convenient as redirect targets.
pub mod dev {
    pub const NULL: &str = "/dev/null";
    pub const ZERO: &str = "/dev/zero";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Cap;

    #[test]
    fn literal_args_resolve_without_an_environment_entry() {
        let env = Env::empty();
        assert_eq!(Arg::from("plain").resolve(&env).unwrap(), "plain");
    }

    #[test]
    fn var_args_resolve_lazily() {
        let env = Env::empty();
        let arg = var("LATE");
        assert!(arg.resolve(&env).is_err());
        env.set("LATE", "bound", false).unwrap();
        assert_eq!(arg.resolve(&env).unwrap(), "bound");
    }

    #[test]
    fn combinators_build_the_expected_shapes() {
        let base = echo(["x"]);
        assert!(matches!(base.pipe(&capture("v")), Expr::Pipe(..)));
        assert!(matches!(base.and(&Expr::True), Expr::And(..)));
        assert!(matches!(base.or(&Expr::False), Expr::Or(..)));
        assert!(matches!(
            base.write_to("/tmp/out"),
            Expr::Pipe(_, rhs) if matches!(*rhs, Expr::File { mode: OpenMode::Truncate, .. })
        ));
        assert!(matches!(
            base.append_to("/tmp/out"),
            Expr::Pipe(_, rhs) if matches!(*rhs, Expr::File { mode: OpenMode::Append, .. })
        ));
        assert!(matches!(
            capture("v").read_from("/tmp/in"),
            Expr::Pipe(lhs, _) if matches!(*lhs, Expr::File { mode: OpenMode::Read, .. })
        ));
        assert!(matches!(
            capture("v").feed("hello"),
            Expr::Pipe(lhs, _) if matches!(*lhs, Expr::Echo(_))
        ));
    }

    #[test]
    fn operands_stay_reusable_after_composition() {
        let shared = echo(["once"]);
        let first = shared.pipe(&capture("a"));
        let second = shared.pipe(&capture("b"));
        assert!(matches!(first, Expr::Pipe(..)));
        assert!(matches!(second, Expr::Pipe(..)));
        // The original operand is untouched by both compositions.
        assert!(matches!(shared, Expr::Echo(_)));
    }

    #[test]
    fn bitor_is_pipe_sugar() {
        let piped = echo(["a"]) | capture("v");
        assert!(matches!(piped, Expr::Pipe(..)));
        let lhs = echo(["a"]);
        let rhs = capture("v");
        assert!(matches!(&lhs | &rhs, Expr::Pipe(..)));
    }

    #[test]
    fn pipe_caps_come_from_the_outer_ends() {
        let piped = cmd(["cat"]).pipe(&capture("v"));
        let caps = piped.caps();
        // Left end is a command: anything goes on stdin.
        assert!(caps.stdin.contains(Cap::Accept));
        // Right end is a capture: stdout is ignore-only.
        assert_eq!(caps.stdout, CAP_UNUSED);
    }

    #[test]
    fn file_caps_follow_the_open_direction() {
        let source = open_file("/tmp/x", OpenMode::Read).caps();
        assert_eq!(source.stdout, CAP_CREATES);
        assert_eq!(source.stdin, CAP_UNUSED);

        let sink = open_file("/tmp/x", OpenMode::Append).caps();
        assert_eq!(sink.stdin, CAP_CREATES);
        assert_eq!(sink.stdout, CAP_UNUSED);
    }
}
