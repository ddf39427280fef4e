//! Variable environments for pipelines.
//!
//! Two forms exist: a frozen, process-wide snapshot of the host environment
//! (taken once, all entries exported) and writable environments that start
//! as a copy of that snapshot or empty. Cloning an `Env` shares the
//! underlying map, so every node of a running pipeline sees the same
//! variables — this is what lets a `capture` early in a script feed an
//! argument later in the same script.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::expr::Expr;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    exported: bool,
}

static INHERITED: OnceLock<Arc<HashMap<String, Entry>>> = OnceLock::new();

fn inherited_snapshot() -> &'static Arc<HashMap<String, Entry>> {
    INHERITED.get_or_init(|| {
        let map = std::env::vars()
            .map(|(name, value)| (name, Entry { value, exported: true }))
            .collect();
        Arc::new(map)
    })
}

#[derive(Debug, Clone)]
enum Vars {
    Frozen(Arc<HashMap<String, Entry>>),
    Shared(Arc<Mutex<HashMap<String, Entry>>>),
}

/// A variable environment shared by reference across one pipeline run.
///
/// Only `capture` nodes write to it, and only writable environments accept
/// writes. Inserts are serialized by an internal lock, but two concurrent
/// branches capturing into the same name still race on which value wins;
/// callers that need an ordering must impose one through the tree shape.
#[derive(Debug, Clone)]
pub struct Env {
    vars: Vars,
}

impl Env {
    /// The frozen snapshot of the host environment, taken on first use.
    pub fn inherited() -> Env {
        Env {
            vars: Vars::Frozen(Arc::clone(inherited_snapshot())),
        }
    }

    /// A writable environment pre-populated from the inherited snapshot.
    pub fn writable() -> Env {
        let map = inherited_snapshot().as_ref().clone();
        Env {
            vars: Vars::Shared(Arc::new(Mutex::new(map))),
        }
    }

    /// A writable environment with no entries at all.
    pub fn empty() -> Env {
        Env {
            vars: Vars::Shared(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.vars, Vars::Shared(_))
    }

    /// Look up a variable's value.
    pub fn get(&self, name: &str) -> Result<String> {
        let found = match &self.vars {
            Vars::Frozen(map) => map.get(name).map(|e| e.value.clone()),
            Vars::Shared(map) => lock(map).get(name).map(|e| e.value.clone()),
        };
        found.ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    /// Insert or overwrite a variable.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>, exported: bool) -> Result<()> {
        match &self.vars {
            Vars::Frozen(_) => Err(Error::ReadOnlyEnvironment),
            Vars::Shared(map) => {
                lock(map).insert(name.into(), Entry { value: value.into(), exported });
                Ok(())
            }
        }
    }

    /// The `NAME=value` pairs visible to spawned processes: exported entries only.
    pub fn exported(&self) -> Vec<(String, String)> {
        let collect = |map: &HashMap<String, Entry>| {
            map.iter()
                .filter(|(_, entry)| entry.exported)
                .map(|(name, entry)| (name.clone(), entry.value.clone()))
                .collect()
        };
        match &self.vars {
            Vars::Frozen(map) => collect(map),
            Vars::Shared(map) => collect(&lock(map)),
        }
    }

    /// Execute one expression in this environment. See [`crate::run`].
    pub async fn run(&self, expr: &Expr) -> Result<i32> {
        crate::scheduler::run(expr, self).await
    }

    /// Execute expressions in order, stopping at the first non-zero status.
    /// See [`crate::run_all`].
    pub async fn run_all(&self, exprs: &[Expr]) -> Result<i32> {
        crate::scheduler::run_all(exprs, self).await
    }
}

fn lock(map: &Mutex<HashMap<String, Entry>>) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherited_is_read_only() {
        let env = Env::inherited();
        assert!(!env.is_writable());
        let err = env.set("X", "1", false).unwrap_err();
        assert!(matches!(err, Error::ReadOnlyEnvironment));
    }

    #[test]
    fn writable_set_and_get() {
        let env = Env::empty();
        env.set("GREETING", "hello", false).unwrap();
        assert_eq!(env.get("GREETING").unwrap(), "hello");
    }

    #[test]
    fn missing_lookup_names_the_variable() {
        let env = Env::empty();
        match env.get("NOPE") {
            Err(Error::MissingVariable(name)) => assert_eq!(name, "NOPE"),
            other => panic!("expected MissingVariable, got {other:?}"),
        }
    }

    #[test]
    fn exported_filters_private_entries() {
        let env = Env::empty();
        env.set("PUBLIC", "1", true).unwrap();
        env.set("PRIVATE", "2", false).unwrap();
        let block = env.exported();
        assert_eq!(block, vec![("PUBLIC".to_string(), "1".to_string())]);
    }

    #[test]
    fn clones_share_the_same_map() {
        let env = Env::empty();
        let alias = env.clone();
        alias.set("SEEN", "yes", false).unwrap();
        assert_eq!(env.get("SEEN").unwrap(), "yes");
    }

    #[test]
    fn writable_copies_the_host_environment() {
        // PATH is set in any reasonable test environment.
        let env = Env::writable();
        assert!(env.is_writable());
        assert!(env.get("PATH").is_ok());
        // Overriding the copy must not affect a fresh snapshot.
        env.set("PATH", "/overridden", true).unwrap();
        assert_ne!(Env::writable().get("PATH").unwrap(), "/overridden");
    }
}
