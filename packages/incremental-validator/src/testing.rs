//! In-memory stand-ins for git, the engine, and arbitrary commands.
//!
//! `FakeRepository` and `FakeEngine` share one [`World`], so the engine
//! ingests whatever revision the fake repository has checked out.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::engine::{Engine, Mode};
use crate::error::{Result, ValidateError};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::repo::Repository;
use crate::snapshot::{EDGES_QUERY, NODES_QUERY};

type Graph = (Vec<Value>, Vec<Value>);

fn failed(command: &str, stderr: &str) -> ValidateError {
    ValidateError::CommandFailed {
        command: command.to_string(),
        status: Some(1),
        stderr: stderr.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct World {
    pub initial: String,
    pub head: String,
    pub dirty: Vec<String>,
    pub status_error: bool,
    pub checkouts: Vec<String>,
    pub fail_checkout: Option<String>,
    /// First parent of each revision, for `<rev>~N` lookups
    pub parents: HashMap<String, String>,

    /// Graph the engine produces for a revision in either mode
    pub graphs: HashMap<String, Graph>,
    /// Overrides for incremental mode, to simulate a divergent engine
    pub incremental_graphs: HashMap<String, Graph>,
    pub stores: HashMap<PathBuf, Graph>,
    pub ingests: Vec<(String, Mode)>,
    pub fail_ingest: Option<(String, Mode)>,
    pub panic_ingest: Option<String>,
    pub silent_ingest: bool,
    pub query_banner: Option<String>,
    pub malformed_edges: bool,
}

impl World {
    pub fn shared(head: &str) -> Rc<RefCell<World>> {
        Rc::new(RefCell::new(World {
            initial: head.to_string(),
            head: head.to_string(),
            ..World::default()
        }))
    }

    pub fn define_graph(&mut self, revision: &str, nodes: Vec<Value>, edges: Vec<Value>) {
        self.graphs.insert(revision.to_string(), (nodes, edges));
    }

    pub fn define_incremental(&mut self, revision: &str, nodes: Vec<Value>, edges: Vec<Value>) {
        self.incremental_graphs.insert(revision.to_string(), (nodes, edges));
    }

    /// Chain `revisions` oldest first, each the parent of the next.
    pub fn define_history(&mut self, revisions: &[&str]) {
        for pair in revisions.windows(2) {
            self.parents.insert(pair[1].to_string(), pair[0].to_string());
        }
    }

    fn knows(&self, reference: &str) -> bool {
        reference == self.initial || self.graphs.contains_key(reference)
    }
}

// ── FakeRepository ──────────────────────────────────────────────────

pub struct FakeRepository {
    world: Rc<RefCell<World>>,
    root: PathBuf,
}

impl FakeRepository {
    pub fn new(world: Rc<RefCell<World>>) -> Self {
        Self { world, root: PathBuf::from("/repo") }
    }
}

impl Repository for FakeRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn status_entries(&self) -> Result<Vec<String>> {
        let world = self.world.borrow();
        if world.status_error {
            return Err(failed("git status --porcelain", "fatal: not a git repository"));
        }
        Ok(world.dirty.clone())
    }

    fn current_reference(&self) -> Result<String> {
        Ok(self.world.borrow().head.clone())
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        let world = self.world.borrow();
        let unresolved = || {
            failed(
                &format!("git rev-parse --verify {}^{{commit}}", reference),
                "fatal: Needed a single revision",
            )
        };

        let (base, steps) = match reference.split_once('~') {
            Some((base, n)) => (base, n.parse::<usize>().map_err(|_| unresolved())?),
            None => (reference, 0),
        };
        let mut commit = if base == "HEAD" { world.head.clone() } else { base.to_string() };
        for _ in 0..steps {
            commit = world.parents.get(&commit).cloned().ok_or_else(unresolved)?;
        }
        if !world.knows(&commit) {
            return Err(unresolved());
        }
        Ok(commit)
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        let mut world = self.world.borrow_mut();
        if world.fail_checkout.as_deref() == Some(reference) || !world.knows(reference) {
            return Err(failed(
                &format!("git checkout {}", reference),
                &format!("error: pathspec '{}' did not match any file(s) known to git", reference),
            ));
        }
        world.head = reference.to_string();
        world.checkouts.push(reference.to_string());
        Ok(())
    }

    fn short_name(&self, reference: &str) -> Result<String> {
        Ok(reference.chars().take(7).collect())
    }
}

// ── FakeEngine ──────────────────────────────────────────────────────

pub struct FakeEngine {
    world: Rc<RefCell<World>>,
}

impl FakeEngine {
    pub fn new(world: Rc<RefCell<World>>) -> Self {
        Self { world }
    }
}

impl Engine for FakeEngine {
    fn ingest(&self, _project: &Path, store: &Path, mode: Mode) -> Result<CommandOutput> {
        let mut world = self.world.borrow_mut();
        let head = world.head.clone();
        world.ingests.push((head.clone(), mode));

        if world.fail_ingest.as_ref() == Some(&(head.clone(), mode)) {
            return Err(failed("cg ingest", "thread 'main' panicked at 'parser crashed'"));
        }
        if world.panic_ingest.as_deref() == Some(head.as_str()) {
            drop(world);
            panic!("engine fake asked to panic at {}", head);
        }

        let graph = match mode {
            Mode::Incremental => {
                world.incremental_graphs.get(&head).or_else(|| world.graphs.get(&head))
            }
            Mode::Full => world.graphs.get(&head),
        }
        .cloned()
        .unwrap_or_default();

        let stdout = if world.silent_ingest {
            String::new()
        } else {
            format!(
                concat!(
                    "✓ Ingestion complete!\n",
                    "  Files processed: {}\n",
                    "  Symbols created: {}\n",
                    "  Edges created: {}\n",
                ),
                graph.0.len(),
                graph.0.len(),
                graph.1.len()
            )
        };
        world.stores.insert(store.to_path_buf(), graph);

        Ok(CommandOutput { stdout, stderr: String::new(), status: Some(0) })
    }

    fn query(&self, store: &Path, query: &str) -> Result<CommandOutput> {
        let world = self.world.borrow();
        let (nodes, edges) = world
            .stores
            .get(store)
            .ok_or_else(|| failed("cg query", "Error: database does not exist"))?;

        let rows = if query == NODES_QUERY {
            nodes
        } else if query == EDGES_QUERY {
            if world.malformed_edges {
                return Ok(CommandOutput {
                    stdout: "Error: Binder exception: Table EDGE does not exist.".to_string(),
                    stderr: String::new(),
                    status: Some(0),
                });
            }
            edges
        } else {
            return Err(failed("cg query", "unsupported query"));
        };

        let mut stdout = world.query_banner.clone().unwrap_or_default();
        stdout.push_str(&serde_json::to_string_pretty(rows)?);
        stdout.push('\n');
        Ok(CommandOutput { stdout, stderr: String::new(), status: Some(0) })
    }
}

// ── ScriptedRunner ──────────────────────────────────────────────────

/// [`CommandRunner`] answering from canned responses keyed by command
/// prefix. The last response registered for a prefix repeats; earlier ones
/// are consumed in order. Unscripted commands fail as if not installed.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: RefCell<Vec<(String, VecDeque<CommandOutput>)>>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        let mut responses = self.responses.borrow_mut();
        match responses.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, queue)) => queue.push_back(output),
            None => responses.push((prefix.to_string(), VecDeque::from([output]))),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        let rendered = spec.display();

        let mut responses = self.responses.borrow_mut();
        let queue = responses
            .iter_mut()
            .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
            .map(|(_, queue)| queue);

        match queue {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap_or_default()),
            Some(queue) => Ok(queue.front().cloned().unwrap_or_default()),
            None => Err(ValidateError::Spawn {
                program: spec.program.clone(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("unscripted: {}", rendered),
                ),
            }),
        }
    }
}
