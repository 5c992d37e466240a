//! Breadth-first convergence of the dependency forest.
//!
//! Dependencies are visited level by level: everything the root declares,
//! then every child of those, across all subtrees, and so on. When an app is
//! seen again deeper in the tree, the occurrence accepted at a shallower
//! level is authoritative and the new one is resolved against it.
//!
//! Each level is made of frames: the children of one node together with the
//! breadth sets of that node. `upper` holds the apps declared along the path
//! above the frame, `current` additionally holds the frame's own apps. An
//! optional child is kept only when its app is already in `current` of the
//! frame that declares it.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use braid_core::dependency::Dependency;
use braid_core::lockfile::Lock;

use crate::divergence::{self, Resolution};
use crate::graph;
use crate::loader::{Loader, RemoteConverger};

/// Options for a convergence run.
#[derive(Debug, Clone, Default)]
pub struct ConvergeOptions {
    /// Environment used for `only` filtering. `None` keeps every dependency.
    pub env: Option<String>,
}

/// Result of a convergence run.
#[derive(Debug)]
pub struct Converged<S> {
    /// One node per app.
    pub deps: Vec<Dependency>,
    /// Accumulated callback state.
    pub state: S,
    pub lock: Lock,
}

impl<S> Converged<S> {
    pub fn has_conflicts(&self) -> bool {
        self.deps.iter().any(Dependency::is_conflicted)
    }
}

/// What the cache knows about a first-seen dependency.
#[derive(Debug)]
pub enum Cached {
    /// Already resolved; use as-is without invoking the callback.
    Loaded(Dependency),
    /// Needs the callback and `Loader::load`, with pre-expanded children if any.
    Unloaded(Dependency, Option<Vec<Dependency>>),
}

/// Drives the loader, the per-node callback and the optional remote converger.
pub struct Converger<'a, L: Loader> {
    loader: &'a L,
    remote: Option<&'a dyn RemoteConverger>,
    options: ConvergeOptions,
}

impl<'a, L: Loader> Converger<'a, L> {
    pub fn new(loader: &'a L) -> Self {
        Self {
            loader,
            remote: None,
            options: ConvergeOptions::default(),
        }
    }

    pub fn with_remote(mut self, remote: &'a dyn RemoteConverger) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_options(mut self, options: ConvergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Converge and topologically sort the result.
    ///
    /// `lock` being `Some` means the caller may rewrite it: only then is the
    /// remote converger allowed to produce a new lock. With `None` the lock is
    /// read through the loader and returned untouched by the remote side.
    ///
    /// `callback` runs exactly once per first-seen app in a pass, before the
    /// loader finalizes the node.
    pub fn converge<S, F>(&self, state: S, lock: Option<Lock>, callback: F) -> miette::Result<Converged<S>>
    where
        F: FnMut(Dependency, S, Lock) -> miette::Result<(Dependency, S, Lock)>,
    {
        let converged = self.converge_unsorted(state, lock, callback)?;
        let deps = graph::topsort(converged.deps)?;
        if let Some(remote) = self.remote {
            remote.post_converge();
        }
        Ok(Converged {
            deps,
            state: converged.state,
            lock: converged.lock,
        })
    }

    /// Converge without sorting. Nodes come out in the order they were accepted.
    pub fn converge_unsorted<S, F>(
        &self,
        state: S,
        lock: Option<Lock>,
        mut callback: F,
    ) -> miette::Result<Converged<S>>
    where
        F: FnMut(Dependency, S, Lock) -> miette::Result<(Dependency, S, Lock)>,
    {
        let main: Vec<Dependency> = self
            .loader
            .children()?
            .into_iter()
            .map(|mut dep| {
                dep.top_level = true;
                dep
            })
            .collect();
        let lock_given = lock.is_some();
        let lock = match lock {
            Some(lock) => lock,
            None => self.loader.read_lock()?,
        };

        let remote = self.remote;
        let (deps, state, lock) = self.pass(main.clone(), state, lock, &mut callback, |dep, _| {
            Ok(match remote {
                Some(remote) if remote.is_remote(&dep) => Cached::Loaded(dep),
                _ => Cached::Unloaded(dep, None),
            })
        })?;

        let Some(remote) = remote else {
            return Ok(finish(deps, state, lock));
        };
        if deps.iter().any(Dependency::is_conflicted) {
            tracing::info!("Local dependencies have conflicts, skipping remote resolution");
            return Ok(finish(deps, state, lock));
        }
        graph::ensure_acyclic(&deps)?;

        let lock = if lock_given {
            remote.converge(&deps, lock)?
        } else {
            lock
        };

        let cache: HashMap<String, Dependency> = deps
            .into_iter()
            .filter(|dep| !remote.is_remote(dep))
            .map(|dep| (dep.app.clone(), dep))
            .collect();

        let (deps, state, lock) = self.pass(main, state, lock, &mut callback, |dep, lock| {
            match cache.get(&dep.app) {
                Some(cached) if cached.source == dep.source => Ok(Cached::Loaded(cached.clone())),
                _ if remote.is_remote(&dep) => {
                    let children = remote.deps(&dep, lock)?;
                    Ok(Cached::Unloaded(dep, Some(children)))
                }
                _ => Ok(Cached::Unloaded(dep, None)),
            }
        })?;

        Ok(finish(deps, state, lock))
    }

    /// One traversal over a fresh arena.
    fn pass<S, F, C>(
        &self,
        main: Vec<Dependency>,
        mut state: S,
        mut lock: Lock,
        callback: &mut F,
        mut cache: C,
    ) -> miette::Result<(Vec<Dependency>, S, Lock)>
    where
        F: FnMut(Dependency, S, Lock) -> miette::Result<(Dependency, S, Lock)>,
        C: FnMut(Dependency, &Lock) -> miette::Result<Cached>,
    {
        let mut arena = Arena::default();
        let root_apps: BTreeSet<String> = main.iter().map(|dep| dep.app.clone()).collect();
        let mut level = vec![Frame {
            deps: main,
            upper: Rc::new(BTreeSet::new()),
            current: Rc::new(root_apps),
        }];
        let mut depth = 0usize;

        while !level.is_empty() {
            tracing::trace!("Converging depth {depth} ({} frames)", level.len());
            let mut next = Vec::new();

            for frame in level {
                // Each entry carries the breadth its children are expanded against.
                let mut queue: VecDeque<(Dependency, Rc<BTreeSet<String>>)> = frame
                    .deps
                    .into_iter()
                    .map(|dep| (dep, Rc::clone(&frame.current)))
                    .collect();
                while let Some((dep, breadth)) = queue.pop_front() {
                    match self.match_dep(&mut arena, &frame.upper, dep)? {
                        Match::Merged => {}
                        Match::Replace(dep, declared) => {
                            queue.push_front((dep, declared.unwrap_or(breadth)));
                        }
                        Match::Skip(dep) => {
                            tracing::debug!("{} is not available in this env, deferring", dep.app);
                            arena.defer(dep, breadth);
                        }
                        Match::New(dep) => {
                            let dep = match cache(dep, &lock)? {
                                Cached::Loaded(dep) => dep,
                                Cached::Unloaded(dep, children) => {
                                    let dep = with_lock(dep, &lock);
                                    let (dep, next_state, next_lock) = callback(dep, state, lock)?;
                                    state = next_state;
                                    lock = next_lock;
                                    self.loader.load(dep, children)?
                                }
                            };

                            let children = fulfilled_children(&dep, &breadth);
                            if !children.is_empty() {
                                let mut current = (*breadth).clone();
                                current.extend(children.iter().map(|c| c.app.clone()));
                                next.push(Frame {
                                    deps: children,
                                    upper: breadth,
                                    current: Rc::new(current),
                                });
                            }
                            arena.push(dep);
                        }
                    }
                }
            }

            level = next;
            depth += 1;
        }

        let nodes = arena.into_nodes();
        let order: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, dep)| (dep.app.clone(), i))
            .collect();
        let (mut deps, filtered) = self
            .loader
            .partition_by_env(nodes, self.options.env.as_deref());

        // A conflict is reported even when its node is not built in this env.
        let (conflicted, filtered): (Vec<_>, Vec<_>) =
            filtered.into_iter().partition(Dependency::is_conflicted);
        for dep in &filtered {
            tracing::debug!("Dropping {}: not available in this env", dep.app);
        }
        if !conflicted.is_empty() {
            for dep in &conflicted {
                tracing::debug!(
                    "Keeping {}: not available in this env but {}",
                    dep.app,
                    dep.status.label()
                );
            }
            deps.extend(conflicted);
            deps.sort_by_key(|dep| order.get(&dep.app).copied().unwrap_or(usize::MAX));
        }
        Ok((deps, state, lock))
    }

    fn match_dep(
        &self,
        arena: &mut Arena,
        upper: &BTreeSet<String>,
        dep: Dependency,
    ) -> miette::Result<Match> {
        let env = self.options.env.as_deref();
        let in_upper = upper.contains(&dep.app);
        let Some(other) = arena.get_mut(&dep.app) else {
            return Ok(if self.loader.skip(&dep, env) {
                Match::Skip(dep)
            } else {
                Match::New(dep)
            });
        };

        match divergence::resolve(self.loader, env, other, dep, in_upper)? {
            Resolution::Kept => Ok(Match::Merged),
            Resolution::Replace(dep) => {
                let declared = arena.remove(&dep.app);
                Ok(Match::Replace(dep, declared))
            }
        }
    }
}

enum Match {
    Merged,
    /// Requeue a revived deferred node, with the breadth it was declared in.
    Replace(Dependency, Option<Rc<BTreeSet<String>>>),
    Skip(Dependency),
    New(Dependency),
}

struct Frame {
    deps: Vec<Dependency>,
    upper: Rc<BTreeSet<String>>,
    current: Rc<BTreeSet<String>>,
}

/// Accepted nodes of one pass, in acceptance order, indexed by app.
#[derive(Default)]
struct Arena {
    nodes: Vec<Dependency>,
    index: HashMap<String, usize>,
    /// Breadth of the frame each env-skipped node was declared in.
    deferred: HashMap<String, Rc<BTreeSet<String>>>,
}

impl Arena {
    fn get_mut(&mut self, app: &str) -> Option<&mut Dependency> {
        let idx = *self.index.get(app)?;
        self.nodes.get_mut(idx)
    }

    fn push(&mut self, dep: Dependency) {
        self.index.insert(dep.app.clone(), self.nodes.len());
        self.nodes.push(dep);
    }

    fn defer(&mut self, dep: Dependency, breadth: Rc<BTreeSet<String>>) {
        self.deferred.insert(dep.app.clone(), breadth);
        self.push(dep);
    }

    /// Take `app` out of the arena, returning its declaration breadth if it
    /// was deferred.
    fn remove(&mut self, app: &str) -> Option<Rc<BTreeSet<String>>> {
        if let Some(idx) = self.index.remove(app) {
            self.nodes.remove(idx);
            for i in self.index.values_mut() {
                if *i > idx {
                    *i -= 1;
                }
            }
        }
        self.deferred.remove(app)
    }

    fn into_nodes(self) -> Vec<Dependency> {
        self.nodes
    }
}

fn with_lock(mut dep: Dependency, lock: &Lock) -> Dependency {
    dep.opts.lock = lock.get(&dep.app).cloned();
    dep
}

/// Children of `dep` to expand, without optional ones nobody above requires.
fn fulfilled_children(dep: &Dependency, breadth: &BTreeSet<String>) -> Vec<Dependency> {
    dep.deps
        .iter()
        .filter(|child| {
            let keep = !child.opts.optional || breadth.contains(&child.app);
            if !keep {
                tracing::debug!("Skipping optional {} of {}", child.app, dep.app);
            }
            keep
        })
        .cloned()
        .collect()
}

/// Drop optional children whose app did not make it into the result, so the
/// sorter never sees dangling edges.
fn finish<S>(mut deps: Vec<Dependency>, state: S, lock: Lock) -> Converged<S> {
    let apps: HashSet<String> = deps.iter().map(|dep| dep.app.clone()).collect();
    for dep in &mut deps {
        dep.deps
            .retain(|child| !child.opts.optional || apps.contains(&child.app));
    }
    Converged { deps, state, lock }
}
