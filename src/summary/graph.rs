// Concrete summary index
//
//  Copyright (C) 2014-2023 Ryan Specialty Group, LLC.
//
//  This file is part of modsum.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Concrete [`ModuleSummaryIndex`] implementation.
//!
//! _This is a private module.
//!  See [`super`] for available exports._

use super::object::{CallKind, FunctionSummary, VirtualMethodSlot};
use crate::guid::Guid;
use fxhash::{FxHashMap, FxHashSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Resolved dependency relationship between two defined functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// The caller references the callee directly.
    Static,

    /// The callee is a known implementation of a virtual-method slot
    ///   the caller dispatches through.
    Virtual,
}

/// Reference to a [`FunctionSummary`] stored on a
///   [`ModuleSummaryIndex`].
///
/// Summaries are never removed from an index,
///   so a [`FuncRef`] remains valid for the lifetime of the index that
///   produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncRef(NodeIndex);

impl From<NodeIndex> for FuncRef {
    fn from(index: NodeIndex) -> Self {
        Self(index)
    }
}

impl From<FuncRef> for NodeIndex {
    fn from(fref: FuncRef) -> Self {
        fref.0
    }
}

/// Per-module or combined container of function summaries and the
///   virtual-dispatch table.
///
/// Summaries are stored as nodes of a directed graph and cached by
///   [`Guid`] for `O(1)` lookup.
/// The graph carries no edges until
///   [`resolve_dependencies`](ModuleSummaryIndex::resolve_dependencies)
///   runs against the final merged index;
///     edges are an analysis view derived from each summary's calls and
///     the implementation table,
///       and the calls themselves remain authoritative for
///       serialization.
#[derive(Debug)]
pub struct ModuleSummaryIndex {
    /// Human-readable module identifier.
    ///
    /// Not semantically significant after merging;
    ///   the merged index is conventionally named `combined`.
    name: String,

    /// Directed graph on which summaries are stored.
    graph: DiGraph<FunctionSummary, DependencyKind>,

    /// Map of [`Guid`] to node indices for `O(1)` lookup.
    index: FxHashMap<Guid, NodeIndex>,

    /// Known concrete implementations of each virtual-method slot.
    ///
    /// A sorted map so that iteration
    ///   (and therefore re-serialization)
    ///   is deterministic across runs.
    implementations: BTreeMap<VirtualMethodSlot, Vec<Guid>>,

    /// Types referenced by at least one live function.
    ///
    /// Populated only by the liveness engine;
    ///   cleared by [`merge`](ModuleSummaryIndex::merge).
    used_types: FxHashSet<Guid>,
}

impl PartialEq for ModuleSummaryIndex {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.implementations == other.implementations
            && self.used_types == other.used_types
            && self.graph.node_weights().eq(other.graph.node_weights())
            && self
                .graph
                .raw_edges()
                .iter()
                .map(|e| (e.source(), e.target(), &e.weight))
                .eq(other
                    .graph
                    .raw_edges()
                    .iter()
                    .map(|e| (e.source(), e.target(), &e.weight)))
    }
}

impl ModuleSummaryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DiGraph::new(),
            index: FxHashMap::default(),
            implementations: BTreeMap::new(),
            used_types: FxHashSet::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add `summary` to the index.
    ///
    /// Each [`Guid`] may be defined at most once;
    ///   a second definition is a producer error
    ///   (see [`MergeError::DuplicateSymbol`]).
    pub fn add_function(
        &mut self,
        summary: FunctionSummary,
    ) -> Result<FuncRef, MergeError> {
        let guid = summary.guid();

        if self.index.contains_key(&guid) {
            return Err(MergeError::DuplicateSymbol(
                guid,
                summary.name().into(),
            ));
        }

        let node = self.graph.add_node(summary);
        self.index.insert(guid, node);

        Ok(FuncRef(node))
    }

    /// Look up the summary for `guid`,
    ///   if the function is defined in this index.
    pub fn lookup(&self, guid: Guid) -> Option<FuncRef> {
        self.index.get(&guid).map(|&node| FuncRef(node))
    }

    pub fn function(&self, guid: Guid) -> Option<&FunctionSummary> {
        self.lookup(guid).map(|fref| self.get(fref))
    }

    pub fn function_mut(
        &mut self,
        guid: Guid,
    ) -> Option<&mut FunctionSummary> {
        self.lookup(guid).map(move |fref| self.get_mut(fref))
    }

    /// Retrieve a summary by [`FuncRef`].
    ///
    /// Panics
    /// ======
    /// Panics if `fref` was produced by another index.
    pub fn get(&self, fref: FuncRef) -> &FunctionSummary {
        &self.graph[fref.0]
    }

    pub fn get_mut(&mut self, fref: FuncRef) -> &mut FunctionSummary {
        &mut self.graph[fref.0]
    }

    /// Iterate over all summaries in insertion order.
    ///
    /// Insertion order makes serialized output deterministic for a fixed
    ///   input sequence.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionSummary> {
        self.graph.node_weights()
    }

    /// Number of defined functions.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Register `implementation` as a possible target of `slot`.
    ///
    /// Duplicate registrations are ignored;
    ///   first-registration order is retained.
    pub fn add_implementation(
        &mut self,
        slot: VirtualMethodSlot,
        implementation: Guid,
    ) {
        let impls = self.implementations.entry(slot).or_default();

        if !impls.contains(&implementation) {
            impls.push(implementation);
        }
    }

    /// Known implementations of `slot`,
    ///   possibly empty.
    pub fn implementations(&self, slot: VirtualMethodSlot) -> &[Guid] {
        self.implementations
            .get(&slot)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over all slots and their implementations,
    ///   ordered by slot.
    pub fn slots(
        &self,
    ) -> impl Iterator<Item = (VirtualMethodSlot, &[Guid])> {
        self.implementations
            .iter()
            .map(|(slot, impls)| (*slot, impls.as_slice()))
    }

    pub fn mark_used_type(&mut self, guid: Guid) {
        self.used_types.insert(guid);
    }

    pub fn used_types(&self) -> &FxHashSet<Guid> {
        &self.used_types
    }

    /// Merge `other` into this index.
    ///
    /// Functions are unioned by [`Guid`]
    ///   (a duplicate across modules is an error),
    ///   and the implementation table is unioned key-wise.
    /// The used-type set is cleared,
    ///   to be recomputed by the liveness engine against the combined
    ///   index.
    pub fn merge(
        &mut self,
        other: ModuleSummaryIndex,
    ) -> Result<(), MergeError> {
        let (nodes, _) = other.graph.into_nodes_edges();

        for node in nodes {
            self.add_function(node.weight)?;
        }

        for (slot, impls) in other.implementations {
            for implementation in impls {
                self.add_implementation(slot, implementation);
            }
        }

        self.used_types.clear();

        Ok(())
    }

    /// Resolve every summary's calls into dependency edges.
    ///
    /// Direct calls produce a [`DependencyKind::Static`] edge to the
    ///   callee _iff_ the callee is defined in this index;
    ///     an unresolved callee is an external symbol and gets no edge.
    /// Virtual calls produce a [`DependencyKind::Virtual`] edge to each
    ///   defined implementation registered for the call's slot;
    ///     a slot with no registered implementations contributes
    ///     nothing.
    ///
    /// Existing edges are discarded first,
    ///   so this may be re-run after further merging.
    pub fn resolve_dependencies(&mut self) {
        self.graph.clear_edges();

        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();

        for node in nodes {
            let mut deps: Vec<(NodeIndex, DependencyKind)> = Vec::new();
            let mut seen: FxHashSet<(NodeIndex, DependencyKind)> =
                FxHashSet::default();

            for call in self.graph[node].calls() {
                match call.kind() {
                    CallKind::Direct => {
                        if let Some(&target) = self.index.get(&call.callee())
                        {
                            deps.push((target, DependencyKind::Static));
                        }
                    }

                    CallKind::VTable | CallKind::Witness => {
                        let slot = VirtualMethodSlot::for_call(call)
                            .expect("virtual call without a slot");

                        let impls = self
                            .implementations
                            .get(&slot)
                            .map(Vec::as_slice)
                            .unwrap_or(&[]);

                        for implementation in impls {
                            if let Some(&target) =
                                self.index.get(implementation)
                            {
                                deps.push((
                                    target,
                                    DependencyKind::Virtual,
                                ));
                            }
                        }
                    }
                }
            }

            for (target, kind) in deps {
                if seen.insert((target, kind)) {
                    self.graph.add_edge(node, target, kind);
                }
            }
        }
    }

    /// Resolved dependencies of `fref`.
    ///
    /// Meaningful only after
    ///   [`resolve_dependencies`](ModuleSummaryIndex::resolve_dependencies)
    ///   has run.
    pub fn dependencies(
        &self,
        fref: FuncRef,
    ) -> impl Iterator<Item = (FuncRef, DependencyKind)> + '_ {
        self.graph
            .edges(fref.0)
            .map(|edge| (FuncRef(edge.target()), *edge.weight()))
    }
}

/// Error while combining summaries into one index.
#[derive(Debug, PartialEq, Eq)]
pub enum MergeError {
    /// The same [`Guid`] was defined more than once.
    ///
    /// Mangled names are unique per definition,
    ///   so this indicates either duplicate inputs or a producer bug.
    DuplicateSymbol(Guid, String),
}

impl Display for MergeError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateSymbol(guid, name) if name.is_empty() => {
                write!(fmt, "duplicate symbol ({guid})")
            }
            Self::DuplicateSymbol(guid, name) => {
                write!(fmt, "duplicate symbol `{name}` ({guid})")
            }
        }
    }
}

impl std::error::Error for MergeError {}
