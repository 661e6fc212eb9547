// Whole-program liveness propagation
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

//! Worklist reachability over the combined summary index.
//!
//! Starting from the [root set](preserved_guids),
//!   every function reachable through direct calls and through
//!   virtual-slot implementations is marked live,
//!     and the types it references are recorded as used.
//! Marking is monotone---`live`
//!   only ever transitions false→true---so
//!   the walk terminates after visiting each dependency edge at most
//!   once.
//!
//! Each worklist entry carries a link to the entry that caused it to be
//!   enqueued,
//!     forming a provenance chain back to a root.
//! When a symbol of interest is configured,
//!   the chain of the most recently visited matching function is
//!   retained and may be rendered as a [`TraceReport`]:
//!
//! ```text
//! f3 (6885992742089853686) is referenced by:
//!  - f2 (8125308440767947219)
//!  - f1 (2444227792812339949)
//!  - main (3966932070582710303)
//! ```
//!
//! Chains are allocated in an arena owned by the marking pass;
//!   nodes reference their parents directly and are dropped together
//!   with the arena once the report
//!     (if any)
//!     has been resolved to owned data.

use crate::guid::Guid;
use crate::summary::{DependencyKind, ModuleSummaryIndex};
use bumpalo::Bump;
use fxhash::FxHashSet;
use log::debug;
use std::fmt::{self, Display};

/// Why a function was enqueued for marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Member of the root set.
    Preserved,

    /// Target of a direct call from a live function.
    StaticReferenced,

    /// Implementation of a virtual slot dispatched by a live function.
    IndirectReferenced,
}

/// Provenance-chain node for one worklist entry.
struct TraceNode<'a> {
    parent: Option<&'a TraceNode<'a>>,
    guid: Guid,
    reason: Reason,
}

/// One link of a resolved [`TraceReport`] chain.
#[derive(Debug, PartialEq, Eq)]
pub struct TraceEntry {
    /// Resolved symbol name,
    ///   if the summary carries one.
    pub name: Option<String>,

    pub guid: Guid,
    pub reason: Reason,
}

impl Display for TraceEntry {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(fmt, "{} ({})", name, self.guid),
            None => write!(fmt, "**missing name** ({})", self.guid),
        }
    }
}

/// Provenance chain explaining why a symbol was retained.
///
/// The first entry is the symbol of interest;
///   each following entry referenced the one before it,
///   ending at a root.
#[derive(Debug, PartialEq, Eq)]
pub struct TraceReport {
    entries: Vec<TraceEntry>,
}

impl TraceReport {
    /// Resolve a node chain into owned entries,
    ///   looking up display names in `index`.
    fn resolve(index: &ModuleSummaryIndex, target: &TraceNode) -> Self {
        let mut entries = Vec::new();
        let mut node = Some(target);

        while let Some(cur) = node {
            let name = index
                .function(cur.guid)
                .map(|summary| summary.name())
                .filter(|name| !name.is_empty())
                .map(String::from);

            entries.push(TraceEntry {
                name,
                guid: cur.guid,
                reason: cur.reason,
            });

            node = cur.parent;
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }
}

impl Display for TraceReport {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut entries = self.entries.iter();

        if let Some(target) = entries.next() {
            writeln!(fmt, "{target} is referenced by:")?;

            for parent in entries {
                writeln!(fmt, " - {parent}")?;
            }
        }

        Ok(())
    }
}

/// Result of a marking pass.
#[derive(Debug)]
pub struct Liveness {
    /// Number of functions newly marked live.
    pub live_count: usize,

    /// Retained provenance chain for the configured symbol of
    ///   interest,
    ///     if one was requested and reached.
    pub trace: Option<TraceReport>,
}

/// Compute the root set of `index`.
///
/// The root set is every preserved function together with the function
///   named literally `main`---whether
///     or not any summary declares it;
///       an undeclared `main` is simply unreachable and contributes
///       nothing.
pub fn preserved_guids(index: &ModuleSummaryIndex) -> FxHashSet<Guid> {
    let mut roots = FxHashSet::default();

    roots.insert(Guid::from_unique_name("main"));

    for summary in index.functions() {
        if summary.is_preserved() {
            roots.insert(summary.guid());
        }
    }

    roots
}

/// Mark every function of `index` reachable from `roots`.
///
/// Dependency edges are (re)resolved against the final merged state of
///   the index before walking,
///     so callers need not invoke
///     [`resolve_dependencies`](ModuleSummaryIndex::resolve_dependencies)
///     themselves.
/// Root GUIDs with no summary are external symbols and are silently
///   skipped.
///
/// When `trace_symbol` is supplied,
///   the provenance chain of the most recently visited function whose
///   resolved name matches is returned in the result.
pub fn mark_live(
    index: &mut ModuleSummaryIndex,
    roots: &FxHashSet<Guid>,
    trace_symbol: Option<&str>,
) -> Liveness {
    index.resolve_dependencies();

    let arena = Bump::new();

    let mut worklist: Vec<&TraceNode> = roots
        .iter()
        .map(|&guid| {
            &*arena.alloc(TraceNode {
                parent: None,
                guid,
                reason: Reason::Preserved,
            })
        })
        .collect();

    let mut dump_target: Option<&TraceNode> = None;
    let mut live_count = 0;

    while let Some(node) = worklist.pop() {
        // No summary: an external symbol,
        //   which contributes nothing.
        let fref = match index.lookup(node.guid) {
            Some(fref) => fref,
            None => continue,
        };

        // The dump target may be revisited after it first went live,
        //   so resolve the trace before the liveness check.
        if let Some(symbol) = trace_symbol {
            let name = index.get(fref).name();

            if !name.is_empty() && name == symbol {
                dump_target = Some(node);
            }
        }

        if index.get(fref).is_live() {
            continue;
        }

        let summary = index.get_mut(fref);
        summary.mark_live();

        if summary.name().is_empty() {
            debug!("mark ({}) as live", summary.guid());
        } else {
            debug!("mark {} as live", summary.name());
        }

        live_count += 1;

        let type_refs = summary.type_refs().to_vec();

        for type_ref in type_refs {
            index.mark_used_type(type_ref);
        }

        let deps: Vec<_> = index.dependencies(fref).collect();

        for (target, kind) in deps {
            let reason = match kind {
                DependencyKind::Static => Reason::StaticReferenced,
                DependencyKind::Virtual => Reason::IndirectReferenced,
            };

            worklist.push(arena.alloc(TraceNode {
                parent: Some(node),
                guid: index.get(target).guid(),
                reason,
            }));
        }
    }

    let trace =
        dump_target.map(|target| TraceReport::resolve(index, target));

    Liveness { live_count, trace }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::summary::{
        Call, CallKind, FunctionSummary, SlotKind, VirtualMethodSlot,
    };

    fn guid(name: &str) -> Guid {
        Guid::from_unique_name(name)
    }

    fn add_function(
        index: &mut ModuleSummaryIndex,
        name: &str,
        calls: &[(CallKind, &str)],
    ) {
        let mut summary = FunctionSummary::new(guid(name));
        summary.set_name(name);

        for &(kind, callee) in calls {
            summary.add_call(Call::new(kind, guid(callee), callee));
        }

        index.add_function(summary).unwrap();
    }

    fn live_set(index: &ModuleSummaryIndex) -> Vec<Guid> {
        let mut live: Vec<_> = index
            .functions()
            .filter(|summary| summary.is_live())
            .map(|summary| summary.guid())
            .collect();

        live.sort();
        live
    }

    fn mark(index: &mut ModuleSummaryIndex) -> Liveness {
        let roots = preserved_guids(index);
        mark_live(index, &roots, None)
    }

    #[test]
    fn unpreserved_main_is_a_root_by_name() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[]);

        let result = mark(&mut index);

        assert_eq!(1, result.live_count);
        assert!(index.function(guid("main")).unwrap().is_live());
    }

    #[test]
    fn absent_main_is_ignored() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "f", &[]);

        let result = mark(&mut index);

        assert_eq!(0, result.live_count);
        assert!(live_set(&index).is_empty());
    }

    #[test]
    fn direct_chain_is_fully_live() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Direct, "f")]);
        add_function(&mut index, "f", &[(CallKind::Direct, "g")]);
        add_function(&mut index, "g", &[(CallKind::Direct, "h")]);
        add_function(&mut index, "h", &[]);

        let result = mark(&mut index);

        assert_eq!(4, result.live_count);
        assert_eq!(
            {
                let mut expected =
                    vec![guid("main"), guid("f"), guid("g"), guid("h")];
                expected.sort();
                expected
            },
            live_set(&index),
        );
    }

    #[test]
    fn broken_chain_leaves_tail_dead() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Direct, "f")]);
        add_function(&mut index, "f", &[(CallKind::Direct, "g")]);
        add_function(&mut index, "g", &[]);
        add_function(&mut index, "h", &[]);

        let result = mark(&mut index);

        assert_eq!(3, result.live_count);
        assert!(!index.function(guid("h")).unwrap().is_live());
    }

    #[test]
    fn unreached_function_stays_dead_without_preservation() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[]);
        add_function(&mut index, "orphan", &[(CallKind::Direct, "leaf")]);
        add_function(&mut index, "leaf", &[]);

        let result = mark(&mut index);

        assert_eq!(1, result.live_count);
        assert!(!index.function(guid("orphan")).unwrap().is_live());
        assert!(!index.function(guid("leaf")).unwrap().is_live());
    }

    #[test]
    fn preserved_function_roots_its_callees() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[]);
        add_function(&mut index, "orphan", &[(CallKind::Direct, "leaf")]);
        add_function(&mut index, "leaf", &[]);

        index
            .function_mut(guid("orphan"))
            .unwrap()
            .set_preserved(true);

        let result = mark(&mut index);

        assert_eq!(3, result.live_count);
        assert!(index.function(guid("orphan")).unwrap().is_live());
        assert!(index.function(guid("leaf")).unwrap().is_live());
    }

    #[test]
    fn witness_dispatch_reaches_implementation() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Witness, "P.m")]);
        add_function(&mut index, "impl_A", &[]);

        index.add_implementation(
            VirtualMethodSlot::new(SlotKind::Witness, guid("P.m")),
            guid("impl_A"),
        );

        mark(&mut index);

        assert!(index.function(guid("impl_A")).unwrap().is_live());
    }

    #[test]
    fn vtable_dispatch_reaches_every_implementation() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::VTable, "C.m")]);
        add_function(&mut index, "C.m.impl", &[]);
        add_function(&mut index, "D.m.impl", &[]);

        let slot = VirtualMethodSlot::new(SlotKind::VTable, guid("C.m"));
        index.add_implementation(slot, guid("C.m.impl"));
        index.add_implementation(slot, guid("D.m.impl"));

        let result = mark(&mut index);

        assert_eq!(3, result.live_count);
        assert!(index.function(guid("C.m.impl")).unwrap().is_live());
        assert!(index.function(guid("D.m.impl")).unwrap().is_live());
    }

    #[test]
    fn virtual_call_with_no_implementations_contributes_nothing() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Witness, "P.m")]);

        let result = mark(&mut index);

        assert_eq!(1, result.live_count);
    }

    #[test]
    fn direct_call_to_external_symbol_is_skipped() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(
            &mut index,
            "main",
            &[(CallKind::Direct, "external")],
        );

        let result = mark(&mut index);

        assert_eq!(1, result.live_count);
    }

    #[test]
    fn call_cycles_terminate() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Direct, "f")]);
        add_function(&mut index, "f", &[(CallKind::Direct, "g")]);
        add_function(&mut index, "g", &[(CallKind::Direct, "f")]);

        let result = mark(&mut index);

        assert_eq!(3, result.live_count);
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Direct, "f")]);
        add_function(&mut index, "f", &[]);

        mark(&mut index);
        let first = live_set(&index);

        let result = mark(&mut index);

        assert_eq!(first, live_set(&index));
        assert_eq!(0, result.live_count);
    }

    #[test]
    fn live_functions_mark_their_types_used() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[]);
        add_function(&mut index, "dead", &[]);

        index
            .function_mut(guid("main"))
            .unwrap()
            .add_type_ref(guid("T"));
        index
            .function_mut(guid("dead"))
            .unwrap()
            .add_type_ref(guid("U"));

        mark(&mut index);

        assert!(index.used_types().contains(&guid("T")));
        assert!(!index.used_types().contains(&guid("U")));
    }

    #[test]
    fn trace_reports_chain_back_to_root() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Direct, "f1")]);
        add_function(&mut index, "f1", &[(CallKind::Direct, "f2")]);
        add_function(&mut index, "f2", &[(CallKind::Direct, "f3")]);
        add_function(&mut index, "f3", &[]);

        let roots = preserved_guids(&index);
        let result = mark_live(&mut index, &roots, Some("f3"));

        let report = result.trace.expect("missing trace");

        assert_eq!(
            vec![
                (Some("f3"), guid("f3"), Reason::StaticReferenced),
                (Some("f2"), guid("f2"), Reason::StaticReferenced),
                (Some("f1"), guid("f1"), Reason::StaticReferenced),
                (Some("main"), guid("main"), Reason::Preserved),
            ],
            report
                .entries()
                .iter()
                .map(|entry| (
                    entry.name.as_deref(),
                    entry.guid,
                    entry.reason,
                ))
                .collect::<Vec<_>>(),
        );

        assert_eq!(
            format!(
                "f3 ({}) is referenced by:\n \
                 - f2 ({})\n \
                 - f1 ({})\n \
                 - main ({})\n",
                guid("f3"),
                guid("f2"),
                guid("f1"),
                guid("main"),
            ),
            report.to_string(),
        );
    }

    #[test]
    fn trace_reason_distinguishes_virtual_dispatch() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[(CallKind::Witness, "P.m")]);
        add_function(&mut index, "impl_A", &[]);

        index.add_implementation(
            VirtualMethodSlot::new(SlotKind::Witness, guid("P.m")),
            guid("impl_A"),
        );

        let roots = preserved_guids(&index);
        let result = mark_live(&mut index, &roots, Some("impl_A"));

        let report = result.trace.expect("missing trace");

        assert_eq!(
            Reason::IndirectReferenced,
            report.entries()[0].reason,
        );
    }

    #[test]
    fn trace_falls_back_on_missing_parent_name() {
        let mut index = ModuleSummaryIndex::new("A");

        // Stripped, preserved summary calling f.
        let mut stripped = FunctionSummary::new(Guid::from_raw(0xBEEF));
        stripped.set_preserved(true);
        stripped.add_call(Call::new(CallKind::Direct, guid("f"), "f"));
        index.add_function(stripped).unwrap();

        add_function(&mut index, "f", &[]);

        let roots = preserved_guids(&index);
        let result = mark_live(&mut index, &roots, Some("f"));

        let report = result.trace.expect("missing trace");

        assert_eq!(None, report.entries()[1].name);
        assert_eq!(
            format!(
                "f ({}) is referenced by:\n \
                 - **missing name** ({})\n",
                guid("f"),
                Guid::from_raw(0xBEEF),
            ),
            report.to_string(),
        );
    }

    #[test]
    fn trace_symbol_never_reached_yields_no_report() {
        let mut index = ModuleSummaryIndex::new("A");
        add_function(&mut index, "main", &[]);
        add_function(&mut index, "dead", &[]);

        let roots = preserved_guids(&index);
        let result = mark_live(&mut index, &roots, Some("dead"));

        assert!(result.trace.is_none());
    }
}
