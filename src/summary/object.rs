// Summary objects
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

//! Objects represented on the summary index.
//!
//! _This is a private module.
//!  See [`super`] for available exports._

use crate::guid::Guid;

/// How a call site refers to its callee.
///
/// The discriminant values are stable;
///   they appear in the serialized `CALL_GRAPH_EDGE` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Static reference to a concrete function.
    Direct = 0,

    /// Class-hierarchy dispatch through a method declaration.
    VTable = 1,

    /// Protocol-requirement dispatch through a requirement declaration.
    Witness = 2,
}

impl CallKind {
    /// Kind of [`VirtualMethodSlot`] this call resolves through,
    ///   if any.
    ///
    /// [`CallKind::Direct`] calls name their callee outright and yield
    ///   [`None`].
    pub fn slot_kind(self) -> Option<SlotKind> {
        match self {
            Self::Direct => None,
            Self::VTable => Some(SlotKind::VTable),
            Self::Witness => Some(SlotKind::Witness),
        }
    }
}

/// One outgoing edge of a [`FunctionSummary`].
///
/// For a [`Direct`](CallKind::Direct) call the [`Guid`] identifies the
///   callee itself;
///     for virtual calls it identifies the _abstract declaration_
///     (the slot key),
///       never any particular implementation.
/// The callee name is retained purely for diagnostics and may be empty
///   in a stripped summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    kind: CallKind,
    callee: Guid,
    name: String,
}

impl Call {
    pub fn new(kind: CallKind, callee: Guid, name: impl Into<String>) -> Self {
        Self {
            kind,
            callee,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn callee(&self) -> Guid {
        self.callee
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Dispatch-table kind of a [`VirtualMethodSlot`].
///
/// The discriminant values are stable;
///   they appear in the serialized `METHOD_METADATA` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlotKind {
    /// Protocol-requirement (witness-table) dispatch.
    Witness = 0,

    /// Class-hierarchy (v-table) dispatch.
    VTable = 1,
}

/// Key into the virtual-dispatch implementation table.
///
/// Equality is structural on `(kind, decl)`.
/// Slots are ordered so the implementation table can be stored in a
///   sorted map,
///     which keeps re-serialization of a merged index deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtualMethodSlot {
    kind: SlotKind,
    decl: Guid,
}

impl VirtualMethodSlot {
    pub fn new(kind: SlotKind, decl: Guid) -> Self {
        Self { kind, decl }
    }

    /// Slot that the virtual call `call` dispatches through,
    ///   or [`None`] for a direct call.
    pub fn for_call(call: &Call) -> Option<Self> {
        call.kind()
            .slot_kind()
            .map(|kind| Self::new(kind, call.callee()))
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn decl(&self) -> Guid {
        self.decl
    }
}

/// Summary of one defined function.
///
/// The summary is created by the
///   [indexer](crate::indexer),
///     serialized once per module,
///     merged into the combined index at link time,
///     and mutated only by the
///       [liveness engine](crate::ld::liveness)
///       (which may flip `live` false→true, never back).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSummary {
    guid: Guid,
    name: String,
    live: bool,
    preserved: bool,
    calls: Vec<Call>,
    type_refs: Vec<Guid>,
}

impl FunctionSummary {
    /// New dead, unpreserved summary for the function identified by
    ///   `guid`.
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            name: String::new(),
            live: false,
            preserved: false,
            calls: Vec::new(),
            type_refs: Vec::new(),
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Mangled name used to compute [`FunctionSummary::guid`],
    ///   retained for diagnostics.
    ///
    /// May be empty in a stripped summary.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Restore a serialized liveness mark.
    ///
    /// During analysis use [`FunctionSummary::mark_live`] instead;
    ///   this exists for the deserializer,
    ///     which must reproduce flags exactly as written.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    /// Mark the function reachable.
    pub fn mark_live(&mut self) {
        self.live = true;
    }

    /// Whether the function is a liveness root regardless of incoming
    ///   references.
    pub fn is_preserved(&self) -> bool {
        self.preserved
    }

    pub fn set_preserved(&mut self, preserved: bool) {
        self.preserved = preserved;
    }

    /// Append an outgoing call edge.
    ///
    /// Calls are kept in emission order;
    ///   duplicates are permitted and preserved.
    pub fn add_call(&mut self, call: Call) {
        self.calls.push(call);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Record a reference to the type identified by `guid`.
    pub fn add_type_ref(&mut self, guid: Guid) {
        self.type_refs.push(guid);
    }

    pub fn type_refs(&self) -> &[Guid] {
        &self.type_refs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_summary_is_dead_and_unpreserved() {
        let sut = FunctionSummary::new(Guid::from_unique_name("f"));

        assert!(!sut.is_live());
        assert!(!sut.is_preserved());
        assert!(sut.calls().is_empty());
        assert!(sut.type_refs().is_empty());
        assert_eq!("", sut.name());
    }

    #[test]
    fn calls_retain_emission_order_and_duplicates() {
        let mut sut = FunctionSummary::new(Guid::from_unique_name("f"));

        let callee = Guid::from_unique_name("g");
        let first = Call::new(CallKind::Direct, callee, "g");
        let vcall = Call::new(CallKind::VTable, callee, "g");

        sut.add_call(first.clone());
        sut.add_call(vcall.clone());
        sut.add_call(first.clone());

        assert_eq!(&[first.clone(), vcall, first], sut.calls());
    }

    #[test]
    fn slot_for_virtual_call_keys_on_declaration() {
        let decl = Guid::from_unique_name("P.m");
        let call = Call::new(CallKind::Witness, decl, "P.m");

        assert_eq!(
            Some(VirtualMethodSlot::new(SlotKind::Witness, decl)),
            VirtualMethodSlot::for_call(&call),
        );
    }

    #[test]
    fn slot_for_direct_call_is_none() {
        let call =
            Call::new(CallKind::Direct, Guid::from_unique_name("g"), "g");

        assert_eq!(None, VirtualMethodSlot::for_call(&call));
    }
}
