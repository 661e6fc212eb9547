// Module summary index
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

//! Call-graph and virtual-dispatch summaries keyed by [`Guid`].
//!
//! A [`FunctionSummary`] describes one defined function:
//!   its outgoing [`Call`]s,
//!   whether it must be [preserved](FunctionSummary::is_preserved)
//!     regardless of references,
//!   and whether [liveness](crate::ld::liveness) has marked it reachable.
//! Summaries live on a [`ModuleSummaryIndex`],
//!   which also carries the virtual-dispatch table mapping each
//!   [`VirtualMethodSlot`] to its known concrete implementations.
//!
//! One index represents either a single compilation unit
//!   (as produced by the [indexer](crate::indexer))
//!   or the merged whole-program view
//!   (see [`ModuleSummaryIndex::merge`]).
//!
//! [`Guid`]: crate::guid::Guid

mod graph;
mod object;

pub use graph::{
    DependencyKind, FuncRef, MergeError, ModuleSummaryIndex,
};
pub use object::{
    Call, CallKind, FunctionSummary, SlotKind, VirtualMethodSlot,
};
