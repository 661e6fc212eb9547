// Summary linker library
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

//! Combine [module summaries](crate::summary) and mark the live set.
//!
//! Its user-facing binary is `sumld`.
//!
//! The link-time pipeline works in the following steps:
//!
//!   1. Each input summary file is
//!        [read](crate::obj::modsum::read_summary_index) and
//!        [merged](crate::summary::ModuleSummaryIndex::merge) into one
//!        combined index,
//!          conventionally named `combined`.
//!      A symbol defined by more than one module is an error.
//!
//!   2. The [liveness engine](liveness) computes the root set
//!        (every preserved function plus `main`)
//!        and marks every function reachable from it through direct and
//!        virtual call edges.
//!      _Functions not reachable from the root set remain dead and may
//!        be elided by a later code-generation step._
//!
//!   3. The annotated index is
//!        [re-serialized](crate::obj::modsum::write_summary_index) for
//!        that downstream consumer.
//!
//! Liveness is deliberately the only analysis performed here:
//!   there is no cycle breaking and no devirtualization,
//!     only reachability.

pub mod liveness;
