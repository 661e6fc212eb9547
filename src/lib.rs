// modsum library
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

//! Cross-module link-time dead-symbol elimination.
//!
//! Each compilation unit emits a compact _module summary_ describing the
//!   functions it defines,
//!     the static and virtual calls they make,
//!     and the dispatch tables that resolve virtual calls to concrete
//!     implementations.
//! Summaries are produced by the [indexer](indexer) from the frontend's
//!   [IR contract](ir) and serialized as
//!   [`modsum` object files](obj::modsum).
//! At link time the `sumld` driver merges every summary into one
//!   [combined index](summary),
//!     computes the set of functions [reachable](ld::liveness) from the
//!     preserved root set,
//!   and re-emits the annotated index so that a later code-generation
//!     step can elide unreachable definitions.

pub mod guid;
pub mod indexer;
pub mod ir;
pub mod ld;
pub mod obj;
pub mod summary;
