// Object files
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

//! Summary object-file construction and processing.
//!
//! A summary object file carries one serialized
//!   [`ModuleSummaryIndex`](crate::summary::ModuleSummaryIndex):
//!     the per-module output of the [indexer](crate::indexer) on the way
//!     in,
//!     and the annotated combined index on the way out.
//! The only format currently supported is [`modsum`],
//!   a record-oriented bitstream.

pub mod modsum;
