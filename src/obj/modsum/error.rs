// modsum object errors
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

//! Errors while processing `modsum` object files.
//!
//! Summary files are produced by the compiler,
//!   so every one of these conditions represents either a corrupted
//!   file or a producer bug;
//!     none is recoverable.

use super::bits::BitsError;
use crate::summary::MergeError;
use std::fmt::{self, Display};
use std::str::Utf8Error;

/// Error during `modsum` processing.
#[derive(Debug, PartialEq, Eq)]
pub enum ModsumError {
    /// Bit-level decoding failure
    ///   (truncated or malformed stream).
    Bits(BitsError),

    /// The file does not begin with the `MODS` signature.
    BadSignature,

    /// The block id is not the record-block id.
    BadBlockId(u8),

    /// A record code outside the defined set.
    UnknownRecord(u8),

    /// A known record appeared where the format does not permit it.
    OutOfOrderRecord(u8),

    /// The record block did not begin with `MODULE_METADATA`.
    MissingModuleMetadata,

    /// A `CALL_GRAPH_EDGE` carried a kind outside the call-kind enum.
    BadCallKind(u32),

    /// A name blob was not valid UTF-8.
    BadName(Utf8Error),

    /// Data remained after the end of the record block.
    TrailingData,

    /// The file defined the same symbol more than once.
    Merge(MergeError),
}

impl From<BitsError> for ModsumError {
    fn from(err: BitsError) -> Self {
        Self::Bits(err)
    }
}

impl From<Utf8Error> for ModsumError {
    fn from(err: Utf8Error) -> Self {
        Self::BadName(err)
    }
}

impl From<MergeError> for ModsumError {
    fn from(err: MergeError) -> Self {
        Self::Merge(err)
    }
}

impl Display for ModsumError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bits(err) => Display::fmt(err, fmt),
            Self::BadSignature => write!(
                fmt,
                "missing MODS signature (is this a module summary?)"
            ),
            Self::BadBlockId(id) => {
                write!(fmt, "unexpected block id {id}")
            }
            Self::UnknownRecord(code) => {
                write!(fmt, "unknown record code {code}")
            }
            Self::OutOfOrderRecord(code) => {
                write!(fmt, "record code {code} out of order")
            }
            Self::MissingModuleMetadata => {
                write!(fmt, "missing module metadata record")
            }
            Self::BadCallKind(kind) => {
                write!(fmt, "call kind {kind} out of range")
            }
            Self::BadName(err) => {
                write!(fmt, "name is not valid UTF-8: {err}")
            }
            Self::TrailingData => {
                write!(fmt, "trailing data after record block")
            }
            Self::Merge(err) => Display::fmt(err, fmt),
        }
    }
}

impl std::error::Error for ModsumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bits(err) => Some(err),
            Self::BadName(err) => Some(err),
            Self::Merge(err) => Some(err),
            _ => None,
        }
    }
}
