// Stable symbol identity
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

//! Stable 64-bit fingerprints of unique mangled names.
//!
//! Symbols are referenced across module boundaries by [`Guid`] rather
//!   than by name so that summaries remain compact and comparisons
//!   remain `O(1)`.
//! The fingerprint is the low 64 bits of the MD5 digest of the mangled
//!   name---specifically
//!     bytes `0..8` of the digest interpreted as a little-endian `u64`.
//! Producers and consumers must agree on this reduction bit-for-bit,
//!   so it must never change.
//!
//! The reduction is not collision-resistant at cryptographic strength.
//! That is fine for this purpose:
//!   inputs are _unique_ mangled names,
//!     and a 64-bit namespace yields collisions only at astronomical
//!     symbol counts.
//! Names that do collide are treated as the same symbol.

use md5::{Digest, Md5};
use std::fmt::{self, Display};

/// Stable 64-bit fingerprint of a symbol's unique mangled name.
///
/// See the [module-level documentation](self) for the digest reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(u64);

impl Guid {
    /// Fingerprint the unique mangled name `name`.
    ///
    /// The same name always produces the same [`Guid`],
    ///   on every platform and in every process.
    pub fn from_unique_name(name: &str) -> Self {
        let digest = Md5::digest(name.as_bytes());

        let mut low = [0u8; 8];
        low.copy_from_slice(&digest[..8]);

        Self(u64::from_le_bytes(low))
    }

    /// Wrap an already-reduced value,
    ///   as when deserializing a summary.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw 64-bit value for serialization.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for Guid {
    /// Display as the decimal value used in diagnostics and traces.
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, fmt)
    }
}
