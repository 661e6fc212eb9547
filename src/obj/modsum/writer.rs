// modsum object writer
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

//! Serialize a [`ModuleSummaryIndex`] as a `modsum` object file.
//!
//! Output is deterministic for a given index:
//!   function groups follow summary insertion order,
//!   calls and type refs follow emission order,
//!   and method groups follow slot order.

use super::bits::BitWriter;
use super::{
    record, GUID_VBR_WIDTH, MODSUM_SIGNATURE, RECORD_BLOCK_ID,
    RECORD_CODE_WIDTH,
};
use crate::summary::ModuleSummaryIndex;

/// Serialize `index` into the bytes of a summary file.
pub fn write_summary_index(index: &ModuleSummaryIndex) -> Vec<u8> {
    let mut writer = BitWriter::new();

    for &byte in &MODSUM_SIGNATURE {
        writer.write(byte as u64, 8);
    }

    writer.write(RECORD_BLOCK_ID as u64, 8);

    writer.write(record::MODULE_METADATA, RECORD_CODE_WIDTH);
    writer.write_blob(index.name().as_bytes());

    for summary in index.functions() {
        writer.write(record::FUNC_METADATA, RECORD_CODE_WIDTH);
        writer.write_vbr(summary.guid().as_u64(), GUID_VBR_WIDTH);
        writer.write(summary.is_live() as u64, 1);
        writer.write(summary.is_preserved() as u64, 1);
        writer.write_blob(summary.name().as_bytes());

        for call in summary.calls() {
            writer.write(record::CALL_GRAPH_EDGE, RECORD_CODE_WIDTH);
            writer.write(call.kind() as u64, 32);
            writer.write_vbr(call.callee().as_u64(), GUID_VBR_WIDTH);
            writer.write_blob(call.name().as_bytes());
        }

        for type_ref in summary.type_refs() {
            writer.write(record::TYPE_REF, RECORD_CODE_WIDTH);
            writer.write_vbr(type_ref.as_u64(), GUID_VBR_WIDTH);
        }
    }

    for (slot, impls) in index.slots() {
        writer.write(record::METHOD_METADATA, RECORD_CODE_WIDTH);
        writer.write(slot.kind() as u64, 1);
        writer.write_vbr(slot.decl().as_u64(), GUID_VBR_WIDTH);

        for implementation in impls {
            writer.write(record::METHOD_IMPL, RECORD_CODE_WIDTH);
            writer.write_vbr(implementation.as_u64(), GUID_VBR_WIDTH);
        }
    }

    writer.write(record::END_BLOCK, RECORD_CODE_WIDTH);

    writer.into_bytes()
}
