// modsum object reader
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

//! Deserialize a [`ModuleSummaryIndex`] from a `modsum` object file.
//!
//! The reader enforces the record ordering documented in
//!   [the format description](super):
//!     module metadata,
//!     function groups,
//!     method groups,
//!     end of block.
//! Any deviation is a format error;
//!   summary files are compiler output and never merely suspicious.

use super::bits::BitReader;
use super::{
    record, ModsumError, GUID_VBR_WIDTH, MODSUM_SIGNATURE,
    RECORD_BLOCK_ID, RECORD_CODE_WIDTH,
};
use crate::guid::Guid;
use crate::summary::{
    Call, CallKind, FuncRef, FunctionSummary, ModuleSummaryIndex,
    SlotKind, VirtualMethodSlot,
};

/// Deserialize one summary index from the bytes of a summary file.
pub fn read_summary_index(
    buf: &[u8],
) -> Result<ModuleSummaryIndex, ModsumError> {
    if buf.len() < MODSUM_SIGNATURE.len()
        || buf[..MODSUM_SIGNATURE.len()] != MODSUM_SIGNATURE
    {
        return Err(ModsumError::BadSignature);
    }

    let mut reader = BitReader::new(buf);
    reader.read(32)?; // signature, verified above

    let block_id = reader.read(8)? as u8;

    if block_id != RECORD_BLOCK_ID {
        return Err(ModsumError::BadBlockId(block_id));
    }

    RecordReader::new(reader).read_block()
}

/// Stateful record-block reader.
struct RecordReader<'a> {
    reader: BitReader<'a>,
    index: Option<ModuleSummaryIndex>,

    /// Function group currently open for `CALL_GRAPH_EDGE` and
    ///   `TYPE_REF` records.
    cur_func: Option<FuncRef>,

    /// Whether the open function group has begun its type refs,
    ///   after which further call edges are out of order.
    saw_type_ref: bool,

    /// Method group currently open for `METHOD_IMPL` records.
    ///
    /// Once a method group opens,
    ///   function groups may no longer appear.
    cur_slot: Option<VirtualMethodSlot>,
}

impl<'a> RecordReader<'a> {
    fn new(reader: BitReader<'a>) -> Self {
        Self {
            reader,
            index: None,
            cur_func: None,
            saw_type_ref: false,
            cur_slot: None,
        }
    }

    fn read_guid(&mut self) -> Result<Guid, ModsumError> {
        Ok(Guid::from_raw(self.reader.read_vbr(GUID_VBR_WIDTH)?))
    }

    fn read_name(&mut self) -> Result<String, ModsumError> {
        String::from_utf8(self.reader.read_blob()?)
            .map_err(|e| ModsumError::BadName(e.utf8_error()))
    }

    fn index_mut(
        &mut self,
    ) -> Result<&mut ModuleSummaryIndex, ModsumError> {
        self.index
            .as_mut()
            .ok_or(ModsumError::MissingModuleMetadata)
    }

    fn read_module_metadata(&mut self) -> Result<(), ModsumError> {
        if self.index.is_some() {
            return Err(ModsumError::OutOfOrderRecord(
                record::MODULE_METADATA as u8,
            ));
        }

        let name = self.read_name()?;
        self.index = Some(ModuleSummaryIndex::new(name));

        Ok(())
    }

    fn read_func_metadata(&mut self) -> Result<(), ModsumError> {
        if self.cur_slot.is_some() {
            return Err(ModsumError::OutOfOrderRecord(
                record::FUNC_METADATA as u8,
            ));
        }

        let guid = self.read_guid()?;
        let live = self.reader.read(1)? != 0;
        let preserved = self.reader.read(1)? != 0;
        let name = self.read_name()?;

        let mut summary = FunctionSummary::new(guid);
        summary.set_live(live);
        summary.set_preserved(preserved);
        summary.set_name(name);

        self.cur_func = Some(self.index_mut()?.add_function(summary)?);
        self.saw_type_ref = false;

        Ok(())
    }

    fn read_call_graph_edge(&mut self) -> Result<(), ModsumError> {
        let func = match self.cur_func {
            Some(func) if !self.saw_type_ref => func,
            _ => {
                return Err(ModsumError::OutOfOrderRecord(
                    record::CALL_GRAPH_EDGE as u8,
                ))
            }
        };

        let kind = match self.reader.read(32)? as u32 {
            0 => CallKind::Direct,
            1 => CallKind::VTable,
            2 => CallKind::Witness,
            kind => return Err(ModsumError::BadCallKind(kind)),
        };

        let target = self.read_guid()?;
        let name = self.read_name()?;

        self.index_mut()?
            .get_mut(func)
            .add_call(Call::new(kind, target, name));

        Ok(())
    }

    fn read_type_ref(&mut self) -> Result<(), ModsumError> {
        let func = self.cur_func.ok_or(ModsumError::OutOfOrderRecord(
            record::TYPE_REF as u8,
        ))?;

        let guid = self.read_guid()?;

        self.index_mut()?.get_mut(func).add_type_ref(guid);
        self.saw_type_ref = true;

        Ok(())
    }

    fn read_method_metadata(&mut self) -> Result<(), ModsumError> {
        let kind = match self.reader.read(1)? {
            0 => SlotKind::Witness,
            _ => SlotKind::VTable,
        };
        let decl = self.read_guid()?;

        // Function groups are closed for the remainder of the block.
        self.cur_func = None;
        self.cur_slot = Some(VirtualMethodSlot::new(kind, decl));

        // Method groups may only follow module metadata.
        self.index_mut().map(|_| ())
    }

    fn read_method_impl(&mut self) -> Result<(), ModsumError> {
        let slot = self.cur_slot.ok_or(ModsumError::OutOfOrderRecord(
            record::METHOD_IMPL as u8,
        ))?;

        let implementation = self.read_guid()?;

        self.index_mut()?.add_implementation(slot, implementation);

        Ok(())
    }

    fn read_block(mut self) -> Result<ModuleSummaryIndex, ModsumError> {
        loop {
            match self.reader.read(RECORD_CODE_WIDTH)? {
                record::END_BLOCK => break,
                record::MODULE_METADATA => self.read_module_metadata()?,
                record::FUNC_METADATA => self.read_func_metadata()?,
                record::CALL_GRAPH_EDGE => self.read_call_graph_edge()?,
                record::METHOD_METADATA => self.read_method_metadata()?,
                record::METHOD_IMPL => self.read_method_impl()?,
                record::TYPE_REF => self.read_type_ref()?,
                code => {
                    return Err(ModsumError::UnknownRecord(code as u8))
                }
            }
        }

        self.reader.align_word()?;

        if !self.reader.at_end() {
            return Err(ModsumError::TrailingData);
        }

        self.index.ok_or(ModsumError::MissingModuleMetadata)
    }
}
