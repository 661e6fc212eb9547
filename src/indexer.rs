// Module summary indexing
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

//! Produce one [`ModuleSummaryIndex`] from one compilation unit.
//!
//! Indexing walks every reference instruction of every function and
//!   classifies it as a direct or virtual call edge,
//!     registers the implementations recorded in witness tables and
//!     v-tables,
//!   and applies every preservation rule:
//!
//!   - functions with a foreign method representation or native-C
//!       references are intrinsically preserved;
//!   - witnesses of a conformance that may be used externally
//!       (the conformance or its protocol is declared in another
//!         module)
//!       are preserved;
//!   - deallocators and ivar destroyers are preserved because the
//!       runtime may invoke them without a visible reference;
//!   - overrides of methods declared in other modules are preserved
//!       because external hierarchies may call them virtually; and
//!   - everything referenced by a key-path property descriptor is
//!       preserved,
//!         conservatively,
//!         because key-path liveness cannot yet be proven.

use crate::guid::Guid;
use crate::ir;
use crate::summary::{
    Call, CallKind, FunctionSummary, MergeError, ModuleSummaryIndex,
    SlotKind, VirtualMethodSlot,
};
use std::fmt::{self, Display};

/// Build the summary index for `module`.
pub fn index_module(
    module: &ir::Module,
) -> Result<ModuleSummaryIndex, IndexError> {
    ModuleIndexer::new(module).index_module()
}

/// Whether `function` must be preserved regardless of references.
fn should_preserve_function(function: &ir::Function) -> bool {
    function.representation == ir::Representation::ForeignMethod
        || function.has_c_references
}

/// Indexer for a single function body.
struct FunctionIndexer<'a> {
    function: &'a ir::Function,
    summary: FunctionSummary,
}

impl<'a> FunctionIndexer<'a> {
    fn new(function: &'a ir::Function) -> Self {
        let mut summary =
            FunctionSummary::new(Guid::from_unique_name(&function.name));
        summary.set_name(&function.name);

        Self { function, summary }
    }

    fn index_direct_call(&mut self, callee: &str) {
        self.summary.add_call(Call::new(
            CallKind::Direct,
            Guid::from_unique_name(callee),
            callee,
        ));
    }

    fn index_virtual_call(&mut self, decl: &str, kind: CallKind) {
        self.summary.add_call(Call::new(
            kind,
            Guid::from_unique_name(decl),
            decl,
        ));
    }

    fn index_inst(&mut self, inst: &ir::Inst) -> Result<(), IndexError> {
        match inst {
            ir::Inst::FunctionRef { callee } => {
                self.index_direct_call(callee)
            }

            ir::Inst::WitnessMethod { requirement } => {
                self.index_virtual_call(requirement, CallKind::Witness)
            }

            ir::Inst::ClassMethod { declaration } => {
                self.index_virtual_call(declaration, CallKind::VTable)
            }

            ir::Inst::KeyPath { pattern } => {
                for component in pattern {
                    self.index_key_path_component(component)?;
                }
            }

            ir::Inst::TypeRef { name } => self
                .summary
                .add_type_ref(Guid::from_unique_name(name)),
        }

        Ok(())
    }

    fn index_key_path_component(
        &mut self,
        component: &ir::KeyPathComponent,
    ) -> Result<(), IndexError> {
        for function in &component.functions {
            self.index_direct_call(function);
        }

        for method in &component.methods {
            match method.context {
                ir::DeclContext::Class => self.index_virtual_call(
                    &method.declaration,
                    CallKind::VTable,
                ),
                ir::DeclContext::Protocol => self.index_virtual_call(
                    &method.declaration,
                    CallKind::Witness,
                ),
                ir::DeclContext::Other => {
                    return Err(IndexError::KeyPathContext(
                        method.declaration.clone(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn index_function(mut self) -> Result<FunctionSummary, IndexError> {
        for inst in &self.function.body {
            self.index_inst(inst)?;
        }

        self.summary
            .set_preserved(should_preserve_function(self.function));

        Ok(self.summary)
    }
}

/// Indexer for a whole compilation unit.
struct ModuleIndexer<'a> {
    module: &'a ir::Module,
    summary: ModuleSummaryIndex,
}

impl<'a> ModuleIndexer<'a> {
    fn new(module: &'a ir::Module) -> Self {
        Self {
            module,
            summary: ModuleSummaryIndex::new(module.name.as_str()),
        }
    }

    /// Force the already-indexed function `guid` to be preserved.
    ///
    /// Every function a dispatch table or key path references must have
    ///   been indexed from this module;
    ///     anything else is a producer bug.
    fn ensure_preserved(&mut self, guid: Guid) -> Result<(), IndexError> {
        self.summary
            .function_mut(guid)
            .ok_or(IndexError::UnknownFunction(guid))?
            .set_preserved(true);

        Ok(())
    }

    /// Preserve every known implementation of `slot`.
    ///
    /// A slot with no registered implementations is a no-op.
    fn ensure_preserved_slot(
        &mut self,
        slot: VirtualMethodSlot,
    ) -> Result<(), IndexError> {
        let impls = self.summary.implementations(slot).to_vec();

        for implementation in impls {
            self.ensure_preserved(implementation)?;
        }

        Ok(())
    }

    fn preserve_key_path_component(
        &mut self,
        component: &ir::KeyPathComponent,
    ) -> Result<(), IndexError> {
        for function in &component.functions {
            self.ensure_preserved(Guid::from_unique_name(function))?;
        }

        for method in &component.methods {
            let decl = Guid::from_unique_name(&method.declaration);

            match method.context {
                ir::DeclContext::Class => self.ensure_preserved_slot(
                    VirtualMethodSlot::new(SlotKind::VTable, decl),
                )?,
                ir::DeclContext::Protocol => self.ensure_preserved_slot(
                    VirtualMethodSlot::new(SlotKind::Witness, decl),
                )?,
                ir::DeclContext::Other => {
                    return Err(IndexError::KeyPathContext(
                        method.declaration.clone(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn index_witness_table(
        &mut self,
        table: &ir::WitnessTable,
    ) -> Result<(), IndexError> {
        // The conformance is visible to other modules if either side of
        //   it is declared elsewhere.
        let externally_used = table.module != self.module.name
            || table.protocol_module != self.module.name;

        for entry in &table.entries {
            let witness = match &entry.witness {
                Some(witness) => witness,
                None => continue,
            };

            let implementation = Guid::from_unique_name(witness);

            self.summary.add_implementation(
                VirtualMethodSlot::new(
                    SlotKind::Witness,
                    Guid::from_unique_name(&entry.requirement),
                ),
                implementation,
            );

            if externally_used {
                self.ensure_preserved(implementation)?;
            }
        }

        Ok(())
    }

    fn index_vtable(
        &mut self,
        table: &ir::VTable,
    ) -> Result<(), IndexError> {
        for entry in &table.entries {
            let implementation =
                Guid::from_unique_name(&entry.implementation);

            // Destructors can be invoked by the runtime on release.
            if matches!(
                entry.method_kind,
                ir::MethodKind::Deallocator | ir::MethodKind::IVarDestroyer
            ) {
                self.ensure_preserved(implementation)?;
            }

            let external_method =
                entry.method_module != self.module.name;

            if entry.entry_kind == ir::VTableEntryKind::Override
                && external_method
            {
                self.ensure_preserved(implementation)?;
            }

            self.summary.add_implementation(
                VirtualMethodSlot::new(
                    SlotKind::VTable,
                    Guid::from_unique_name(&entry.method),
                ),
                implementation,
            );
        }

        Ok(())
    }

    fn index_module(mut self) -> Result<ModuleSummaryIndex, IndexError> {
        for function in &self.module.functions {
            let summary = FunctionIndexer::new(function).index_function()?;
            self.summary.add_function(summary)?;
        }

        for table in &self.module.witness_tables {
            self.index_witness_table(table)?;
        }

        for table in &self.module.vtables {
            self.index_vtable(table)?;
        }

        // Key paths resolve virtual methods through the implementation
        //   table and so must come after every table is indexed.
        //
        // TODO: Key paths could participate in liveness rather than
        //   being preserved outright once the producer can attribute
        //   their use sites.
        for property in &self.module.properties {
            if let Some(component) = &property.component {
                self.preserve_key_path_component(component)?;
            }
        }

        Ok(self.summary)
    }
}

/// Error while indexing a compilation unit.
///
/// All of these indicate a bug in the producing frontend and must halt
///   the pipeline loudly.
#[derive(Debug, PartialEq, Eq)]
pub enum IndexError {
    /// A dispatch table or key path referenced a function that was not
    ///   indexed from this module.
    UnknownFunction(Guid),

    /// A key path was keyed by a method declared outside any class or
    ///   protocol context.
    KeyPathContext(String),

    /// The module defined the same symbol more than once.
    Duplicate(MergeError),
}

impl From<MergeError> for IndexError {
    fn from(err: MergeError) -> Self {
        Self::Duplicate(err)
    }
}

impl Display for IndexError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownFunction(guid) => write!(
                fmt,
                "dispatch table references unindexed function ({guid})"
            ),
            Self::KeyPathContext(decl) => write!(
                fmt,
                "key path keyed by non-class, non-protocol method `{decl}`"
            ),
            Self::Duplicate(err) => Display::fmt(err, fmt),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Duplicate(err) => Some(err),
            _ => None,
        }
    }
}
