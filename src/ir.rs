// Producer IR contract
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

//! Output contract of the frontend consumed by the
//!   [indexer](crate::indexer).
//!
//! The frontend and its typed intermediate representations are external
//!   collaborators;
//!     this module specifies only the surface the indexer walks.
//! A [`Module`] carries the lowered functions of one compilation unit
//!   together with its dispatch tables:
//!     witness tables
//!       (protocol-to-implementation maps)
//!     and v-tables
//!       (class-hierarchy dispatch tables),
//!     plus key-path property descriptors that embed function references
//!     in data.
//!
//! Function bodies are reduced to the reference instructions relevant to
//!   reachability;
//!     everything else the frontend lowers is already gone by the time a
//!     [`Module`] is handed to the indexer.

/// One compilation unit as presented to the indexer.
#[derive(Debug, Default)]
pub struct Module {
    /// Name of the module being compiled.
    ///
    /// Dispatch-table preservation rules compare declaring modules
    ///   against this name.
    pub name: String,

    pub functions: Vec<Function>,
    pub witness_tables: Vec<WitnessTable>,
    pub vtables: Vec<VTable>,

    /// Key-path property descriptors.
    pub properties: Vec<Property>,
}

/// A lowered function definition.
#[derive(Debug, Default)]
pub struct Function {
    /// Unique mangled name.
    pub name: String,

    pub representation: Representation,

    /// Whether the function is referenced from native C.
    pub has_c_references: bool,

    /// Reference instructions in source order.
    pub body: Vec<Inst>,
}

/// Calling-convention representation of a [`Function`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    #[default]
    Native,

    /// Foreign (Objective-C-compatible) method representation.
    ///
    /// Such functions may be invoked by the foreign runtime without any
    ///   visible reference and so must always be preserved.
    ForeignMethod,
}

/// A reference instruction within a function body.
#[derive(Debug)]
pub enum Inst {
    /// Direct reference to the concrete function `callee`.
    FunctionRef { callee: String },

    /// Protocol-requirement dispatch through the declaration
    ///   `requirement`.
    WitnessMethod { requirement: String },

    /// Class-hierarchy dispatch through the declaration `declaration`.
    ClassMethod { declaration: String },

    /// Key-path instantiation.
    KeyPath { pattern: Vec<KeyPathComponent> },

    /// Reference to the type `name`.
    TypeRef { name: String },
}

/// One component of a key-path pattern.
///
/// Components embed references to getter/setter/equality functions
///   directly in data,
///     either as concrete functions or as virtual methods.
#[derive(Debug, Default)]
pub struct KeyPathComponent {
    /// Concrete functions referenced by this component.
    pub functions: Vec<String>,

    /// Virtual methods referenced by this component.
    pub methods: Vec<MethodRef>,
}

/// A method reference together with its declaring context.
#[derive(Debug)]
pub struct MethodRef {
    /// Mangled name of the method declaration.
    pub declaration: String,

    pub context: DeclContext,
}

/// Context declaring a referenced method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclContext {
    Class,
    Protocol,

    /// Any other context.
    ///
    /// Key paths can only be keyed by class or protocol methods;
    ///   the indexer rejects this as a producer bug.
    Other,
}

/// Protocol-to-implementation dispatch table for one conformance.
#[derive(Debug, Default)]
pub struct WitnessTable {
    /// Module declaring the conformance.
    pub module: String,

    /// Module declaring the protocol.
    pub protocol_module: String,

    pub entries: Vec<WitnessEntry>,
}

/// One method entry of a [`WitnessTable`].
#[derive(Debug)]
pub struct WitnessEntry {
    /// Mangled name of the protocol requirement.
    pub requirement: String,

    /// Mangled name of the witnessing implementation,
    ///   if any.
    pub witness: Option<String>,
}

/// Class-hierarchy dispatch table for one class.
#[derive(Debug, Default)]
pub struct VTable {
    pub entries: Vec<VTableEntry>,
}

/// One entry of a [`VTable`].
#[derive(Debug)]
pub struct VTableEntry {
    /// Mangled name of the method declaration.
    pub method: String,

    /// Module declaring the method.
    pub method_module: String,

    pub method_kind: MethodKind,
    pub entry_kind: VTableEntryKind,

    /// Mangled name of the implementing function.
    pub implementation: String,
}

/// Kind of method a [`VTableEntry`] dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,

    /// Deallocating destructor.
    ///
    /// May be invoked dynamically by the runtime on release.
    Deallocator,

    /// Instance-variable destroyer.
    ///
    /// May be invoked dynamically by the runtime on release.
    IVarDestroyer,
}

/// How a [`VTableEntry`] relates to the class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VTableEntryKind {
    Normal,

    /// Overrides a method declared on a superclass.
    Override,
}

/// Key-path property descriptor.
#[derive(Debug, Default)]
pub struct Property {
    /// The referenced component,
    ///   if the descriptor carries one.
    pub component: Option<KeyPathComponent>,
}
