//! Binding access and destructuring
//!
//! Loads and stores are selected by the storage the environment layout
//! assigned to each binding. Names that resolve to no declaration are
//! host globals.

use kiln_syntax::ast::{Expression, Function, Pattern};

use super::FunctionLowerer;
use crate::abi::BindingStorage;
use crate::error::CompileResult;
use crate::lir::{BinaryOp, Constant, Instr, LocalSlot, Temp};
use crate::scope::BindingId;

impl<'a> FunctionLowerer<'a> {
    fn local_slot(&mut self, binding: BindingId) -> LocalSlot {
        if let Some(slot) = self.locals.get(&binding) {
            return *slot;
        }
        let slot = self.builder.new_local();
        self.locals.insert(binding, slot);
        slot
    }

    pub(super) fn load_binding(&mut self, binding: BindingId) -> CompileResult<Temp> {
        let storage = self.layout.storage(self.tree, binding)?.clone();
        let dest = self.builder.new_temp();
        let instr = match storage {
            BindingStorage::Local => Instr::LoadLocal {
                dest,
                slot: self.local_slot(binding),
            },
            BindingStorage::Argument { parameter_index } => Instr::LoadArgument {
                dest,
                index: parameter_index,
            },
            BindingStorage::OwnScopeField { field } => Instr::LoadScopeField { dest, field },
            BindingStorage::AncestorScopeField { field, chain_index } => {
                Instr::LoadParentScopeField {
                    dest,
                    chain_index,
                    field,
                }
            }
        };
        self.builder.emit(instr);
        Ok(dest)
    }

    pub(super) fn store_binding(&mut self, binding: BindingId, value: Temp) -> CompileResult<()> {
        let storage = self.layout.storage(self.tree, binding)?.clone();
        let instr = match storage {
            BindingStorage::Local => Instr::StoreLocal {
                slot: self.local_slot(binding),
                value,
            },
            BindingStorage::Argument { parameter_index } => Instr::StoreArgument {
                index: parameter_index,
                value,
            },
            BindingStorage::OwnScopeField { field } => Instr::StoreScopeField { field, value },
            BindingStorage::AncestorScopeField { field, chain_index } => {
                Instr::StoreParentScopeField {
                    chain_index,
                    field,
                    value,
                }
            }
        };
        self.builder.emit(instr);
        Ok(())
    }

    /// Read a name visible at the current position
    pub(super) fn load_name(&mut self, name: &str) -> CompileResult<Temp> {
        match self.tree.resolve(self.current_scope, name) {
            Some(binding) => self.load_binding(binding),
            None => {
                let dest = self.builder.new_temp();
                self.builder.emit(Instr::LoadGlobal {
                    dest,
                    name: name.to_string(),
                });
                Ok(dest)
            }
        }
    }

    /// Write a name visible at the current position
    pub(super) fn store_name(&mut self, name: &str, value: Temp) -> CompileResult<()> {
        match self.tree.resolve(self.current_scope, name) {
            Some(binding) => self.store_binding(binding, value),
            None => {
                self.builder.emit(Instr::StoreGlobal {
                    name: name.to_string(),
                    value,
                });
                Ok(())
            }
        }
    }

    /// Replace `value` with the default when it is `undefined`
    pub(super) fn apply_default(&mut self, value: Temp, default: &Expression) -> CompileResult<()> {
        let undefined = self.constant(Constant::Undefined);
        let is_undefined = self.builder.new_temp();
        self.builder.emit(Instr::Binary {
            dest: is_undefined,
            op: BinaryOp::StrictEqual,
            left: value,
            right: undefined,
        });
        let skip = self.builder.new_label();
        self.builder.emit(Instr::BranchIfFalse {
            cond: is_undefined,
            target: skip,
        });
        let default_value = self.lower_expr(default)?;
        self.builder.emit(Instr::Move {
            dest: value,
            src: default_value,
        });
        self.builder.place(skip);
        Ok(())
    }

    /// Bind every name of `pattern` from `value`, resolving names from the
    /// current scope. Used for declarations and assignment patterns alike:
    /// the scope builder already placed each declared name in the scope it
    /// belongs to.
    pub(super) fn store_pattern(&mut self, pattern: &Pattern, value: Temp) -> CompileResult<()> {
        match pattern {
            Pattern::Identifier(id) => self.store_name(&id.name, value),
            Pattern::Array(array) => {
                for (index, element) in array.elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    let index = self.constant(Constant::Number(index as f64));
                    let item = self.builder.new_temp();
                    self.builder.emit(Instr::GetIndex {
                        dest: item,
                        object: value,
                        index,
                    });
                    if let Some(default) = &element.default {
                        self.apply_default(item, default)?;
                    }
                    self.store_pattern(&element.pattern, item)?;
                }
                Ok(())
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    let item = self.builder.new_temp();
                    self.builder.emit(Instr::GetProperty {
                        dest: item,
                        object: value,
                        name: property.key.name.clone(),
                    });
                    if let Some(default) = &property.default {
                        self.apply_default(item, default)?;
                    }
                    self.store_pattern(&property.value, item)?;
                }
                Ok(())
            }
        }
    }

    /// Copy incoming arguments into their bindings. A plain parameter kept
    /// in its argument slot needs no code unless it has a default.
    pub(super) fn lower_parameters(&mut self, func: &Function) -> CompileResult<()> {
        for (index, param) in func.params.iter().enumerate() {
            let stays_in_argument = match &param.pattern {
                Pattern::Identifier(id) => self
                    .tree
                    .scope(self.callable)
                    .lookup_local(&id.name)
                    .and_then(|binding| self.layout.lookup(binding))
                    .is_some_and(|storage| matches!(storage, BindingStorage::Argument { .. })),
                _ => false,
            };
            if stays_in_argument && param.default_value.is_none() {
                continue;
            }
            let value = self.builder.new_temp();
            self.builder.emit(Instr::LoadArgument {
                dest: value,
                index: index as u32,
            });
            if let Some(default) = &param.default_value {
                self.apply_default(value, default)?;
            }
            self.store_pattern(&param.pattern, value)?;
        }
        Ok(())
    }
}
