//! CALL codegen: actuals are copied or their addresses are written into
//! the callee's fixed parameter cells before transferring control.

use crate::codegen::state::CodeGen;
use crate::memory::{FormalKind, ParamCells};

impl<'m> CodeGen<'m> {
    pub fn gen_call(&mut self, name: &str, actuals: &[String], line: usize) {
        let proc = self
            .memory
            .procedures
            .get(name)
            .expect("resolved by analyzer")
            .clone();

        for (actual, (kind, cells)) in actuals
            .iter()
            .zip(proc.formal_kinds.iter().zip(proc.param_cells.iter()))
        {
            match (kind, cells) {
                (FormalKind::Input, ParamCells::Scalar(target_cell)) => {
                    self.load_value(&crate::ast::Identifier::Scalar {
                        name: actual.clone(),
                        line,
                    });
                    self.emit(format!("STORE {}", target_cell));
                }
                (FormalKind::Scalar | FormalKind::Output, ParamCells::Scalar(target_cell)) => {
                    let symbol = self.memory.resolve(actual, line).expect("resolved by analyzer");
                    let scalar = symbol.as_scalar().expect("scalar actual");
                    if scalar.is_reference {
                        self.emit(format!("LOAD {}", scalar.cell));
                    } else {
                        self.gen_constant(scalar.cell as i64, "a");
                    }
                    self.emit(format!("STORE {}", target_cell));
                }
                (FormalKind::Array, ParamCells::Array { base, lo }) => {
                    let symbol = self.memory.resolve(actual, line).expect("resolved by analyzer");
                    let arr = symbol.as_array().expect("array actual");
                    if arr.is_reference {
                        self.emit(format!("LOAD {}", arr.base_cell));
                    } else {
                        self.gen_constant(arr.base_cell as i64, "a");
                    }
                    self.emit(format!("STORE {}", base));

                    if let Some(lo_cell) = arr.lo_cell {
                        self.emit(format!("LOAD {}", lo_cell));
                    } else {
                        self.gen_constant(arr.lo, "a");
                    }
                    self.emit(format!("STORE {}", lo));
                }
                _ => unreachable!("formal kind and cell layout always agree"),
            }
        }

        self.emit(format!("CALL {}", name));
    }
}
