//! Expression lowering: constant folding, strength reduction, and
//! identifier addressing (direct cells, reference cells, array elements).

use crate::ast::{Expr, Identifier};
use crate::codegen::arith::{gen_div, gen_mod, gen_mul};
use crate::codegen::state::CodeGen;
use crate::memory::ArraySymbol;

impl<'m> CodeGen<'m> {
    /// Lower an expression, leaving its value in register `a`.
    pub fn gen_expression(&mut self, expr: &Expr) {
        match expr {
            Expr::Num(n) => self.gen_constant(*n, "a"),
            Expr::Id(id) => self.load_value(id),
            Expr::Add(l, r) => self.gen_add(l, r),
            Expr::Sub(l, r) => self.gen_sub(l, r),
            Expr::Mul(l, r) => gen_mul(self, l, r),
            Expr::Div(l, r) => gen_div(self, l, r),
            Expr::Mod(l, r) => gen_mod(self, l, r),
        }
    }

    fn gen_add(&mut self, left: &Expr, right: &Expr) {
        if let (Expr::Num(a), Expr::Num(b)) = (left, right) {
            self.gen_constant(a + b, "a");
            return;
        }
        if matches!(left, Expr::Num(0)) {
            return self.gen_expression(right);
        }
        if matches!(right, Expr::Num(0)) {
            return self.gen_expression(left);
        }
        self.gen_expression(left);
        self.emit("SWP h");
        self.gen_expression(right);
        self.emit("ADD h");
    }

    fn gen_sub(&mut self, left: &Expr, right: &Expr) {
        if let (Expr::Num(a), Expr::Num(b)) = (left, right) {
            self.gen_constant((a - b).max(0), "a");
            return;
        }
        if matches!(right, Expr::Num(0)) {
            return self.gen_expression(left);
        }
        // max(left - right, 0), saturating.
        self.gen_expression(left);
        self.emit("SWP h");
        self.gen_expression(right);
        self.emit("SWP h");
        self.emit("SUB h");
    }

    /// Load an identifier's value into register `a`.
    pub fn load_value(&mut self, id: &Identifier) {
        match id {
            Identifier::Scalar { name, line } => {
                let symbol = self.memory.resolve(name, *line).expect("resolved by analyzer");
                let scalar = symbol.as_scalar().expect("scalar identifier");
                let cell = scalar.cell;
                if scalar.is_reference {
                    self.emit(format!("LOAD {}", cell));
                    self.emit("SWP b");
                    self.emit("RLOAD b");
                } else {
                    self.emit(format!("LOAD {}", cell));
                }
            }
            Identifier::IndexedByConst { array, index, line } => {
                let arr = self.array_symbol(array, *line);
                self.gen_constant(*index, "a");
                self.array_address(&arr);
                self.emit("RLOAD b");
            }
            Identifier::IndexedByVar {
                array,
                index_var,
                line,
            } => {
                let arr = self.array_symbol(array, *line);
                self.load_value(&Identifier::Scalar {
                    name: index_var.clone(),
                    line: *line,
                });
                self.array_address(&arr);
                self.emit("RLOAD b");
            }
        }
    }

    /// Store register `a`'s current value into `id`.
    pub fn store_to_variable(&mut self, id: &Identifier) {
        self.emit("SWP d"); // stash value in d while we compute the address
        match id {
            Identifier::Scalar { name, line } => {
                let symbol = self.memory.resolve(name, *line).expect("resolved by analyzer");
                let scalar = symbol.as_scalar().expect("scalar identifier");
                let cell = scalar.cell;
                if scalar.is_reference {
                    self.emit(format!("LOAD {}", cell)); // a = address
                    self.emit("SWP b");
                    self.emit("SWP d"); // a = value
                    self.emit("RSTORE b");
                } else {
                    self.emit("SWP d"); // a = value
                    self.emit(format!("STORE {}", cell));
                }
            }
            Identifier::IndexedByConst { array, index, line } => {
                let arr = self.array_symbol(array, *line);
                self.emit("SWP d"); // a = value
                self.emit("SWP e"); // value safely in e
                self.gen_constant(*index, "a");
                self.array_address(&arr);
                self.emit("SWP e"); // a = value
                self.emit("RSTORE b");
            }
            Identifier::IndexedByVar {
                array,
                index_var,
                line,
            } => {
                let arr = self.array_symbol(array, *line);
                self.emit("SWP d"); // a = value
                self.emit("SWP e");
                self.load_value(&Identifier::Scalar {
                    name: index_var.clone(),
                    line: *line,
                });
                self.array_address(&arr);
                self.emit("SWP e");
                self.emit("RSTORE b");
            }
        }
    }

    fn array_symbol(&self, name: &str, line: usize) -> ArraySymbol {
        self.memory
            .resolve(name, line)
            .expect("resolved by analyzer")
            .as_array()
            .expect("array identifier")
            .clone()
    }

    /// Given an index value already sitting in register `a`, leave the
    /// element's absolute address in register `b`.
    fn array_address(&mut self, arr: &ArraySymbol) {
        if let Some(lo_cell) = arr.lo_cell {
            self.emit("SWP b");
            self.emit(format!("LOAD {}", lo_cell));
            self.emit("SWP b");
            self.emit("SUB b");
        } else if arr.lo != 0 {
            self.emit("SWP b");
            self.gen_constant(arr.lo, "a");
            self.emit("SWP b");
            self.emit("SUB b");
        }
        self.emit("SWP b");
        if arr.is_reference {
            self.emit(format!("LOAD {}", arr.base_cell));
        } else {
            self.gen_constant(arr.base_cell as i64, "a");
        }
        self.emit("ADD b");
        self.emit("SWP b");
    }
}
