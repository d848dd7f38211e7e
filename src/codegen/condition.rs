//! Condition codegen: every relational operator is built from saturating
//! subtraction. The VM has no comparison instruction, only `SUB` and the
//! zero/positive jumps.

use crate::ast::Condition;
use crate::codegen::state::CodeGen;

impl<'m> CodeGen<'m> {
    /// Emit code for `cond` that falls through when it's true and jumps
    /// to `jump_if_false` when it's false.
    pub fn gen_condition(&mut self, cond: &Condition, jump_if_false: &str) {
        let (op, left, right) = match cond {
            Condition::Eq(l, r) => ("EQ", l, r),
            Condition::Neq(l, r) => ("NEQ", l, r),
            Condition::Lt(l, r) => ("LT", l, r),
            Condition::Gt(l, r) => ("GT", l, r),
            Condition::Le(l, r) => ("LE", l, r),
            Condition::Ge(l, r) => ("GE", l, r),
        };

        self.gen_expression(left);
        self.emit("SWP c");
        self.gen_expression(right);
        self.emit("SWP d");
        // c = LHS, d = RHS

        match op {
            "EQ" => {
                self.check_diff("c", "d");
                self.emit(format!("JPOS {}", jump_if_false));
                self.check_diff("d", "c");
                self.emit(format!("JPOS {}", jump_if_false));
            }
            "NEQ" => {
                let true_label = self.fresh_label("cond_true");
                self.check_diff("c", "d");
                self.emit(format!("JPOS {}", true_label));
                self.check_diff("d", "c");
                self.emit(format!("JPOS {}", true_label));
                self.emit(format!("JUMP {}", jump_if_false));
                self.place_label(true_label);
            }
            "LT" => {
                self.check_diff("d", "c");
                self.emit(format!("JZERO {}", jump_if_false));
            }
            "GT" => {
                self.check_diff("c", "d");
                self.emit(format!("JZERO {}", jump_if_false));
            }
            "LE" => {
                self.check_diff("c", "d");
                self.emit(format!("JPOS {}", jump_if_false));
            }
            "GE" => {
                self.check_diff("d", "c");
                self.emit(format!("JPOS {}", jump_if_false));
            }
            _ => unreachable!(),
        }
    }

    /// a = max(reg_x - reg_y, 0)
    fn check_diff(&mut self, reg_x: &str, reg_y: &str) {
        self.emit("RST a");
        self.emit(format!("ADD {}", reg_x));
        self.emit(format!("SUB {}", reg_y));
    }
}
