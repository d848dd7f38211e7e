//! Structured control flow: IF/WHILE/REPEAT/FOR lower to labeled jumps
//! over the boolean-free condition codegen in `condition.rs`.

use crate::ast::{Command, Condition, Expr};
use crate::codegen::state::CodeGen;
use crate::memory::Symbol;

impl<'m> CodeGen<'m> {
    pub fn gen_if(
        &mut self,
        cond: &Condition,
        then_branch: &[Command],
        else_branch: &[Command],
    ) {
        let false_label = self.fresh_label("else");
        let has_else = !else_branch.is_empty();

        self.gen_condition(cond, &false_label);
        self.gen_commands(then_branch);

        if has_else {
            let end_label = self.fresh_label("endif");
            self.emit(format!("JUMP {}", end_label));
            self.place_label(false_label);
            self.gen_commands(else_branch);
            self.place_label(end_label);
        } else {
            self.place_label(false_label);
        }
    }

    pub fn gen_while(&mut self, cond: &Condition, body: &[Command]) {
        let start_label = self.fresh_label("while_start");
        let end_label = self.fresh_label("while_end");

        self.place_label(start_label.clone());
        self.gen_condition(cond, &end_label);
        self.gen_commands(body);
        self.emit(format!("JUMP {}", start_label));
        self.place_label(end_label);
    }

    pub fn gen_repeat(&mut self, body: &[Command], cond: &Condition) {
        let start_label = self.fresh_label("repeat_start");
        self.place_label(start_label.clone());
        self.gen_commands(body);
        // REPEAT runs again while cond is false; gen_condition jumps to
        // its target exactly when the condition is false, so jumping
        // back to start_label on "false" is precisely UNTIL semantics.
        self.gen_condition(cond, &start_label);
    }

    pub fn gen_for(&mut self, iterator: &str, from: &Expr, to: &Expr, body: &[Command], down: bool) {
        let iter_cell = self.memory.declare_hidden_cell();
        let limit_cell = self.memory.declare_hidden_cell();

        let shadowed = self.memory.shadow_binding(
            iterator,
            Symbol::Scalar(crate::memory::ScalarSymbol {
                name: iterator.to_string(),
                cell: iter_cell,
                is_initialized: true,
                is_const: true,
                is_iterator: true,
                is_param: false,
                is_reference: false,
            }),
        );

        self.gen_expression(from);
        self.emit(format!("STORE {}", iter_cell));
        self.gen_expression(to);
        self.emit(format!("STORE {}", limit_cell));

        let start_label = self.fresh_label("for_start");
        let end_label = self.fresh_label("for_end");

        self.place_label(start_label.clone());
        self.emit(format!("LOAD {}", iter_cell));
        self.emit("SWP b");
        self.emit(format!("LOAD {}", limit_cell));

        if down {
            // DOWNTO: stop once limit > iter.
            self.emit("SUB b");
            self.emit(format!("JPOS {}", end_label));
        } else {
            // TO: stop once iter > limit.
            self.emit("SWP b");
            self.emit("SUB b");
            self.emit(format!("JPOS {}", end_label));
        }

        self.gen_commands(body);

        self.emit(format!("LOAD {}", iter_cell));
        if down {
            // Check iter == limit before DEC: limit may be 0, and DEC on
            // an iterator already at its floor would loop forever under
            // saturating subtraction.
            self.emit("SWP b");
            self.emit(format!("LOAD {}", limit_cell));
            self.emit("SWP b");
            self.emit("SUB b");
            self.emit(format!("JZERO {}", end_label));
            self.emit(format!("LOAD {}", iter_cell));
            self.emit("DEC a");
        } else {
            self.emit("INC a");
        }
        self.emit(format!("STORE {}", iter_cell));
        self.emit(format!("JUMP {}", start_label));
        self.place_label(end_label);

        self.memory.restore_binding(iterator, shadowed);
    }
}
