//! Top-level code generation: program skeleton, procedure entry/exit,
//! and command dispatch.

use crate::ast::{Command, Program};
use crate::codegen::state::{CodeGen, RawLine};
use crate::memory::MemoryManager;

/// Walk the fully analyzed program and emit labeled, unresolved VM code.
/// `memory` must be the [`MemoryManager`] produced by
/// [`crate::analyzer::analyze`] for this same program.
pub fn generate(program: &Program, memory: &mut MemoryManager) -> Vec<RawLine> {
    let mut cg = CodeGen::new(memory);

    cg.emit("JUMP main_start");

    for proc in &program.procedures {
        cg.gen_procedure(proc);
    }

    cg.place_label("main_start");
    cg.gen_main(&program.main);
    cg.emit("HALT");

    cg.code
}

impl<'m> CodeGen<'m> {
    fn gen_procedure(&mut self, proc: &crate::ast::ProcedureDef) {
        self.place_label(proc.name.clone());

        self.memory.enter_finished_scope(&proc.name);
        let return_cell = self
            .memory
            .procedures
            .get(&proc.name)
            .expect("declared by analyzer")
            .return_cell;

        self.emit(format!("STORE {}", return_cell));
        self.gen_commands(&proc.commands);
        self.emit(format!("LOAD {}", return_cell));
        self.emit("RTRN");

        self.memory.exit_scope();
    }

    fn gen_main(&mut self, main: &crate::ast::Main) {
        self.memory.enter_finished_scope("main");
        self.gen_commands(&main.commands);
        self.memory.exit_scope();
    }

    pub(crate) fn gen_commands(&mut self, commands: &[Command]) {
        for command in commands {
            self.gen_command(command);
        }
    }

    fn gen_command(&mut self, command: &Command) {
        match command {
            Command::Assign { target, value, .. } => {
                self.gen_expression(value);
                self.store_to_variable(target);
            }
            Command::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => self.gen_if(cond, then_branch, else_branch),
            Command::While { cond, body, .. } => self.gen_while(cond, body),
            Command::Repeat { body, cond, .. } => self.gen_repeat(body, cond),
            Command::ForTo {
                iterator,
                from,
                to,
                body,
                ..
            } => self.gen_for(iterator, from, to, body, false),
            Command::ForDownTo {
                iterator,
                from,
                to,
                body,
                ..
            } => self.gen_for(iterator, from, to, body, true),
            Command::Read { target, .. } => {
                self.emit("READ");
                self.store_to_variable(target);
            }
            Command::Write { value, .. } => {
                self.gen_expression(value);
                self.emit("WRITE");
            }
            Command::Call { name, actuals, line } => self.gen_call(name, actuals, *line),
        }
    }
}
