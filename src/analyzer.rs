//! Semantic analyzer.
//!
//! Walks the AST once, building the full symbol table (via
//! [`MemoryManager`]) and checking every rule a well-formed program must
//! satisfy: names are declared before use, scalars are read only after
//! being written, procedures are only ever called on procedures defined
//! earlier in the source (which also rejects recursion, direct or
//! otherwise), and call actuals match their formals in arity, kind, and
//! direction.
//!
//! Definite-assignment tracking here is flow-insensitive: a scalar is
//! considered initialized as soon as any assignment to it is seen,
//! regardless of which branch it's in. A stricter, branch-sensitive
//! analysis would reject a few more programs (e.g. one that only
//! initializes a variable in the `THEN` arm and reads it after the `IF`),
//! but this is the tradeoff the reference implementation makes, and
//! tightening it is not this pass's job to invent.

use crate::ast::{Command, Condition, Declaration, Expr, Formal, Identifier, Main, ProcedureDef, Program};
use crate::errors::{CompileError, SourceLocation};
use crate::memory::{FormalKind, MemoryManager, ParamCells, Symbol};

pub struct Analysis {
    pub memory: MemoryManager,
}

pub fn analyze(program: &Program) -> Result<Analysis, CompileError> {
    let mut memory = MemoryManager::new();

    for proc in &program.procedures {
        if memory.procedures.contains_key(&proc.name) {
            return Err(CompileError::semantic(
                format!("procedure '{}' already defined", proc.name),
                Some(SourceLocation::new(proc.line)),
            ));
        }
        let symbol = analyze_procedure(proc, &mut memory)?;
        memory.procedures.insert(proc.name.clone(), symbol);
    }

    analyze_main(&program.main, &mut memory)?;

    Ok(Analysis { memory })
}

fn analyze_procedure(
    proc: &ProcedureDef,
    memory: &mut MemoryManager,
) -> Result<crate::memory::ProcedureSymbol, CompileError> {
    memory.enter_scope(&proc.name);

    let mut formal_kinds = Vec::with_capacity(proc.formals.len());
    let mut param_cells = Vec::with_capacity(proc.formals.len());

    for formal in &proc.formals {
        let (kind, cells) = match formal {
            Formal::Input { name } => {
                let cell = memory.declare_scalar_param(name, false, true, proc.line)?;
                (FormalKind::Input, ParamCells::Scalar(cell))
            }
            Formal::Scalar { name } => {
                let cell = memory.declare_scalar_param(name, true, false, proc.line)?;
                (FormalKind::Scalar, ParamCells::Scalar(cell))
            }
            Formal::Output { name } => {
                let cell = memory.declare_scalar_param(name, true, false, proc.line)?;
                (FormalKind::Output, ParamCells::Scalar(cell))
            }
            Formal::Array { name } => {
                let (base, lo) = memory.declare_array_param(name, proc.line)?;
                (FormalKind::Array, ParamCells::Array { base, lo })
            }
        };
        formal_kinds.push(kind);
        param_cells.push(cells);
    }

    let return_cell = memory.declare_hidden_cell();

    declare_locals(&proc.declarations, memory)?;
    analyze_commands(&proc.commands, memory)?;

    memory.exit_scope();

    Ok(crate::memory::ProcedureSymbol {
        name: proc.name.clone(),
        formal_kinds,
        param_cells,
        return_cell,
    })
}

fn analyze_main(main: &Main, memory: &mut MemoryManager) -> Result<(), CompileError> {
    memory.enter_scope("main");
    declare_locals(&main.declarations, memory)?;
    analyze_commands(&main.commands, memory)?;
    memory.exit_scope();
    Ok(())
}

fn declare_locals(decls: &[Declaration], memory: &mut MemoryManager) -> Result<(), CompileError> {
    for decl in decls {
        match decl {
            Declaration::Var { name, line } => {
                memory.declare_scalar(name, *line)?;
            }
            Declaration::Array { name, lo, hi, line } => {
                memory.declare_array(name, *lo, *hi, *line)?;
            }
        }
    }
    Ok(())
}

fn analyze_commands(commands: &[Command], memory: &mut MemoryManager) -> Result<(), CompileError> {
    for command in commands {
        analyze_command(command, memory)?;
    }
    Ok(())
}

fn analyze_command(command: &Command, memory: &mut MemoryManager) -> Result<(), CompileError> {
    match command {
        Command::Assign { target, value, line } => {
            analyze_expr(value, memory)?;
            assign_to(target, memory, *line)?;
        }
        Command::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            analyze_condition(cond, memory)?;
            analyze_commands(then_branch, memory)?;
            analyze_commands(else_branch, memory)?;
        }
        Command::While { cond, body, .. } => {
            analyze_condition(cond, memory)?;
            analyze_commands(body, memory)?;
        }
        Command::Repeat { body, cond, .. } => {
            analyze_commands(body, memory)?;
            analyze_condition(cond, memory)?;
        }
        Command::ForTo {
            iterator,
            from,
            to,
            body,
            line: _,
        }
        | Command::ForDownTo {
            iterator,
            from,
            to,
            body,
            line: _,
        } => {
            analyze_expr(from, memory)?;
            analyze_expr(to, memory)?;
            let shadowed = memory.shadow_binding(
                iterator,
                Symbol::Scalar(crate::memory::ScalarSymbol {
                    name: iterator.clone(),
                    cell: 0, // placeholder: the iterator has no addressable cell of its own
                    is_initialized: true,
                    is_const: true,
                    is_iterator: true,
                    is_param: false,
                    is_reference: false,
                }),
            );
            let result = analyze_commands(body, memory);
            memory.restore_binding(iterator, shadowed);
            result?;
        }
        Command::Read { target, line } => {
            assign_to(target, memory, *line)?;
        }
        Command::Write { value, .. } => {
            analyze_expr(value, memory)?;
        }
        Command::Call { name, actuals, line } => {
            analyze_call(name, actuals, memory, *line)?;
        }
    }
    Ok(())
}

fn analyze_call(
    name: &str,
    actuals: &[String],
    memory: &mut MemoryManager,
    line: usize,
) -> Result<(), CompileError> {
    let proc = memory
        .procedures
        .get(name)
        .ok_or_else(|| {
            CompileError::semantic(
                format!("call to undeclared procedure '{}'", name),
                Some(SourceLocation::new(line)),
            )
        })?
        .clone();

    if actuals.len() != proc.formal_kinds.len() {
        return Err(CompileError::semantic(
            format!(
                "procedure '{}' expects {} argument(s), got {}",
                name,
                proc.formal_kinds.len(),
                actuals.len()
            ),
            Some(SourceLocation::new(line)),
        ));
    }

    for (actual, kind) in actuals.iter().zip(proc.formal_kinds.iter()) {
        match kind {
            FormalKind::Input => {
                let symbol = memory.resolve(actual, line)?;
                let scalar = symbol.as_scalar().ok_or_else(|| {
                    CompileError::semantic(
                        format!("'{}' is an array, expected a scalar argument", actual),
                        Some(SourceLocation::new(line)),
                    )
                })?;
                if !scalar.is_initialized {
                    return Err(CompileError::semantic(
                        format!("use of possibly uninitialized variable '{}'", actual),
                        Some(SourceLocation::new(line)),
                    ));
                }
            }
            FormalKind::Scalar | FormalKind::Output => {
                let symbol = memory.resolve_mut(actual, line)?;
                let scalar = match symbol {
                    Symbol::Scalar(s) => s,
                    Symbol::Array(_) => {
                        return Err(CompileError::semantic(
                            format!("'{}' is an array, expected a scalar argument", actual),
                            Some(SourceLocation::new(line)),
                        ));
                    }
                };
                if scalar.is_const {
                    return Err(CompileError::semantic(
                        format!(
                            "'{}' cannot be passed by reference: it is read-only",
                            actual
                        ),
                        Some(SourceLocation::new(line)),
                    ));
                }
                scalar.is_initialized = true;
            }
            FormalKind::Array => {
                let symbol = memory.resolve(actual, line)?;
                if !symbol.is_array() {
                    return Err(CompileError::semantic(
                        format!("'{}' is a scalar, expected an array argument", actual),
                        Some(SourceLocation::new(line)),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn assign_to(target: &Identifier, memory: &mut MemoryManager, line: usize) -> Result<(), CompileError> {
    match target {
        Identifier::Scalar { name, .. } => {
            let symbol = memory.resolve_mut(name, line)?;
            match symbol {
                Symbol::Scalar(s) => {
                    if s.is_const {
                        return Err(CompileError::semantic(
                            format!("cannot assign to '{}': it is read-only", name),
                            Some(SourceLocation::new(line)),
                        ));
                    }
                    s.is_initialized = true;
                }
                Symbol::Array(_) => {
                    return Err(CompileError::semantic(
                        format!("'{}' is an array; index it to assign an element", name),
                        Some(SourceLocation::new(line)),
                    ));
                }
            }
        }
        Identifier::IndexedByConst { array, .. } => {
            let symbol = memory.resolve(array, line)?;
            if !symbol.is_array() {
                return Err(CompileError::semantic(
                    format!("'{}' is a scalar; it cannot be indexed", array),
                    Some(SourceLocation::new(line)),
                ));
            }
        }
        Identifier::IndexedByVar {
            array, index_var, ..
        } => {
            let array_symbol = memory.resolve(array, line)?;
            if !array_symbol.is_array() {
                return Err(CompileError::semantic(
                    format!("'{}' is a scalar; it cannot be indexed", array),
                    Some(SourceLocation::new(line)),
                ));
            }
            check_scalar_read(index_var, memory, line)?;
        }
    }
    Ok(())
}

fn analyze_expr(expr: &Expr, memory: &MemoryManager) -> Result<(), CompileError> {
    match expr {
        Expr::Num(_) => Ok(()),
        Expr::Id(id) => check_identifier_read(id, memory),
        Expr::Add(a, b)
        | Expr::Sub(a, b)
        | Expr::Mul(a, b)
        | Expr::Div(a, b)
        | Expr::Mod(a, b) => {
            analyze_expr(a, memory)?;
            analyze_expr(b, memory)
        }
    }
}

fn analyze_condition(cond: &Condition, memory: &MemoryManager) -> Result<(), CompileError> {
    let (a, b) = match cond {
        Condition::Eq(a, b)
        | Condition::Neq(a, b)
        | Condition::Lt(a, b)
        | Condition::Gt(a, b)
        | Condition::Le(a, b)
        | Condition::Ge(a, b) => (a, b),
    };
    analyze_expr(a, memory)?;
    analyze_expr(b, memory)
}

fn check_identifier_read(id: &Identifier, memory: &MemoryManager) -> Result<(), CompileError> {
    match id {
        Identifier::Scalar { name, line } => check_scalar_read(name, memory, *line),
        Identifier::IndexedByConst { array, line, .. } => {
            let symbol = memory.resolve(array, *line)?;
            if !symbol.is_array() {
                return Err(CompileError::semantic(
                    format!("'{}' is a scalar; it cannot be indexed", array),
                    Some(SourceLocation::new(*line)),
                ));
            }
            Ok(())
        }
        Identifier::IndexedByVar {
            array,
            index_var,
            line,
        } => {
            let symbol = memory.resolve(array, *line)?;
            if !symbol.is_array() {
                return Err(CompileError::semantic(
                    format!("'{}' is a scalar; it cannot be indexed", array),
                    Some(SourceLocation::new(*line)),
                ));
            }
            check_scalar_read(index_var, memory, *line)
        }
    }
}

fn check_scalar_read(name: &str, memory: &MemoryManager, line: usize) -> Result<(), CompileError> {
    let symbol = memory.resolve(name, line)?;
    let scalar = symbol.as_scalar().ok_or_else(|| {
        CompileError::semantic(
            format!("'{}' is an array; index it to use a single value", name),
            Some(SourceLocation::new(line)),
        )
    })?;
    if !scalar.is_initialized {
        return Err(CompileError::semantic(
            format!("use of possibly uninitialized variable '{}'", name),
            Some(SourceLocation::new(line)),
        ));
    }
    Ok(())
}
