//! Abstract syntax tree for SL programs.
//!
//! This is the typed tree the parser builds and every later pass
//! (memory/symbol allocation, semantic analysis, code generation) walks.
//! Every node carries the source line it came from so diagnostics can
//! point back at the program text.

/// A program is zero or more procedures followed by a single main block.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub procedures: Vec<ProcedureDef>,
    pub main: Main,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDef {
    pub name: String,
    pub formals: Vec<Formal>,
    pub declarations: Vec<Declaration>,
    pub commands: Vec<Command>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Main {
    pub declarations: Vec<Declaration>,
    pub commands: Vec<Command>,
}

/// A formal parameter of a procedure. `Scalar` is the default (no marker):
/// passed by reference, read-write. `Input` (`I`) is by value, read-only.
/// `Output` (`O`) is by reference. `Array` (`T`) is an array passed by
/// reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Formal {
    Scalar { name: String },
    Array { name: String },
    Input { name: String },
    Output { name: String },
}

impl Formal {
    pub fn name(&self) -> &str {
        match self {
            Formal::Scalar { name }
            | Formal::Array { name }
            | Formal::Input { name }
            | Formal::Output { name } => name,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Formal::Array { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Var {
        name: String,
        line: usize,
    },
    Array {
        name: String,
        lo: i64,
        hi: i64,
        line: usize,
    },
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Var { name, .. } | Declaration::Array { name, .. } => name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Declaration::Var { line, .. } | Declaration::Array { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Assign {
        target: Identifier,
        value: Expr,
        line: usize,
    },
    If {
        cond: Condition,
        then_branch: Vec<Command>,
        else_branch: Vec<Command>,
        line: usize,
    },
    While {
        cond: Condition,
        body: Vec<Command>,
        line: usize,
    },
    Repeat {
        body: Vec<Command>,
        cond: Condition,
        line: usize,
    },
    ForTo {
        iterator: String,
        from: Expr,
        to: Expr,
        body: Vec<Command>,
        line: usize,
    },
    ForDownTo {
        iterator: String,
        from: Expr,
        to: Expr,
        body: Vec<Command>,
        line: usize,
    },
    Read {
        target: Identifier,
        line: usize,
    },
    Write {
        value: Expr,
        line: usize,
    },
    Call {
        name: String,
        actuals: Vec<String>,
        line: usize,
    },
}

impl Command {
    pub fn line(&self) -> usize {
        match self {
            Command::Assign { line, .. }
            | Command::If { line, .. }
            | Command::While { line, .. }
            | Command::Repeat { line, .. }
            | Command::ForTo { line, .. }
            | Command::ForDownTo { line, .. }
            | Command::Read { line, .. }
            | Command::Write { line, .. }
            | Command::Call { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(i64),
    Id(Identifier),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Expr, Expr),
    Neq(Expr, Expr),
    Lt(Expr, Expr),
    Gt(Expr, Expr),
    Le(Expr, Expr),
    Ge(Expr, Expr),
}

/// An identifier reference: a bare scalar, an array indexed by a variable,
/// or an array indexed by a compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    Scalar { name: String, line: usize },
    IndexedByVar {
        array: String,
        index_var: String,
        line: usize,
    },
    IndexedByConst {
        array: String,
        index: i64,
        line: usize,
    },
}

impl Identifier {
    pub fn line(&self) -> usize {
        match self {
            Identifier::Scalar { line, .. }
            | Identifier::IndexedByVar { line, .. }
            | Identifier::IndexedByConst { line, .. } => *line,
        }
    }

    pub fn base_name(&self) -> &str {
        match self {
            Identifier::Scalar { name, .. } => name,
            Identifier::IndexedByVar { array, .. } | Identifier::IndexedByConst { array, .. } => {
                array
            }
        }
    }
}
