//! End-to-end scenarios: compile an SL program, run the resulting
//! instruction listing on a small interpreter of the target register VM,
//! and check the output stream.

use std::collections::HashMap;

/// A direct interpreter of the register VM's instruction set.
/// Not part of the compiler itself (the VM is a fixed external target);
/// this exists only so these tests can check compiled output actually
/// does what it claims to, instead of just pattern-matching emitted
/// mnemonics.
struct Vm {
    regs: HashMap<char, i64>,
    mem: Vec<i64>,
    pc: usize,
    input: std::collections::VecDeque<i64>,
    output: Vec<i64>,
}

impl Vm {
    fn new(input: &[i64]) -> Self {
        let mut regs = HashMap::new();
        for r in 'a'..='h' {
            regs.insert(r, 0);
        }
        Vm {
            regs,
            mem: vec![0; 64],
            pc: 0,
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    fn reg(&mut self, name: char) -> i64 {
        *self.regs.get(&name).unwrap()
    }

    fn set_reg(&mut self, name: char, value: i64) {
        self.regs.insert(name, value);
    }

    fn cell(&mut self, addr: usize) -> i64 {
        if addr >= self.mem.len() {
            self.mem.resize(addr + 1, 0);
        }
        self.mem[addr]
    }

    fn set_cell(&mut self, addr: usize, value: i64) {
        if addr >= self.mem.len() {
            self.mem.resize(addr + 1, 0);
        }
        self.mem[addr] = value;
    }

    /// Run to HALT, bailing out after a generous step budget so a bug
    /// that produces an infinite loop fails the test instead of hanging
    /// the suite.
    fn run(&mut self, program: &[Instr]) -> Vec<i64> {
        let mut steps = 0usize;
        loop {
            steps += 1;
            assert!(steps < 1_000_000, "program did not halt within budget");
            let instr = program.get(self.pc).unwrap_or_else(|| {
                panic!("pc {} ran off the end of a {}-instruction program", self.pc, program.len())
            });
            match instr {
                Instr::Rst(r) => {
                    self.set_reg(*r, 0);
                    self.pc += 1;
                }
                Instr::Inc(r) => {
                    let v = self.reg(*r);
                    self.set_reg(*r, v + 1);
                    self.pc += 1;
                }
                Instr::Dec(r) => {
                    let v = self.reg(*r);
                    self.set_reg(*r, (v - 1).max(0));
                    self.pc += 1;
                }
                Instr::Shl(r) => {
                    let v = self.reg(*r);
                    self.set_reg(*r, v << 1);
                    self.pc += 1;
                }
                Instr::Shr(r) => {
                    let v = self.reg(*r);
                    self.set_reg(*r, v >> 1);
                    self.pc += 1;
                }
                Instr::Load(k) => {
                    let v = self.cell(*k);
                    self.set_reg('a', v);
                    self.pc += 1;
                }
                Instr::Store(k) => {
                    let v = self.reg('a');
                    self.set_cell(*k, v);
                    self.pc += 1;
                }
                Instr::Rload(r) => {
                    let addr = self.reg(*r) as usize;
                    let v = self.cell(addr);
                    self.set_reg('a', v);
                    self.pc += 1;
                }
                Instr::Rstore(r) => {
                    let addr = self.reg(*r) as usize;
                    let v = self.reg('a');
                    self.set_cell(addr, v);
                    self.pc += 1;
                }
                Instr::Add(r) => {
                    let a = self.reg('a');
                    let v = self.reg(*r);
                    self.set_reg('a', a + v);
                    self.pc += 1;
                }
                Instr::Sub(r) => {
                    let a = self.reg('a');
                    let v = self.reg(*r);
                    self.set_reg('a', (a - v).max(0));
                    self.pc += 1;
                }
                Instr::Swp(r) => {
                    let a = self.reg('a');
                    let v = self.reg(*r);
                    self.set_reg('a', v);
                    self.set_reg(*r, a);
                    self.pc += 1;
                }
                Instr::Jump(k) => self.pc = *k,
                Instr::Jzero(k) => {
                    self.pc = if self.reg('a') == 0 { *k } else { self.pc + 1 };
                }
                Instr::Jpos(k) => {
                    self.pc = if self.reg('a') > 0 { *k } else { self.pc + 1 };
                }
                Instr::Read => {
                    let v = self.input.pop_front().expect("program read past end of input");
                    self.set_reg('a', v);
                    self.pc += 1;
                }
                Instr::Write => {
                    let v = self.reg('a');
                    self.output.push(v);
                    self.pc += 1;
                }
                Instr::Call(k) => {
                    self.set_reg('a', (self.pc + 1) as i64);
                    self.pc = *k;
                }
                Instr::Rtrn => {
                    self.pc = self.reg('a') as usize;
                }
                Instr::Halt => return std::mem::take(&mut self.output),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Instr {
    Rst(char),
    Inc(char),
    Dec(char),
    Shl(char),
    Shr(char),
    Load(usize),
    Store(usize),
    Rload(char),
    Rstore(char),
    Add(char),
    Sub(char),
    Swp(char),
    Jump(usize),
    Jzero(usize),
    Jpos(usize),
    Read,
    Write,
    Call(usize),
    Rtrn,
    Halt,
}

fn parse_program(text: &str) -> Vec<Instr> {
    text.lines().filter(|l| !l.is_empty()).map(parse_instr).collect()
}

fn parse_instr(line: &str) -> Instr {
    let mut parts = line.split_whitespace();
    let op = parts.next().expect("blank instruction line");
    let arg = parts.next();
    let reg = || arg.unwrap().chars().next().unwrap();
    let idx = || arg.unwrap().parse::<usize>().unwrap();
    match op {
        "RST" => Instr::Rst(reg()),
        "INC" => Instr::Inc(reg()),
        "DEC" => Instr::Dec(reg()),
        "SHL" => Instr::Shl(reg()),
        "SHR" => Instr::Shr(reg()),
        "LOAD" => Instr::Load(idx()),
        "STORE" => Instr::Store(idx()),
        "RLOAD" => Instr::Rload(reg()),
        "RSTORE" => Instr::Rstore(reg()),
        "ADD" => Instr::Add(reg()),
        "SUB" => Instr::Sub(reg()),
        "SWP" => Instr::Swp(reg()),
        "JUMP" => Instr::Jump(idx()),
        "JZERO" => Instr::Jzero(idx()),
        "JPOS" => Instr::Jpos(idx()),
        "READ" => Instr::Read,
        "WRITE" => Instr::Write,
        "CALL" => Instr::Call(idx()),
        "RTRN" => Instr::Rtrn,
        "HALT" => Instr::Halt,
        other => panic!("unknown instruction {other}"),
    }
}

fn run_program(src: &str, input: &[i64]) -> Vec<i64> {
    let text = slc::compile(src).expect("program should compile");
    let program = parse_program(&text);
    Vm::new(input).run(&program)
}

#[test]
fn scenario_1_mod_div_add_sub() {
    let src = "PROGRAM IS a, b IN \
        READ a; READ b; \
        WRITE a % b; WRITE a / b; WRITE a + b; WRITE a - b; \
        END";
    assert_eq!(run_program(src, &[12, 8]), vec![4, 1, 20, 4]);
}

#[test]
fn scenario_2_division_by_zero_yields_zero() {
    let src = "PROGRAM IS a, b IN \
        READ a; READ b; \
        WRITE a % b; WRITE a / b; WRITE a + b; WRITE a - b; \
        END";
    assert_eq!(run_program(src, &[10, 0]), vec![0, 0, 10, 10]);
}

#[test]
fn scenario_3_gcd_via_repeated_mod() {
    let src = "PROGRAM IS m, n, r IN \
        READ m; READ n; \
        WHILE n != 0 DO \
            r := m % n; \
            m := n; \
            n := r; \
        ENDWHILE \
        WRITE m; \
        END";
    assert_eq!(run_program(src, &[21, 14]), vec![7]);
}

#[test]
fn scenario_4_factorial_then_fibonacci() {
    let src = "PROGRAM IS n, fact, i, a, b, temp IN \
        READ n; \
        fact := 1; \
        FOR i FROM 1 TO n DO fact := fact * i; ENDFOR \
        WRITE fact; \
        a := 0; b := 1; \
        FOR i FROM 1 TO n DO temp := a + b; a := b; b := temp; ENDFOR \
        WRITE a; \
        END";
    assert_eq!(run_program(src, &[5]), vec![120, 5]);
}

#[test]
fn scenario_5_power_mod() {
    let src = "PROGRAM IS base, exp, m, result, i IN \
        READ base; READ exp; READ m; \
        result := 1; \
        FOR i FROM 1 TO exp DO result := result * base; ENDFOR \
        result := result % m; \
        WRITE result; \
        END";
    assert_eq!(run_program(src, &[2, 10, 7]), vec![2]);
}

#[test]
fn scenario_6_for_loop_accumulation() {
    let src = "PROGRAM IS n, sum, i, limit IN \
        READ n; \
        sum := 0; \
        limit := n - 1; \
        FOR i FROM 0 TO limit DO sum := sum + i; ENDFOR \
        WRITE sum; \
        END";
    assert_eq!(run_program(src, &[10]), vec![45]);
}

#[test]
fn downto_loop_counts_down_inclusive() {
    let src = "PROGRAM IS n, sum, i IN \
        READ n; \
        sum := 0; \
        FOR i FROM n DOWNTO 1 DO sum := sum + i; ENDFOR \
        WRITE sum; \
        END";
    assert_eq!(run_program(src, &[5]), vec![15]);
}

#[test]
fn array_read_write_roundtrip() {
    let src = "PROGRAM IS t[1:5], i, total IN \
        FOR i FROM 1 TO 5 DO t[i] := i * 2; ENDFOR \
        total := 0; \
        FOR i FROM 1 TO 5 DO total := total + t[i]; ENDFOR \
        WRITE total; \
        END";
    assert_eq!(run_program(src, &[]), vec![30]);
}

#[test]
fn procedure_call_with_reference_and_value_parameters() {
    let src = "PROCEDURE addone(I x, y) IS IN y := x + 1; END \
        PROGRAM IS a, b IN \
        a := 41; \
        addone(a, b); \
        WRITE b; \
        END";
    assert_eq!(run_program(src, &[]), vec![42]);
}

#[test]
fn procedure_call_with_array_reference() {
    let src = "PROCEDURE zero_out(T arr, n) IS i IN \
        FOR i FROM 1 TO n DO arr[i] := 0; ENDFOR \
        END \
        PROGRAM IS t[1:3], sum, i, three IN \
        t[1] := 7; t[2] := 8; t[3] := 9; \
        three := 3; \
        zero_out(t, three); \
        sum := 0; \
        FOR i FROM 1 TO 3 DO sum := sum + t[i]; ENDFOR \
        WRITE sum; \
        END";
    assert_eq!(run_program(src, &[]), vec![0]);
}

#[test]
fn peephole_optimization_is_semantics_preserving() {
    use slc::config::CompilerConfig;

    let src = "PROGRAM IS a, b IN \
        READ a; READ b; \
        WRITE a % b; WRITE a / b; WRITE a + b; WRITE a - b; \
        END";

    let optimized = slc::compile(src).unwrap();
    let unoptimized =
        slc::compile_with_config(src, &CompilerConfig::new().with_optimize(false)).unwrap();

    let optimized_program = parse_program(&optimized);
    let unoptimized_program = parse_program(&unoptimized);

    let out_opt = Vm::new(&[12, 8]).run(&optimized_program);
    let out_unopt = Vm::new(&[12, 8]).run(&unoptimized_program);
    assert_eq!(out_opt, out_unopt);
    assert_eq!(out_opt, vec![4, 1, 20, 4]);
}

#[test]
fn compilation_is_deterministic() {
    let src = "PROGRAM IS a IN a := 7; WRITE a; END";
    assert_eq!(slc::compile(src).unwrap(), slc::compile(src).unwrap());
}

#[test]
fn every_jump_target_is_a_valid_instruction_index() {
    let src = "PROGRAM IS n, sum, i, limit IN \
        READ n; sum := 0; \
        limit := n - 1; \
        FOR i FROM 0 TO limit DO sum := sum + i; ENDFOR \
        WRITE sum; \
        END";
    let text = slc::compile(src).unwrap();
    let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    for line in &lines {
        let mut parts = line.split_whitespace();
        let op = parts.next().unwrap();
        if matches!(op, "JUMP" | "JZERO" | "JPOS" | "CALL") {
            let target: usize = parts.next().unwrap().parse().unwrap();
            assert!(target < lines.len(), "{line} targets out of range index");
        }
    }
}
