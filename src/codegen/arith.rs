//! Multiplication, division, and modulo: strength reduction for the
//! constant/power-of-two cases, and Russian-peasant multiplication /
//! shift-and-subtract division for the general case.

use crate::ast::Expr;
use crate::codegen::state::CodeGen;

pub fn gen_mul(cg: &mut CodeGen, left: &Expr, right: &Expr) {
    if let (Expr::Num(a), Expr::Num(b)) = (left, right) {
        cg.gen_constant(a * b, "a");
        return;
    }
    if matches!(left, Expr::Num(0)) || matches!(right, Expr::Num(0)) {
        cg.gen_constant(0, "a");
        return;
    }
    if matches!(left, Expr::Num(1)) {
        return cg.gen_expression(right);
    }
    if matches!(right, Expr::Num(1)) {
        return cg.gen_expression(left);
    }
    if let Expr::Num(n) = right
        && CodeGen::is_power_of_two(*n)
    {
        cg.gen_expression(left);
        for _ in 0..CodeGen::power_of_two_shift(*n) {
            cg.emit("SHL a");
        }
        return;
    }
    if let Expr::Num(n) = left
        && CodeGen::is_power_of_two(*n)
    {
        cg.gen_expression(right);
        for _ in 0..CodeGen::power_of_two_shift(*n) {
            cg.emit("SHL a");
        }
        return;
    }
    russian_peasant_multiply(cg, left, right);
}

/// O(log n) multiply: double the multiplicand and halve the multiplier,
/// accumulating whenever the multiplier is odd.
fn russian_peasant_multiply(cg: &mut CodeGen, left: &Expr, right: &Expr) {
    cg.gen_expression(left);
    cg.emit("SWP c"); // c = multiplier
    cg.gen_expression(right);
    cg.emit("SWP d"); // d = multiplicand
    cg.emit("RST e"); // e = accumulator

    let start = cg.fresh_label("mul_start");
    let end = cg.fresh_label("mul_end");
    let skip = cg.fresh_label("mul_skip");

    cg.place_label(start.clone());
    cg.emit("RST a");
    cg.emit("ADD c");
    cg.emit(format!("JZERO {}", end));

    // odd(c) <=> c != (c >> 1) << 1
    cg.emit("RST a");
    cg.emit("ADD c");
    cg.emit("SHR a");
    cg.emit("SHL a");
    cg.emit("SWP b");
    cg.emit("RST a");
    cg.emit("ADD c");
    cg.emit("SUB b");
    cg.emit(format!("JZERO {}", skip));

    cg.emit("RST a");
    cg.emit("ADD e");
    cg.emit("ADD d");
    cg.emit("SWP e");

    cg.place_label(skip);

    cg.emit("RST a");
    cg.emit("ADD d");
    cg.emit("SHL a");
    cg.emit("SWP d");

    cg.emit("RST a");
    cg.emit("ADD c");
    cg.emit("SHR a");
    cg.emit("SWP c");
    cg.emit(format!("JUMP {}", start));

    cg.place_label(end);
    cg.emit("RST a");
    cg.emit("ADD e");
}

pub fn gen_div(cg: &mut CodeGen, left: &Expr, right: &Expr) {
    if let (Expr::Num(a), Expr::Num(b)) = (left, right) {
        cg.gen_constant(if *b == 0 { 0 } else { a / b }, "a");
        return;
    }
    if matches!(right, Expr::Num(1)) {
        return cg.gen_expression(left);
    }
    if let Expr::Num(n) = right
        && CodeGen::is_power_of_two(*n)
    {
        cg.gen_expression(left);
        for _ in 0..CodeGen::power_of_two_shift(*n) {
            cg.emit("SHR a");
        }
        return;
    }
    gen_divmod(cg, left, right, true);
}

pub fn gen_mod(cg: &mut CodeGen, left: &Expr, right: &Expr) {
    if let (Expr::Num(a), Expr::Num(b)) = (left, right) {
        cg.gen_constant(if *b == 0 { 0 } else { a.rem_euclid(*b) }, "a");
        return;
    }
    if matches!(right, Expr::Num(1)) {
        cg.gen_constant(0, "a");
        return;
    }
    if let Expr::Num(n) = right
        && CodeGen::is_power_of_two(*n)
    {
        let shift = CodeGen::power_of_two_shift(*n);
        cg.gen_expression(left);
        cg.emit("SWP b");
        cg.emit("RST a");
        cg.emit("ADD b");
        for _ in 0..shift {
            cg.emit("SHR a");
        }
        for _ in 0..shift {
            cg.emit("SHL a");
        }
        cg.emit("SWP c");
        cg.emit("RST a");
        cg.emit("ADD b");
        cg.emit("SUB c");
        return;
    }
    gen_divmod(cg, left, right, false);
}

/// Shift-and-subtract division, O(log^2 n): find the largest `divisor *
/// 2^k` not exceeding the remaining dividend, subtract it, accumulate
/// `2^k` into the quotient, repeat. Division and modulo by zero are not
/// errors; they produce 0/0.
fn gen_divmod(cg: &mut CodeGen, left: &Expr, right: &Expr, quotient: bool) {
    cg.gen_expression(left);
    cg.emit("SWP c"); // c = dividend (remainder accumulator)
    cg.gen_expression(right);
    cg.emit("SWP d"); // d = divisor

    let final_label = cg.fresh_label("dm_end");
    let div_zero_label = cg.fresh_label("dm_div_zero");
    let loop_label = cg.fresh_label("dm_loop");
    let grow_label = cg.fresh_label("dm_grow");
    let sub_label = cg.fresh_label("dm_sub");

    cg.emit("RST a");
    cg.emit("ADD d");
    cg.emit(format!("JZERO {}", div_zero_label));

    cg.emit("RST e"); // e = quotient accumulator

    cg.place_label(loop_label.clone());
    cg.emit("RST a");
    cg.emit("ADD c");
    cg.emit("SUB d");
    cg.emit("SWP f");
    cg.emit("RST a");
    cg.emit("ADD d");
    cg.emit("SUB c");
    cg.emit(format!("JPOS {}", final_label));

    cg.emit("RST a");
    cg.emit("ADD d");
    cg.emit("SWP f"); // f = current divisor * 2^k
    cg.emit("RST g");
    cg.emit("INC g"); // g = 2^k

    cg.place_label(grow_label.clone());
    cg.emit("RST a");
    cg.emit("ADD f");
    cg.emit("SHL a");
    cg.emit("SWP b"); // b = f * 2

    cg.emit("RST a");
    cg.emit("ADD b");
    cg.emit("SUB c");
    cg.emit(format!("JPOS {}", sub_label));

    cg.emit("RST a");
    cg.emit("ADD b");
    cg.emit("SWP f");

    cg.emit("RST a");
    cg.emit("ADD g");
    cg.emit("SHL a");
    cg.emit("SWP g");
    cg.emit(format!("JUMP {}", grow_label));

    cg.place_label(sub_label);
    cg.emit("RST a");
    cg.emit("ADD c");
    cg.emit("SUB f");
    cg.emit("SWP c");

    cg.emit("RST a");
    cg.emit("ADD e");
    cg.emit("ADD g");
    cg.emit("SWP e");

    cg.emit(format!("JUMP {}", loop_label));

    cg.place_label(div_zero_label);
    cg.emit("RST e");
    cg.emit("RST c");
    cg.emit(format!("JUMP {}", final_label));

    cg.place_label(final_label);
    cg.emit("RST a");
    cg.emit(format!("ADD {}", if quotient { "e" } else { "c" }));
}
