//! Peephole optimizer.
//!
//! Six local rewrite rules, applied left to right in one pass and then
//! iterated to a fixpoint (or [`crate::config::CompilerConfig::max_iterations`],
//! whichever comes first):
//!
//! 1. `RST r; ADD r` -> `RST r` (adding a register to itself right after
//!    zeroing it is a no-op on `a`).
//! 2. `SWP r; SWP r` -> nothing (self-cancelling).
//! 3. `RST a; ADD r; SWP r` -> `RST a; ADD r` (the trailing swap just
//!    puts the same value back where it already was logically headed).
//! 4. `LOAD k; STORE k` -> nothing, when the instruction right after
//!    writes `a` without reading it first (so the round-tripped value
//!    was never going to be observed).
//! 5. `SHL r; SHR r` -> nothing (self-cancelling).
//! 6. `JUMP` to the very next instruction -> nothing.
//!
//! A rewrite can shift every later instruction's index, so jump/call
//! targets (already absolute numbers by this point) are remapped after
//! each pass using [`build_old_to_new_map`], which also resolves
//! references to instructions that the pass itself deleted.

#[derive(Debug, Clone, PartialEq)]
struct Instruction {
    op: String,
    arg: Option<String>,
    source_index: Option<usize>,
}

impl Instruction {
    fn to_text(&self) -> String {
        match &self.arg {
            Some(arg) => format!("{} {}", self.op, arg),
            None => self.op.clone(),
        }
    }
}

const JUMP_OPS: [&str; 4] = ["JUMP", "JZERO", "JPOS", "CALL"];
const READS_A: [&str; 7] = ["WRITE", "STORE", "RSTORE", "ADD", "SUB", "SWP", "RTRN"];
// JPOS/JZERO also read `a`, but they're excluded from the `WRITES_A` set
// below, so folding them into this table as well would make no
// observable difference to rule 4's lookahead. Spelled out anyway,
// matching the instruction set's actual read behavior.
const READS_A_EXTRA_JUMPS: [&str; 2] = ["JPOS", "JZERO"];
const WRITES_A: [&str; 7] = ["READ", "LOAD", "RLOAD", "ADD", "SUB", "SWP", "RST"];
const WRITES_A_EXTRA_CALL: [&str; 1] = ["CALL"];

fn reg_reads(instr: &Instruction) -> Vec<&str> {
    let mut reads = Vec::new();
    if READS_A.contains(&instr.op.as_str()) || READS_A_EXTRA_JUMPS.contains(&instr.op.as_str()) {
        reads.push("a");
    }
    if matches!(instr.op.as_str(), "RLOAD" | "RSTORE" | "ADD" | "SUB" | "SWP")
        && let Some(arg) = &instr.arg
    {
        reads.push(arg.as_str());
    }
    if matches!(instr.op.as_str(), "INC" | "DEC" | "SHL" | "SHR")
        && let Some(arg) = &instr.arg
    {
        reads.push(arg.as_str());
    }
    reads
}

fn reg_writes(instr: &Instruction) -> Vec<&str> {
    let mut writes = Vec::new();
    if WRITES_A.contains(&instr.op.as_str()) || WRITES_A_EXTRA_CALL.contains(&instr.op.as_str()) {
        writes.push("a");
    }
    if matches!(instr.op.as_str(), "SWP" | "RST" | "INC" | "DEC" | "SHL" | "SHR")
        && let Some(arg) = &instr.arg
    {
        writes.push(arg.as_str());
    }
    writes
}

fn parse_instructions(lines: &[String]) -> Vec<Instruction> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let mut parts = line.split_whitespace();
            let op = parts.next()?;
            let arg = parts.next().map(str::to_string);
            Some(Instruction {
                op: op.to_string(),
                arg,
                source_index: Some(idx),
            })
        })
        .collect()
}

fn normalize_sources(instructions: &[Instruction]) -> Vec<Instruction> {
    instructions
        .iter()
        .enumerate()
        .map(|(idx, instr)| Instruction {
            op: instr.op.clone(),
            arg: instr.arg.clone(),
            source_index: Some(idx),
        })
        .collect()
}

fn peephole_pass(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut optimized = Vec::new();
    let mut i = 0;
    while i < instructions.len() {
        let curr = &instructions[i];
        let nxt = instructions.get(i + 1);
        let nxt2 = instructions.get(i + 2);

        // Rule 1: RST r; ADD r -> RST r
        if curr.op == "RST"
            && let Some(nxt) = nxt
            && nxt.op == "ADD"
            && curr.arg == nxt.arg
        {
            optimized.push(curr.clone());
            i += 2;
            continue;
        }

        // Rule 2: SWP r; SWP r -> (nothing)
        if curr.op == "SWP"
            && let Some(nxt) = nxt
            && nxt.op == "SWP"
            && curr.arg == nxt.arg
        {
            i += 2;
            continue;
        }

        // Rule 3: RST a; ADD r; SWP r -> RST a; ADD r
        if curr.op == "RST"
            && curr.arg.as_deref() == Some("a")
            && let Some(nxt) = nxt
            && nxt.op == "ADD"
            && let Some(nxt2) = nxt2
            && nxt2.op == "SWP"
            && nxt2.arg == nxt.arg
        {
            optimized.push(curr.clone());
            optimized.push(nxt.clone());
            i += 3;
            continue;
        }

        // Rule 4: LOAD k; STORE k -> (nothing), when instruction i+2
        // writes `a` without reading it.
        if curr.op == "LOAD"
            && curr.arg.is_some()
            && let Some(nxt) = nxt
            && nxt.op == "STORE"
            && nxt.arg == curr.arg
            && let Some(following) = instructions.get(i + 2)
            && !reg_reads(following).contains(&"a")
            && reg_writes(following).contains(&"a")
        {
            i += 2;
            continue;
        }

        // Rule 5: SHL r; SHR r -> (nothing)
        if curr.op == "SHL"
            && let Some(nxt) = nxt
            && nxt.op == "SHR"
            && curr.arg == nxt.arg
        {
            i += 2;
            continue;
        }

        // Rule 6: JUMP to the next instruction -> (nothing)
        if curr.op == "JUMP"
            && let Some(arg) = &curr.arg
            && let Ok(target) = arg.parse::<usize>()
            && target == i + 1
        {
            i += 1;
            continue;
        }

        optimized.push(curr.clone());
        i += 1;
    }
    optimized
}

/// Map each original instruction index to where its replacement ended up
/// in the optimized stream, so absolute jump targets survive a rewrite.
/// An index whose instruction was deleted maps to whatever instruction
/// now occupies its old position (the next surviving one, or the last
/// instruction if everything after it was also deleted).
fn build_old_to_new_map(old_len: usize, new_instructions: &[Instruction]) -> Vec<usize> {
    let mut old_to_new: Vec<Option<usize>> = vec![None; old_len];
    for (new_idx, instr) in new_instructions.iter().enumerate() {
        if let Some(source_index) = instr.source_index {
            old_to_new[source_index] = Some(new_idx);
        }
    }

    let mut next_known: Option<usize> = None;
    for idx in (0..old_len).rev() {
        match old_to_new[idx] {
            Some(value) => next_known = Some(value),
            None => {
                old_to_new[idx] = Some(next_known.unwrap_or_else(|| new_instructions.len().saturating_sub(1)));
            }
        }
    }

    old_to_new.into_iter().map(|v| v.unwrap_or(0)).collect()
}

fn remap_jump_targets(instructions: &[Instruction], old_to_new: &[usize]) -> Vec<Instruction> {
    instructions
        .iter()
        .map(|instr| {
            if JUMP_OPS.contains(&instr.op.as_str())
                && let Some(arg) = &instr.arg
                && let Ok(target) = arg.parse::<usize>()
                && target < old_to_new.len()
            {
                Instruction {
                    op: instr.op.clone(),
                    arg: Some(old_to_new[target].to_string()),
                    source_index: instr.source_index,
                }
            } else {
                instr.clone()
            }
        })
        .collect()
}

/// Run the peephole passes to a fixpoint, capped at `max_iterations`.
pub fn optimize(lines: &[String], max_iterations: usize) -> Vec<String> {
    let mut instructions = parse_instructions(lines);
    for _ in 0..max_iterations {
        let normalized = normalize_sources(&instructions);
        let optimized = peephole_pass(&normalized);
        let old_to_new = build_old_to_new_map(normalized.len(), &optimized);
        let remapped = remap_jump_targets(&optimized, &old_to_new);

        let unchanged = remapped.len() == normalized.len()
            && remapped
                .iter()
                .zip(normalized.iter())
                .all(|(a, b)| a.to_text() == b.to_text());
        instructions = remapped;
        if unchanged {
            break;
        }
    }
    instructions.iter().map(Instruction::to_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn collapses_rst_add_same_register() {
        let out = optimize(&lines(&["RST c", "ADD c", "WRITE"]), 3);
        assert_eq!(out, vec!["RST c", "WRITE"]);
    }

    #[test]
    fn cancels_double_swap() {
        let out = optimize(&lines(&["SWP b", "SWP b", "WRITE"]), 3);
        assert_eq!(out, vec!["WRITE"]);
    }

    #[test]
    fn drops_trailing_swap_after_rst_a_add() {
        let out = optimize(&lines(&["RST a", "ADD c", "SWP c", "WRITE"]), 3);
        assert_eq!(out, vec!["RST a", "ADD c", "WRITE"]);
    }

    #[test]
    fn cancels_shl_shr_same_register() {
        let out = optimize(&lines(&["SHL a", "SHR a", "WRITE"]), 3);
        assert_eq!(out, vec!["WRITE"]);
    }

    #[test]
    fn removes_jump_to_next_instruction() {
        let out = optimize(&lines(&["JUMP 1", "WRITE"]), 3);
        assert_eq!(out, vec!["WRITE"]);
    }

    #[test]
    fn remaps_jump_targets_after_deletion() {
        // Instruction 0 and 1 cancel (double swap); the JUMP at index 2
        // targets index 3, which must become index 1 after the rewrite.
        let out = optimize(&lines(&["SWP b", "SWP b", "JUMP 3", "WRITE"]), 1);
        assert_eq!(out, vec!["JUMP 1", "WRITE"]);
    }

    #[test]
    fn removes_redundant_load_store_before_overwriting_write() {
        let out = optimize(&lines(&["LOAD 0", "STORE 0", "RST a", "WRITE"]), 3);
        assert_eq!(out, vec!["RST a", "WRITE"]);
    }

    #[test]
    fn keeps_load_store_when_following_instruction_reads_a() {
        let out = optimize(&lines(&["LOAD 0", "STORE 0", "WRITE"]), 3);
        assert_eq!(out, vec!["LOAD 0", "STORE 0", "WRITE"]);
    }
}
