//! Label resolver.
//!
//! Two passes over the raw, labeled code the generator produced: first
//! assign every non-label line its final instruction index, then rewrite
//! every `JUMP`/`JZERO`/`JPOS`/`CALL` operand that names a label into
//! that absolute index. The output is the flat numeric-target program
//! text the VM expects.

use std::collections::HashMap;

use crate::codegen::RawLine;

const JUMP_OPS: [&str; 4] = ["JUMP", "JZERO", "JPOS", "CALL"];

pub fn resolve(lines: &[RawLine]) -> Vec<String> {
    let mut label_map = HashMap::new();
    let mut index = 0usize;
    for line in lines {
        match line {
            RawLine::Label(name) => {
                label_map.insert(name.clone(), index);
            }
            RawLine::Instr(_) => index += 1,
        }
    }

    let mut output = Vec::with_capacity(index);
    for line in lines {
        let RawLine::Instr(text) = line else { continue };
        output.push(resolve_instr(text, &label_map));
    }
    output
}

fn resolve_instr(text: &str, label_map: &HashMap<String, usize>) -> String {
    let mut parts = text.splitn(2, ' ');
    let Some(op) = parts.next() else {
        return text.to_string();
    };
    let Some(operand) = parts.next() else {
        return text.to_string();
    };
    if !JUMP_OPS.contains(&op) {
        return text.to_string();
    }
    match label_map.get(operand) {
        Some(target) => format!("{} {}", op, target),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_forward_and_backward_jumps_to_absolute_indices() {
        let lines = vec![
            RawLine::Instr("JUMP loop_end".to_string()),
            RawLine::Label("loop_start".to_string()),
            RawLine::Instr("INC a".to_string()),
            RawLine::Instr("JUMP loop_start".to_string()),
            RawLine::Label("loop_end".to_string()),
            RawLine::Instr("HALT".to_string()),
        ];
        let resolved = resolve(&lines);
        assert_eq!(resolved, vec!["JUMP 3", "INC a", "JUMP 1", "HALT"]);
    }

    #[test]
    fn non_jump_instructions_pass_through_unchanged() {
        let lines = vec![
            RawLine::Instr("RST a".to_string()),
            RawLine::Instr("STORE 0".to_string()),
        ];
        assert_eq!(resolve(&lines), vec!["RST a", "STORE 0"]);
    }

    #[test]
    fn already_numeric_call_targets_are_left_alone() {
        let lines = vec![RawLine::Instr("CALL 7".to_string())];
        assert_eq!(resolve(&lines), vec!["CALL 7"]);
    }
}
