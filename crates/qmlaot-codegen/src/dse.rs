//! Dead-store elimination over generated sections.
//!
//! Sections are grouped into basic blocks, split before every label and
//! after every jump. Each register variable is then scanned backwards: a
//! write nothing reads before the next write, and that has no side
//! effects, is commented out. Jumps carry the read state of their target
//! block back into the scan. The whole pass repeats until nothing changes,
//! since dropping one store can make an earlier one dead.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::section::{JumpMode, Section};

/// Whether a variable is read after a program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    /// Not read before being overwritten
    NoRead,
    /// Read in this block
    SelfRead,
    /// Possibly read in some other block
    Preserve,
}

#[derive(Debug, Clone, Default)]
struct BasicBlock {
    begin: usize,
    end: usize,
    label: String,
    jump_mode: JumpMode,
    jump_target: String,
    jump_target_block: Option<usize>,
    previous_blocks: Vec<usize>,
}

/// Read state at the start of each block, per variable.
type RequiredRegisters = Vec<FxHashMap<String, ReadMode>>;

fn find_basic_blocks(sections: &[Section]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current = BasicBlock::default();
    for (i, section) in sections.iter().enumerate() {
        if !section.label().is_empty() || current.jump_mode != JumpMode::None {
            if current.begin != i {
                current.end = i;
                let next = BasicBlock {
                    begin: i,
                    ..BasicBlock::default()
                };
                blocks.push(std::mem::replace(&mut current, next));
            }
            current.label = section.label().to_string();
        }
        current.jump_mode = section.jump_mode();
        current.jump_target = section.jump_target().to_string();
    }
    current.end = sections.len();
    blocks.push(current);

    for i in 0..blocks.len() {
        if i > 0 && blocks[i - 1].jump_mode != JumpMode::Unconditional {
            blocks[i].previous_blocks.push(i - 1);
        }
        if blocks[i].label.is_empty() {
            continue;
        }
        for j in 0..blocks.len() {
            if blocks[j].jump_mode == JumpMode::None || blocks[j].jump_target != blocks[i].label {
                continue;
            }
            blocks[j].jump_target_block = Some(i);
            blocks[i].previous_blocks.push(j);
        }
    }
    blocks
}

/// Turn `Preserve` states that only feed each other into `NoRead`; keep
/// those on a path to a block that actually reads.
fn drop_preserve_cycles(blocks: &[BasicBlock], required: &RequiredRegisters) -> RequiredRegisters {
    let mut result: RequiredRegisters = vec![FxHashMap::default(); required.len()];
    for (i, block) in blocks.iter().enumerate() {
        for (variable, mode) in &required[i] {
            match mode {
                ReadMode::NoRead => {
                    result[i].insert(variable.clone(), ReadMode::NoRead);
                    continue;
                }
                ReadMode::Preserve => {
                    result[i].entry(variable.clone()).or_insert(ReadMode::NoRead);
                    continue;
                }
                ReadMode::SelfRead => {
                    result[i].insert(variable.clone(), ReadMode::SelfRead);
                }
            }

            let mut visited = FxHashSet::default();
            let mut to_check: Vec<usize> = block.previous_blocks.clone();
            while let Some(current) = to_check.pop() {
                if !visited.insert(current) {
                    continue;
                }
                if required[current].get(variable) == Some(&ReadMode::Preserve) {
                    result[current].insert(variable.clone(), ReadMode::Preserve);
                    to_check.extend(blocks[current].previous_blocks.iter().copied());
                }
            }
        }
    }
    result
}

/// Comment out dead stores in `sections`. Returns the variables of
/// `variables` that are still used; the others need no declaration.
pub fn eliminate_dead_stores(sections: &mut [Section], variables: &[String]) -> FxHashSet<String> {
    let blocks = find_basic_blocks(sections);
    let mut required: RequiredRegisters = vec![FxHashMap::default(); blocks.len()];
    let mut live: Vec<String> = variables.iter().filter(|v| !v.is_empty()).cloned().collect();

    loop {
        let mut to_erase: Vec<usize> = Vec::new();
        let mut found_unknown_block = false;

        live.retain(|variable| {
            let mut used_once = false;
            let mut in_use = ReadMode::NoRead;
            let mut block_index = blocks.len() - 1;

            for i in (0..sections.len()).rev() {
                if blocks[block_index].begin > i {
                    required[block_index].insert(variable.clone(), in_use);
                    block_index -= 1;
                    let block = &blocks[block_index];
                    if block.jump_mode == JumpMode::Unconditional {
                        in_use = ReadMode::NoRead;
                    } else if in_use == ReadMode::SelfRead {
                        in_use = ReadMode::Preserve;
                    }

                    if block.jump_mode != JumpMode::None {
                        match block.jump_target_block.map(|target| required[target].get(variable)) {
                            Some(None) => {
                                found_unknown_block = true;
                                in_use = ReadMode::Preserve;
                            }
                            Some(Some(ReadMode::NoRead)) => {}
                            Some(Some(_)) | None => in_use = ReadMode::Preserve,
                        }
                    }
                }

                let section = &sections[i];
                if section.write_register() == variable.as_str() {
                    if in_use == ReadMode::NoRead && !section.has_side_effects() {
                        to_erase.push(i);
                    } else {
                        used_once = true;
                        // Increment and Decrement read and write the same variable.
                        in_use = if section.reads_register(variable) {
                            ReadMode::SelfRead
                        } else {
                            ReadMode::NoRead
                        };
                    }
                } else if section.reads_register(variable) {
                    in_use = ReadMode::SelfRead;
                    used_once = true;
                }
            }
            required[0].insert(variable.clone(), in_use);
            used_once
        });

        to_erase.sort_unstable();
        to_erase.dedup();
        for &i in &to_erase {
            trace!(section = i, "dropping dead store");
            sections[i].comment_out();
        }

        if found_unknown_block {
            required = drop_preserve_cycles(&blocks, &required);
        }
        if to_erase.is_empty() && !found_unknown_block {
            break;
        }
    }

    live.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(code: &str, write: &str, reads: &[&str]) -> Section {
        let mut section = Section::default();
        section += code;
        section.set_write_register(write);
        for read in reads {
            section.add_read_register(read);
        }
        section
    }

    fn variables(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_overwritten_store_is_dropped() {
        let mut sections = vec![
            section("r2 = 1;\n", "r2", &[]),
            section("r2 = 2;\n", "r2", &[]),
            section("r7 = r2;\n", "r7", &["r2"]),
            section("return r7;\n", "", &["r7"]),
        ];
        sections[3].set_has_side_effects(true);
        let used = eliminate_dead_stores(&mut sections, &variables(&["r2", "r7"]));
        assert_eq!(sections[0].code(), "// r2 = 1;\n");
        assert_eq!(sections[1].code(), "r2 = 2;\n");
        assert!(used.contains("r2") && used.contains("r7"));
    }

    #[test]
    fn test_unread_variable_loses_declaration() {
        let mut sections = vec![
            section("r2 = 1;\n", "r2", &[]),
            section("r7 = r2;\n", "r7", &["r2"]),
        ];
        let used = eliminate_dead_stores(&mut sections, &variables(&["r2", "r7"]));
        assert_eq!(sections[1].code(), "// r7 = r2;\n");
        assert_eq!(sections[0].code(), "// r2 = 1;\n");
        assert!(used.is_empty());
    }

    #[test]
    fn test_side_effects_are_kept() {
        let mut sections = vec![section("r2 = f();\n", "r2", &[])];
        sections[0].set_has_side_effects(true);
        let used = eliminate_dead_stores(&mut sections, &variables(&["r2"]));
        assert_eq!(sections[0].code(), "r2 = f();\n");
        assert!(used.contains("r2"));
    }

    #[test]
    fn test_store_read_after_backward_jump_survives() {
        let mut label = section("label_0:;\n", "", &[]);
        label.set_label("label_0");
        label.set_has_side_effects(true);
        let mut jump = section("if (r7) goto label_0;\n", "", &["r7"]);
        jump.set_jump("label_0", JumpMode::Conditional);
        jump.set_has_side_effects(true);
        let mut ret = section("return r2;\n", "", &["r2"]);
        ret.set_has_side_effects(true);

        let mut sections = vec![
            section("r2 = 0;\n", "r2", &[]),
            label,
            section("r2 = r2 + 1;\n", "r2", &["r2"]),
            section("r7 = r2 < 3;\n", "r7", &["r2"]),
            jump,
            ret,
        ];
        eliminate_dead_stores(&mut sections, &variables(&["r2", "r7"]));
        assert_eq!(sections[0].code(), "r2 = 0;\n");
        assert_eq!(sections[2].code(), "r2 = r2 + 1;\n");
        assert_eq!(sections[3].code(), "r7 = r2 < 3;\n");
    }

    #[test]
    fn test_basic_blocks_split_at_labels_and_jumps() {
        let mut jump = section("goto label_0;\n", "", &[]);
        jump.set_jump("label_0", JumpMode::Unconditional);
        let mut label = section("label_0:;\n", "", &[]);
        label.set_label("label_0");
        let sections = vec![section("a;\n", "", &[]), jump, section("b;\n", "", &[]), label];
        let blocks = find_basic_blocks(&sections);
        assert_eq!(blocks.len(), 3);
        assert_eq!((blocks[0].begin, blocks[0].end), (0, 2));
        assert_eq!(blocks[0].jump_target_block, Some(2));
        assert!(blocks[1].previous_blocks.is_empty());
        assert_eq!(blocks[2].previous_blocks, vec![1, 0]);
    }
}
