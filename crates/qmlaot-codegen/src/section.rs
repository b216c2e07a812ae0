//! Sections: the unit of generated code dead-store elimination works on.
//!
//! Every instruction produces at least one section. A section knows which
//! register variable it writes, which ones it reads, whether it has effects
//! beyond the write, and how control leaves it.

use rustc_hash::FxHashSet;

/// How control leaves a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpMode {
    /// Falls through to the next section
    #[default]
    None,
    /// May jump or fall through
    Conditional,
    /// Always jumps
    Unconditional,
}

/// A piece of generated code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    code: String,
    write_register: String,
    read_registers: FxHashSet<String>,
    has_side_effects: bool,
    label: String,
    jump_target: String,
    jump_mode: JumpMode,
}

impl Section {
    /// The code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether nothing was generated into the section.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Append code.
    pub fn push_str(&mut self, code: &str) {
        self.code.push_str(code);
    }

    /// Variable the section writes; empty if none.
    pub fn write_register(&self) -> &str {
        &self.write_register
    }

    /// Set the variable the section writes.
    pub fn set_write_register(&mut self, variable: impl Into<String>) {
        self.write_register = variable.into();
    }

    /// Record a read of `variable`.
    pub fn add_read_register(&mut self, variable: &str) {
        if !variable.is_empty() {
            self.read_registers.insert(variable.to_string());
        }
    }

    /// Whether the section reads `variable`.
    pub fn reads_register(&self, variable: &str) -> bool {
        self.read_registers.contains(variable)
    }

    /// Whether the section must be kept even if its write is dead.
    pub fn has_side_effects(&self) -> bool {
        self.has_side_effects
    }

    /// Mark the section as having effects beyond its write.
    pub fn set_has_side_effects(&mut self, has_side_effects: bool) {
        self.has_side_effects = has_side_effects;
    }

    /// Label the section starts with; empty if none.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set the label the section starts with.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Label the section jumps to.
    pub fn jump_target(&self) -> &str {
        &self.jump_target
    }

    /// How control leaves the section.
    pub fn jump_mode(&self) -> JumpMode {
        self.jump_mode
    }

    /// Make the section end in a jump to `target`.
    pub fn set_jump(&mut self, target: impl Into<String>, mode: JumpMode) {
        self.jump_target = target.into();
        self.jump_mode = mode;
    }

    /// Replace the section by its code commented out. The result reads and
    /// writes nothing.
    pub fn comment_out(&mut self) {
        let mut code = self.code.replace('\n', "\n// ");
        if !code.starts_with("// ") && !code.starts_with('\n') {
            code.insert_str(0, "// ");
        }
        if code.ends_with("\n// ") {
            code.truncate(code.len() - 3);
        } else if !code.ends_with('\n') {
            code.push('\n');
        }
        *self = Section {
            code,
            ..Section::default()
        };
    }
}

impl std::ops::AddAssign<&str> for Section {
    fn add_assign(&mut self, code: &str) {
        self.code.push_str(code);
    }
}

impl std::ops::AddAssign<String> for Section {
    fn add_assign(&mut self, code: String) {
        self.code.push_str(&code);
    }
}

impl std::fmt::Write for Section {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.code.push_str(s);
        Ok(())
    }
}

/// Concatenate the code of `sections`.
pub fn join(sections: &[Section]) -> String {
    sections.iter().map(Section::code).collect()
}
