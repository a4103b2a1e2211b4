//! Instruction generation: IR to a linear instruction stream.
//!
//! Names are resolved to small per-scope slot indices as they are
//! encountered; a scope stack mirrors block and function nesting. The
//! VM is stack-based, so operands are emitted before the instruction
//! that consumes them, and conditionals become relative `BRANCH`/`JUMP`
//! offsets measured in instructions.

use livy_common::scope::Scope;
use livy_parser::ast::ScalarValue;

use crate::lowered::Lowered;

/// One VM instruction. `LoadFunc` carries its body as nested
/// instructions; the encoder flattens it into the function pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    LoadUnit,
    LoadBool(bool),
    LoadString(String),
    LoadInt(i64),
    LoadFloat(f64),
    LoadFunc(Vec<Instruction>),
    BuildPair,
    BuildList(u64),
    LoadName { depth: u32, index: u32 },
    StoreName(u32),
    Apply,
    Native(u8),
    Jump(u64),
    Branch(u64),
}

impl Instruction {
    /// The wire opcode, 0..=13.
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::LoadUnit => 0,
            Instruction::LoadBool(_) => 1,
            Instruction::LoadString(_) => 2,
            Instruction::LoadInt(_) => 3,
            Instruction::LoadFloat(_) => 4,
            Instruction::LoadFunc(_) => 5,
            Instruction::BuildPair => 6,
            Instruction::BuildList(_) => 7,
            Instruction::LoadName { .. } => 8,
            Instruction::StoreName(_) => 9,
            Instruction::Apply => 10,
            Instruction::Native(_) => 11,
            Instruction::Jump(_) => 12,
            Instruction::Branch(_) => 13,
        }
    }
}

/// Flatten the IR into instructions.
pub fn generate_instructions(tree: &Lowered) -> Vec<Instruction> {
    Generator::new().emit(tree)
}

struct Generator {
    /// Slot index for each name, per scope.
    scope: Scope<u32>,
    /// The next free slot in the current scope.
    current_index: u32,
    /// Saved `current_index` values of the enclosing scopes.
    index_stack: Vec<u32>,
    /// How many function bodies deep the walk currently is.
    function_level: u32,
}

impl Generator {
    fn new() -> Self {
        Generator {
            scope: Scope::new(),
            current_index: 0,
            index_stack: Vec::new(),
            function_level: 0,
        }
    }

    fn push_scope(&mut self) {
        self.scope.push_scope();
        self.index_stack.push(self.current_index);
        self.current_index = 0;
    }

    fn pop_scope(&mut self) {
        self.scope.pop_scope();
        self.current_index = self
            .index_stack
            .pop()
            .expect("scope pushes and pops are balanced");
    }

    /// Slot index for a name, assigning the next free one in the
    /// current scope on first sight.
    fn slot(&mut self, name: &str) -> u32 {
        if !self.scope.contains(name) {
            self.scope.insert(name.to_owned(), self.current_index);
            self.current_index += 1;
        }
        *self.scope.get(name).expect("just ensured the binding")
    }

    fn emit(&mut self, node: &Lowered) -> Vec<Instruction> {
        match node {
            Lowered::Apply { func, arg } => {
                let mut out = self.emit(arg);
                out.extend(self.emit(func));
                out.push(Instruction::Apply);
                out
            }
            Lowered::Block(body) => {
                self.push_scope();
                let out = body.iter().flat_map(|stmt| self.emit(stmt)).collect();
                self.pop_scope();
                out
            }
            Lowered::Cond { pred, cons, alt } => {
                let cons_body = self.emit(cons);
                let alt_body = self.emit(alt);
                let mut out = self.emit(pred);
                out.push(Instruction::Branch(cons_body.len() as u64 + 1));
                out.extend(cons_body);
                out.push(Instruction::Jump(alt_body.len() as u64));
                out.extend(alt_body);
                out
            }
            Lowered::Define { name, value } => {
                let mut out = self.emit(value);
                out.push(Instruction::StoreName(self.slot(name)));
                out
            }
            Lowered::Function { param, body } => {
                self.push_scope();
                self.function_level += 1;
                self.scope.insert(param.clone(), 0);
                self.current_index = 1;
                let func_body = self.emit(body);
                self.function_level -= 1;
                self.pop_scope();
                vec![Instruction::LoadFunc(func_body)]
            }
            Lowered::List(elems) => {
                let mut out: Vec<Instruction> =
                    elems.iter().flat_map(|elem| self.emit(elem)).collect();
                out.push(Instruction::BuildList(elems.len() as u64));
                out
            }
            Lowered::Pair { first, second } => {
                let mut out = self.emit(second);
                out.extend(self.emit(first));
                out.push(Instruction::BuildPair);
                out
            }
            Lowered::Name(name) => {
                let index = self.slot(name);
                let depth = self
                    .scope
                    .depth(name)
                    .expect("slot() ensured the binding") as u32;
                // Inside a function, anything past the current frame is
                // a capture the VM resolves through the closure.
                let depth = if self.function_level > 0 && depth > 0 {
                    0
                } else {
                    depth + 1
                };
                vec![Instruction::LoadName { depth, index }]
            }
            Lowered::NativeOp { op, left, right } => {
                let mut out = right
                    .as_deref()
                    .map(|r| self.emit(r))
                    .unwrap_or_default();
                out.extend(self.emit(left));
                out.push(Instruction::Native(op.index()));
                out
            }
            Lowered::Scalar(value) => vec![match value {
                ScalarValue::Bool(b) => Instruction::LoadBool(*b),
                ScalarValue::Int(i) => Instruction::LoadInt(*i),
                ScalarValue::Float(f) => Instruction::LoadFloat(*f),
                ScalarValue::String(s) => Instruction::LoadString(s.clone()),
            }],
            Lowered::Unit => vec![Instruction::LoadUnit],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowered::{Lowered as L, NativeOp};

    #[test]
    fn define_emits_value_then_store() {
        let tree = L::define("x", L::int(3));
        assert_eq!(
            generate_instructions(&tree),
            vec![Instruction::LoadInt(3), Instruction::StoreName(0)]
        );
    }

    #[test]
    fn successive_defines_get_successive_slots() {
        let tree = L::Block(vec![
            L::define("x", L::int(1)),
            L::define("y", L::int(2)),
            L::define("x", L::int(3)),
        ]);
        assert_eq!(
            generate_instructions(&tree),
            vec![
                Instruction::LoadInt(1),
                Instruction::StoreName(0),
                Instruction::LoadInt(2),
                Instruction::StoreName(1),
                Instruction::LoadInt(3),
                Instruction::StoreName(0),
            ]
        );
    }

    #[test]
    fn apply_emits_argument_then_function() {
        let tree = L::apply(L::name("f"), L::int(1));
        assert_eq!(
            generate_instructions(&tree),
            vec![
                Instruction::LoadInt(1),
                Instruction::LoadName { depth: 1, index: 0 },
                Instruction::Apply,
            ]
        );
    }

    #[test]
    fn pair_emits_second_then_first() {
        let tree = L::pair(L::int(1), L::int(2));
        assert_eq!(
            generate_instructions(&tree),
            vec![
                Instruction::LoadInt(2),
                Instruction::LoadInt(1),
                Instruction::BuildPair,
            ]
        );
    }

    #[test]
    fn list_emits_elements_in_order() {
        let tree = L::List(vec![L::int(1), L::int(2)]);
        assert_eq!(
            generate_instructions(&tree),
            vec![
                Instruction::LoadInt(1),
                Instruction::LoadInt(2),
                Instruction::BuildList(2),
            ]
        );
    }

    #[test]
    fn native_op_emits_right_then_left() {
        let tree = L::native(NativeOp::Sub, L::int(5), Some(L::int(3)));
        assert_eq!(
            generate_instructions(&tree),
            vec![
                Instruction::LoadInt(3),
                Instruction::LoadInt(5),
                Instruction::Native(11),
            ]
        );
    }

    #[test]
    fn cond_branch_and_jump_offsets_count_instructions() {
        let tree = L::cond(L::bool(true), L::int(1), L::int(2));
        assert_eq!(
            generate_instructions(&tree),
            vec![
                Instruction::LoadBool(true),
                Instruction::Branch(2),
                Instruction::LoadInt(1),
                Instruction::Jump(1),
                Instruction::LoadInt(2),
            ]
        );
    }

    #[test]
    fn function_body_references_its_parameter() {
        // \x -> x: the parameter sits in slot 0 of the function frame.
        let tree = L::function("x", L::name("x"));
        assert_eq!(
            generate_instructions(&tree),
            vec![Instruction::LoadFunc(vec![Instruction::LoadName {
                depth: 1,
                index: 0
            }])]
        );
    }

    #[test]
    fn function_captures_use_depth_zero() {
        // { y = 1; \x -> y }: y resolves past the function frame.
        let tree = L::Block(vec![
            L::define("y", L::int(1)),
            L::function("x", L::name("y")),
        ]);
        let instructions = generate_instructions(&tree);
        let Instruction::LoadFunc(body) = &instructions[2] else {
            panic!("expected LoadFunc, got {:?}", instructions[2]);
        };
        assert_eq!(body[0], Instruction::LoadName { depth: 0, index: 0 });
    }

    #[test]
    fn unit_loads_unit() {
        assert_eq!(generate_instructions(&L::Unit), vec![Instruction::LoadUnit]);
    }
}
