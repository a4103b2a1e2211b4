//! Size-bounded function inlining.
//!
//! Three cooperating walks: a scorer that weighs a subtree with a small
//! fixed rubric, a finder that collects every function literal (noting
//! which are bound by a `Define`, and which of those are recursive), and
//! an inliner that replaces applications of small enough functions with
//! their bodies, substituting the argument for the parameter.
//!
//! Aggressiveness is a level in 1..=3; the score threshold is 20 per
//! level. Recursive definitions are never inlined -- expanding them
//! would not terminate.

use livy_common::scope::Scope;

use crate::lowered::Lowered;

/// Inline every qualifying function application in the tree.
pub fn expand_inline(tree: Lowered, level: u32) -> Lowered {
    let mut finder = Finder::default();
    finder.visit(&tree);
    let targets = generate_targets(finder, 20 * level as u64);
    Inliner {
        scope: Scope::new(),
        targets,
    }
    .inline(tree)
}

// ── Scorer ─────────────────────────────────────────────────────────────

/// Complexity weight of a subtree. Structured nodes cost more than
/// leaves, so the threshold tracks how much code inlining would copy.
pub fn score(node: &Lowered) -> u64 {
    match node {
        Lowered::Apply { func, arg } => 2 + score(func) + score(arg),
        Lowered::Block(body) => 5 + body.iter().map(score).sum::<u64>(),
        Lowered::Cond { pred, cons, alt } => 6 + score(pred) + score(cons) + score(alt),
        Lowered::Define { value, .. } => 4 + score(value),
        Lowered::Function { body, .. } => 7 + score(body),
        Lowered::List(elems) => {
            let element_score = elems.iter().map(score).sum::<u64>();
            if element_score == 0 {
                1
            } else {
                3 + element_score
            }
        }
        Lowered::Pair { first, second } => 2 + score(first) + score(second),
        Lowered::NativeOp { left, right, .. } => {
            1 + score(left) + right.as_deref().map(score).unwrap_or(0)
        }
        Lowered::Name(_) | Lowered::Scalar(_) | Lowered::Unit => 0,
    }
}

// ── Finder ─────────────────────────────────────────────────────────────

/// Collects every `Function` node, the subset bound directly by a
/// `Define`, and the defined functions whose bodies mention their own
/// name.
#[derive(Default)]
struct Finder {
    funcs: Vec<Lowered>,
    defined: Vec<Lowered>,
    recursive: Vec<Lowered>,
}

impl Finder {
    fn visit(&mut self, node: &Lowered) {
        match node {
            Lowered::Apply { func, arg } => {
                self.visit(func);
                self.visit(arg);
            }
            Lowered::Block(body) => body.iter().for_each(|stmt| self.visit(stmt)),
            Lowered::Cond { pred, cons, alt } => {
                self.visit(pred);
                self.visit(cons);
                self.visit(alt);
            }
            Lowered::Define { name, value } => {
                self.visit(value);
                if let Lowered::Function { body, .. } = value.as_ref() {
                    if mentions_name(body, name) {
                        self.recursive.push(value.as_ref().clone());
                    } else {
                        self.defined.push(value.as_ref().clone());
                    }
                }
            }
            Lowered::Function { body, .. } => {
                self.visit(body);
                self.funcs.push(node.clone());
            }
            Lowered::List(elems) => elems.iter().for_each(|elem| self.visit(elem)),
            Lowered::Pair { first, second } => {
                self.visit(first);
                self.visit(second);
            }
            Lowered::NativeOp { left, right, .. } => {
                self.visit(left);
                if let Some(right) = right {
                    self.visit(right);
                }
            }
            Lowered::Name(_) | Lowered::Scalar(_) | Lowered::Unit => {}
        }
    }
}

/// Whether `name` occurs free in `node`. Recursion stops at a function
/// whose parameter shadows the name.
fn mentions_name(node: &Lowered, name: &str) -> bool {
    match node {
        Lowered::Name(n) => n == name,
        Lowered::Apply { func, arg } => mentions_name(func, name) || mentions_name(arg, name),
        Lowered::Block(body) => body.iter().any(|stmt| mentions_name(stmt, name)),
        Lowered::Cond { pred, cons, alt } => {
            mentions_name(pred, name) || mentions_name(cons, name) || mentions_name(alt, name)
        }
        Lowered::Define { value, .. } => mentions_name(value, name),
        Lowered::Function { param, body } => param != name && mentions_name(body, name),
        Lowered::List(elems) => elems.iter().any(|elem| mentions_name(elem, name)),
        Lowered::Pair { first, second } => {
            mentions_name(first, name) || mentions_name(second, name)
        }
        Lowered::NativeOp { left, right, .. } => {
            mentions_name(left, name)
                || right.as_deref().is_some_and(|r| mentions_name(r, name))
        }
        Lowered::Scalar(_) | Lowered::Unit => false,
    }
}

/// Select the functions worth inlining: body score plus a bonus (1 when
/// `Define`-bound, 3 otherwise) at most the threshold, and never
/// recursive. A threshold of zero admits everything non-recursive.
fn generate_targets(finder: Finder, threshold: u64) -> Vec<Lowered> {
    let Finder {
        funcs,
        defined,
        recursive,
    } = finder;
    let allow_all = threshold == 0;
    funcs
        .into_iter()
        .filter(|func| !recursive.contains(func))
        .filter(|func| {
            let Lowered::Function { body, .. } = func else {
                return false;
            };
            let total = score(body) + if defined.contains(func) { 1 } else { 3 };
            allow_all || total <= threshold
        })
        .collect()
}

// ── Inliner ────────────────────────────────────────────────────────────

struct Inliner {
    /// Names currently bound to a target function.
    scope: Scope<Lowered>,
    targets: Vec<Lowered>,
}

impl Inliner {
    fn is_target(&self, node: &Lowered) -> bool {
        matches!(node, Lowered::Function { .. }) && self.targets.contains(node)
    }

    fn inline(&mut self, node: Lowered) -> Lowered {
        match node {
            Lowered::Apply { func, arg } => {
                let func = self.inline(*func);
                let arg = self.inline(*arg);
                if self.is_target(&func) {
                    return inline_function(func, arg);
                }
                if let Lowered::Name(name) = &func {
                    if let Some(bound) = self.scope.get(name) {
                        if self.is_target(bound) {
                            return inline_function(bound.clone(), arg);
                        }
                    }
                }
                Lowered::apply(func, arg)
            }
            Lowered::Block(body) => Lowered::Block(
                body.into_iter().map(|stmt| self.inline(stmt)).collect(),
            ),
            Lowered::Cond { pred, cons, alt } => Lowered::cond(
                self.inline(*pred),
                self.inline(*cons),
                self.inline(*alt),
            ),
            Lowered::Define { name, value } => {
                let value = self.inline(*value);
                if self.is_target(&value) {
                    self.scope.insert(name.clone(), value.clone());
                }
                Lowered::Define {
                    name,
                    value: Box::new(value),
                }
            }
            Lowered::Function { param, body } => Lowered::function(param, self.inline(*body)),
            Lowered::List(elems) => Lowered::List(
                elems.into_iter().map(|elem| self.inline(elem)).collect(),
            ),
            Lowered::Pair { first, second } => {
                Lowered::pair(self.inline(*first), self.inline(*second))
            }
            Lowered::NativeOp { op, left, right } => Lowered::native(
                op,
                self.inline(*left),
                right.map(|r| self.inline(*r)),
            ),
            leaf @ (Lowered::Name(_) | Lowered::Scalar(_) | Lowered::Unit) => leaf,
        }
    }
}

/// Substitute `arg` for the parameter throughout the function body.
fn inline_function(func: Lowered, arg: Lowered) -> Lowered {
    let Lowered::Function { param, body } = func else {
        unreachable!("inline_function is only called on function literals");
    };
    replace_param(*body, &param, &arg)
}

/// Replace free occurrences of `param`; a nested function that rebinds
/// the same name ends the walk.
fn replace_param(node: Lowered, param: &str, arg: &Lowered) -> Lowered {
    match node {
        Lowered::Name(name) if name == param => arg.clone(),
        name @ Lowered::Name(_) => name,
        Lowered::Apply { func, arg: a } => Lowered::apply(
            replace_param(*func, param, arg),
            replace_param(*a, param, arg),
        ),
        Lowered::Block(body) => Lowered::Block(
            body.into_iter()
                .map(|stmt| replace_param(stmt, param, arg))
                .collect(),
        ),
        Lowered::Cond { pred, cons, alt } => Lowered::cond(
            replace_param(*pred, param, arg),
            replace_param(*cons, param, arg),
            replace_param(*alt, param, arg),
        ),
        Lowered::Define { name, value } => Lowered::Define {
            name,
            value: Box::new(replace_param(*value, param, arg)),
        },
        Lowered::Function { param: inner, body } => {
            if inner == param {
                Lowered::Function { param: inner, body }
            } else {
                Lowered::function(inner, replace_param(*body, param, arg))
            }
        }
        Lowered::List(elems) => Lowered::List(
            elems
                .into_iter()
                .map(|elem| replace_param(elem, param, arg))
                .collect(),
        ),
        Lowered::Pair { first, second } => Lowered::pair(
            replace_param(*first, param, arg),
            replace_param(*second, param, arg),
        ),
        Lowered::NativeOp { op, left, right } => Lowered::native(
            op,
            replace_param(*left, param, arg),
            right.map(|r| replace_param(*r, param, arg)),
        ),
        leaf @ (Lowered::Scalar(_) | Lowered::Unit) => leaf,
    }
}
