//! Constant folding over the IR.
//!
//! Carries a scope of names known to hold scalar constants. Definitions
//! of scalars are recorded and elided from their block; uses of recorded
//! names become the scalar itself; conditionals with a known predicate
//! collapse to one branch; and native operations over two scalars are
//! evaluated at compile time. Anything that could overflow, divide by
//! zero, or raise to a negative power is left for the VM.

use livy_common::scope::Scope;
use livy_parser::ast::ScalarValue;

use crate::lowered::{Lowered, NativeOp};

/// Evaluate the trivially constant parts of the tree.
pub fn fold_constants(tree: Lowered) -> Lowered {
    Folder {
        scope: Scope::new(),
    }
    .fold(tree)
}

struct Folder {
    /// Names currently known to hold a scalar constant.
    scope: Scope<ScalarValue>,
}

impl Folder {
    fn fold(&mut self, node: Lowered) -> Lowered {
        match node {
            Lowered::Apply { func, arg } => {
                Lowered::apply(self.fold(*func), self.fold(*arg))
            }
            Lowered::Block(body) => {
                self.scope.push_scope();
                let mut out: Vec<Lowered> = Vec::with_capacity(body.len());
                for stmt in body {
                    let folded = self.fold(stmt);
                    // A definition that folded to a scalar has been
                    // recorded in scope; its statement disappears.
                    if let Lowered::Define { value, .. } = &folded {
                        if matches!(value.as_ref(), Lowered::Scalar(_)) {
                            continue;
                        }
                    }
                    out.push(folded);
                }
                self.scope.pop_scope();
                Lowered::block(out)
            }
            Lowered::Cond { pred, cons, alt } => {
                let pred = self.fold(*pred);
                if let Lowered::Scalar(ScalarValue::Bool(truth)) = pred {
                    return if truth { self.fold(*cons) } else { self.fold(*alt) };
                }
                Lowered::cond(pred, self.fold(*cons), self.fold(*alt))
            }
            Lowered::Define { name, value } => {
                let value = self.fold(*value);
                if let Lowered::Scalar(scalar) = &value {
                    self.scope.insert(name.clone(), scalar.clone());
                }
                Lowered::Define {
                    name,
                    value: Box::new(value),
                }
            }
            Lowered::Function { param, body } => {
                self.scope.push_scope();
                let body = self.fold(*body);
                self.scope.pop_scope();
                Lowered::function(param, body)
            }
            Lowered::List(elems) => {
                Lowered::List(elems.into_iter().map(|elem| self.fold(elem)).collect())
            }
            Lowered::Pair { first, second } => {
                Lowered::pair(self.fold(*first), self.fold(*second))
            }
            Lowered::Name(name) => match self.scope.get(&name) {
                Some(scalar) => Lowered::Scalar(scalar.clone()),
                None => Lowered::Name(name),
            },
            Lowered::NativeOp { op, left, right } => {
                let left = self.fold(*left);
                let right = right.map(|r| self.fold(*r));
                fold_native(op, left, right)
            }
            leaf @ (Lowered::Scalar(_) | Lowered::Unit) => leaf,
        }
    }
}

/// Fold a native operation over scalar operands, or rebuild it.
fn fold_native(op: NativeOp, left: Lowered, right: Option<Lowered>) -> Lowered {
    if op == NativeOp::Neg && right.is_none() {
        if let Lowered::Scalar(value) = &left {
            match value {
                ScalarValue::Int(i) => {
                    if let Some(negated) = i.checked_neg() {
                        return Lowered::int(negated);
                    }
                }
                ScalarValue::Float(f) => return Lowered::Scalar(ScalarValue::Float(-f)),
                _ => {}
            }
        }
        return Lowered::native(op, left, right);
    }

    if let (Lowered::Scalar(l), Some(Lowered::Scalar(r))) = (&left, right.as_ref()) {
        if let Some(folded) = fold_binary(op, l, r) {
            return Lowered::Scalar(folded);
        }
    }
    Lowered::native(op, left, right)
}

/// The scalar result of a binary operation, when it can be computed
/// safely at compile time.
fn fold_binary(op: NativeOp, left: &ScalarValue, right: &ScalarValue) -> Option<ScalarValue> {
    use ScalarValue::{Bool, Float, Int, String};

    match (op, left, right) {
        // Integer arithmetic: checked, with floor division semantics.
        (NativeOp::Add, Int(l), Int(r)) => l.checked_add(*r).map(Int),
        (NativeOp::Sub, Int(l), Int(r)) => l.checked_sub(*r).map(Int),
        (NativeOp::Mul, Int(l), Int(r)) => l.checked_mul(*r).map(Int),
        (NativeOp::Div, Int(l), Int(r)) => floor_div(*l, *r).map(Int),
        (NativeOp::Mod, Int(l), Int(r)) => floor_mod(*l, *r).map(Int),
        (NativeOp::Exp, Int(l), Int(r)) => {
            let exponent = u32::try_from(*r).ok()?;
            l.checked_pow(exponent).map(Int)
        }

        // Float arithmetic.
        (NativeOp::Add, Float(l), Float(r)) => Some(Float(l + r)),
        (NativeOp::Sub, Float(l), Float(r)) => Some(Float(l - r)),
        (NativeOp::Mul, Float(l), Float(r)) => Some(Float(l * r)),
        (NativeOp::Div, Float(l), Float(r)) if *r != 0.0 => Some(Float(l / r)),
        (NativeOp::Mod, Float(l), Float(r)) if *r != 0.0 => Some(Float(l % r)),
        (NativeOp::Exp, Float(l), Float(r)) => Some(Float(l.powf(*r))),

        // Comparisons.
        (NativeOp::Equal, Int(l), Int(r)) => Some(Bool(l == r)),
        (NativeOp::Equal, Float(l), Float(r)) => Some(Bool(l == r)),
        (NativeOp::Equal, Bool(l), Bool(r)) => Some(Bool(l == r)),
        (NativeOp::Equal, String(l), String(r)) => Some(Bool(l == r)),
        (NativeOp::Greater, Int(l), Int(r)) => Some(Bool(l > r)),
        (NativeOp::Greater, Float(l), Float(r)) => Some(Bool(l > r)),
        (NativeOp::Greater, String(l), String(r)) => Some(Bool(l > r)),
        (NativeOp::Less, Int(l), Int(r)) => Some(Bool(l < r)),
        (NativeOp::Less, Float(l), Float(r)) => Some(Bool(l < r)),
        (NativeOp::Less, String(l), String(r)) => Some(Bool(l < r)),

        _ => None,
    }
}

/// Division rounding toward negative infinity. `None` on division by
/// zero or overflow.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let quotient = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

/// The remainder matching [`floor_div`]: its sign follows the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        remainder.checked_add(b)
    } else {
        Some(remainder)
    }
}
