//! The operation-oriented IR the optimisation passes and the instruction
//! generator work on.
//!
//! Compared to the typed AST, patterns are gone (decomposed into
//! projections), matches are gone (expanded into conditional cascades),
//! spans and types are gone, and applications of the eleven primitive
//! operators have become `NativeOp` nodes the VM executes directly.

use livy_parser::ast::ScalarValue;

/// One of the eleven primitive VM operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    Add,
    Div,
    Equal,
    Exp,
    Greater,
    Join,
    Less,
    Mod,
    Mul,
    Neg,
    Sub,
}

impl NativeOp {
    /// Look up the binary operator for a name, if it is primitive.
    /// `~` (negation) is unary and handled separately.
    pub fn binary_from_name(name: &str) -> Option<NativeOp> {
        match name {
            "+" => Some(NativeOp::Add),
            "/" => Some(NativeOp::Div),
            "=" => Some(NativeOp::Equal),
            "^" => Some(NativeOp::Exp),
            ">" => Some(NativeOp::Greater),
            "<>" => Some(NativeOp::Join),
            "<" => Some(NativeOp::Less),
            "%" => Some(NativeOp::Mod),
            "*" => Some(NativeOp::Mul),
            "-" => Some(NativeOp::Sub),
            _ => None,
        }
    }

    /// The 1-based operand of the `NATIVE` instruction for this
    /// operation. The table is fixed; the VM relies on it.
    pub fn index(self) -> u8 {
        match self {
            NativeOp::Add => 1,
            NativeOp::Div => 2,
            NativeOp::Equal => 3,
            NativeOp::Exp => 4,
            NativeOp::Greater => 5,
            NativeOp::Join => 6,
            NativeOp::Less => 7,
            NativeOp::Mod => 8,
            NativeOp::Mul => 9,
            NativeOp::Neg => 10,
            NativeOp::Sub => 11,
        }
    }
}

/// A lowered expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Lowered {
    Apply {
        func: Box<Lowered>,
        arg: Box<Lowered>,
    },
    Block(Vec<Lowered>),
    Cond {
        pred: Box<Lowered>,
        cons: Box<Lowered>,
        alt: Box<Lowered>,
    },
    Define {
        name: String,
        value: Box<Lowered>,
    },
    Function {
        param: String,
        body: Box<Lowered>,
    },
    List(Vec<Lowered>),
    Pair {
        first: Box<Lowered>,
        second: Box<Lowered>,
    },
    Name(String),
    Scalar(ScalarValue),
    Unit,
    NativeOp {
        op: NativeOp,
        left: Box<Lowered>,
        right: Option<Box<Lowered>>,
    },
}

impl Lowered {
    pub fn apply(func: Lowered, arg: Lowered) -> Lowered {
        Lowered::Apply {
            func: Box::new(func),
            arg: Box::new(arg),
        }
    }

    /// A block, collapsing to its sole statement or to unit.
    pub fn block(mut body: Vec<Lowered>) -> Lowered {
        match body.len() {
            0 => Lowered::Unit,
            1 => body.pop().expect("length checked"),
            _ => Lowered::Block(body),
        }
    }

    pub fn cond(pred: Lowered, cons: Lowered, alt: Lowered) -> Lowered {
        Lowered::Cond {
            pred: Box::new(pred),
            cons: Box::new(cons),
            alt: Box::new(alt),
        }
    }

    pub fn define(name: impl Into<String>, value: Lowered) -> Lowered {
        Lowered::Define {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn function(param: impl Into<String>, body: Lowered) -> Lowered {
        Lowered::Function {
            param: param.into(),
            body: Box::new(body),
        }
    }

    pub fn pair(first: Lowered, second: Lowered) -> Lowered {
        Lowered::Pair {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn name(name: impl Into<String>) -> Lowered {
        Lowered::Name(name.into())
    }

    pub fn int(value: i64) -> Lowered {
        Lowered::Scalar(ScalarValue::Int(value))
    }

    pub fn bool(value: bool) -> Lowered {
        Lowered::Scalar(ScalarValue::Bool(value))
    }

    pub fn native(op: NativeOp, left: Lowered, right: Option<Lowered>) -> Lowered {
        Lowered::NativeOp {
            op,
            left: Box::new(left),
            right: right.map(Box::new),
        }
    }
}
