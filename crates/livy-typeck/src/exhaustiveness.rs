//! Refutable-pattern rejection.
//!
//! Definition targets and function parameters must always match;
//! a `match` must cover every value its subject type admits. Patterns
//! are checked structurally: free names and unit always match, pairs of
//! irrefutable parts match, and a bare `..rest` list pattern matches any
//! list. Everything else can fail, and is rejected when it appears in a
//! position that demands totality.

use std::fmt;

use livy_common::diag::Diagnostic;
use livy_common::span::Span;
use livy_parser::ast::{Pattern, PatternKind};
use livy_parser::types::Type;

use crate::typed::{TypedExpr, TypedExprKind, TypedMatchCase};

/// Where a refutable pattern was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternPosition {
    Case,
    Parameter,
    Target,
}

/// The error raised when a pattern match can fail where it must not.
#[derive(Debug, Clone, PartialEq)]
pub struct RefutablePatternError {
    pub position: PatternPosition,
    pub span: Span,
    /// `None` marks a match expression with no cases at all.
    pub offender: Option<Pattern>,
}

impl RefutablePatternError {
    fn refutable(position: PatternPosition, offender: &Pattern) -> Self {
        RefutablePatternError {
            position,
            span: offender.span,
            offender: Some(offender.clone()),
        }
    }

    /// A `match` with no cases over an inhabited subject type.
    pub fn empty_match(span: Span) -> Self {
        RefutablePatternError {
            position: PatternPosition::Case,
            span,
            offender: None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match (&self.offender, self.position) {
            (None, _) => "this match expression has no cases".to_owned(),
            (Some(_), PatternPosition::Target) => {
                "the pattern of a definition must always match".to_owned()
            }
            (Some(_), PatternPosition::Parameter) => {
                "a function parameter pattern must always match".to_owned()
            }
            (Some(_), PatternPosition::Case) => {
                "this match does not cover every possible value".to_owned()
            }
        };
        Diagnostic::new("refutable_pattern", message).with_span(self.span)
    }
}

impl fmt::Display for RefutablePatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offender {
            Some(_) => write!(f, "refutable pattern in a position that must always match"),
            None => write!(f, "match expression with no cases"),
        }
    }
}

impl std::error::Error for RefutablePatternError {}

/// Walk the typed tree and reject partial pattern matches.
pub fn check_exhaustiveness(tree: &TypedExpr) -> Result<(), RefutablePatternError> {
    match &tree.kind {
        TypedExprKind::Apply { func, arg } => {
            check_exhaustiveness(func)?;
            check_exhaustiveness(arg)
        }
        TypedExprKind::Block(body) => body.iter().try_for_each(check_exhaustiveness),
        TypedExprKind::Cond { pred, cons, alt } => {
            check_exhaustiveness(pred)?;
            check_exhaustiveness(cons)?;
            check_exhaustiveness(alt)
        }
        TypedExprKind::Define { target, value } => {
            if let Some(offender) = non_exhaustive(target) {
                return Err(RefutablePatternError::refutable(
                    PatternPosition::Target,
                    offender,
                ));
            }
            check_exhaustiveness(value)
        }
        TypedExprKind::Function { param, body } => {
            if let Some(offender) = non_exhaustive(param) {
                return Err(RefutablePatternError::refutable(
                    PatternPosition::Parameter,
                    offender,
                ));
            }
            check_exhaustiveness(body)
        }
        TypedExprKind::List(elems) => elems.iter().try_for_each(check_exhaustiveness),
        TypedExprKind::Match { subject, cases } => {
            check_exhaustiveness(subject)?;
            check_match(tree.span, subject, cases)
        }
        TypedExprKind::Pair { first, second } => {
            check_exhaustiveness(first)?;
            check_exhaustiveness(second)
        }
        TypedExprKind::Name(_)
        | TypedExprKind::Scalar(_)
        | TypedExprKind::Unit
        | TypedExprKind::Annotation { .. } => Ok(()),
    }
}

fn check_match(
    span: Span,
    subject: &TypedExpr,
    cases: &[TypedMatchCase],
) -> Result<(), RefutablePatternError> {
    if cases.is_empty() {
        if is_never(&subject.ty) {
            return Ok(());
        }
        return Err(RefutablePatternError::empty_match(span));
    }

    for case in cases {
        check_exhaustiveness(&case.body)?;
    }

    if is_list(&subject.ty) {
        return check_list_match(cases);
    }

    let last = &cases[cases.len() - 1];
    if let Some(offender) = non_exhaustive(&last.pattern) {
        return Err(RefutablePatternError::refutable(
            PatternPosition::Case,
            offender,
        ));
    }
    Ok(())
}

/// Coverage rule for list subjects: the cases are complete once they
/// include both the empty list and an unknown-length (`..rest`) case,
/// or any case that matches everything.
fn check_list_match(cases: &[TypedMatchCase]) -> Result<(), RefutablePatternError> {
    let mut empty_case = false;
    let mut unknown_length_case = false;
    for case in cases {
        if let PatternKind::List { initials, rest } = &case.pattern.kind {
            if initials.is_empty() && rest.is_none() {
                empty_case = true;
            }
            if rest.is_some() {
                unknown_length_case = true;
            }
        }
        if non_exhaustive(&case.pattern).is_none() || (empty_case && unknown_length_case) {
            return Ok(());
        }
    }
    Err(RefutablePatternError::refutable(
        PatternPosition::Case,
        &cases[0].pattern,
    ))
}

/// The smallest sub-pattern that can fail to match, or `None` when the
/// pattern is irrefutable.
pub fn non_exhaustive(pattern: &Pattern) -> Option<&Pattern> {
    match &pattern.kind {
        PatternKind::FreeName(_) | PatternKind::Unit => None,
        PatternKind::Pair { first, second } => {
            non_exhaustive(first).or_else(|| non_exhaustive(second))
        }
        PatternKind::List { initials, rest } if initials.is_empty() && rest.is_some() => None,
        PatternKind::PinnedName(_) | PatternKind::Scalar(_) | PatternKind::List { .. } => {
            Some(pattern)
        }
    }
}

fn is_list(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Apply { caller, .. }
            if matches!(caller.as_ref(), Type::Name { name, .. } if name == "List")
    )
}

fn is_never(ty: &Type) -> bool {
    matches!(ty, Type::Name { name, .. } if name == "Never")
}

#[cfg(test)]
mod tests {
    use super::*;
    use livy_parser::ast::ScalarValue;

    fn pat(kind: PatternKind) -> Pattern {
        Pattern::new(Span::zero(), kind)
    }

    fn free(name: &str) -> Pattern {
        pat(PatternKind::FreeName(name.into()))
    }

    #[test]
    fn names_unit_and_rest_lists_are_irrefutable() {
        assert!(non_exhaustive(&free("x")).is_none());
        assert!(non_exhaustive(&free("_")).is_none());
        assert!(non_exhaustive(&pat(PatternKind::Unit)).is_none());
        assert!(non_exhaustive(&pat(PatternKind::List {
            initials: vec![],
            rest: Some(livy_parser::ast::RestName {
                span: Span::zero(),
                name: "xs".into(),
            }),
        }))
        .is_none());
    }

    #[test]
    fn scalars_pins_and_sized_lists_are_refutable() {
        assert!(non_exhaustive(&pat(PatternKind::Scalar(ScalarValue::Int(0)))).is_some());
        assert!(non_exhaustive(&pat(PatternKind::PinnedName("x".into()))).is_some());
        assert!(non_exhaustive(&pat(PatternKind::List {
            initials: vec![free("y")],
            rest: None,
        }))
        .is_some());
    }

    #[test]
    fn pair_reports_the_offending_side() {
        let pattern = pat(PatternKind::Pair {
            first: Box::new(free("a")),
            second: Box::new(pat(PatternKind::Scalar(ScalarValue::Bool(true)))),
        });
        let offender = non_exhaustive(&pattern).expect("pair should be refutable");
        assert!(matches!(offender.kind, PatternKind::Scalar(_)));
    }

    #[test]
    fn pair_of_irrefutable_parts_is_irrefutable() {
        let pattern = pat(PatternKind::Pair {
            first: Box::new(free("a")),
            second: Box::new(free("b")),
        });
        assert!(non_exhaustive(&pattern).is_none());
    }
}
