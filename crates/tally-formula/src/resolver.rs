//! The boundary between the evaluator and whatever holds cell data

use crate::error::{ResolveError, ResolveResult};
use crate::value::Value;
use tally_core::{CellAddress, CellRange};

/// Supplies the values behind `[A1]` and `[A1:B2]` references
///
/// The evaluator hands over raw identifiers through [`decode_reference`]
/// and then asks for the decoded rectangle with [`evaluate_range`]. It never
/// keeps a resolver past the evaluation call it was given to.
///
/// [`decode_reference`]: CellResolver::decode_reference
/// [`evaluate_range`]: CellResolver::evaluate_range
pub trait CellResolver {
    /// Values of every cell in `range`, row by row
    ///
    /// Must return exactly `range.cell_count()` values. A range that cannot
    /// be fully resolved is a failure as a whole.
    fn evaluate_range(&mut self, range: CellRange) -> ResolveResult<Vec<Value>>;

    /// Turn the identifier written inside `[...]` into an address
    ///
    /// Defaults to A1 notation with an optional leading `.` and `$` markers.
    fn decode_reference(&self, reference: &str) -> ResolveResult<CellAddress> {
        Ok(CellAddress::parse(reference)?)
    }

    /// [`evaluate_range`] on behalf of an evaluator already `depth` operations
    /// deep, [`nesting_depth`] included
    ///
    /// Resolvers that evaluate formulas of their own report `depth` back
    /// through [`nesting_depth`] while they do, so the depth limit covers
    /// every nested evaluation on the stack.
    ///
    /// [`evaluate_range`]: CellResolver::evaluate_range
    /// [`nesting_depth`]: CellResolver::nesting_depth
    fn evaluate_range_at(&mut self, range: CellRange, depth: usize) -> ResolveResult<Vec<Value>> {
        let _ = depth;
        self.evaluate_range(range)
    }

    /// Evaluation depth this resolver is currently nested in
    ///
    /// Added to the evaluator's own depth when checking the depth limit.
    fn nesting_depth(&self) -> usize {
        0
    }
}

/// Resolver for formulas that are not attached to any cell data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCells;

impl CellResolver for NoCells {
    fn evaluate_range(&mut self, range: CellRange) -> ResolveResult<Vec<Value>> {
        Err(ResolveError::Unavailable(format!(
            "cannot look up {} without cell data",
            range
        )))
    }
}

impl<F> CellResolver for F
where
    F: FnMut(CellRange) -> ResolveResult<Vec<Value>>,
{
    fn evaluate_range(&mut self, range: CellRange) -> ResolveResult<Vec<Value>> {
        self(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decoding() {
        let resolver = NoCells;
        assert_eq!(
            resolver.decode_reference(".$B$3").unwrap(),
            CellAddress::new(2, 1)
        );
        assert!(matches!(
            resolver.decode_reference("3B"),
            Err(ResolveError::Address(_))
        ));
    }

    #[test]
    fn test_no_cells_fails() {
        let err = NoCells
            .evaluate_range(CellRange::parse("A1:A2").unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("A1:A2"));
    }

    #[test]
    fn test_closure_resolver() {
        let mut calls = 0;
        let mut resolver = |range: CellRange| -> ResolveResult<Vec<Value>> {
            calls += 1;
            Ok(vec![Value::Integer(1); range.cell_count() as usize])
        };
        let values = resolver
            .evaluate_range(CellRange::parse("A1:B2").unwrap())
            .unwrap();
        assert_eq!(values.len(), 4);
        let values = resolver
            .evaluate_range_at(CellRange::parse("A1").unwrap(), 10)
            .unwrap();
        assert_eq!(values, vec![Value::Integer(1)]);
        assert_eq!(resolver.nesting_depth(), 0);
        drop(resolver);
        assert_eq!(calls, 2);
    }
}
