//! In-memory cell grid backing formula references
//!
//! A [`Sheet`] holds literal values and formula text. Its
//! [`SheetResolver`] answers range lookups for the evaluator, computing
//! formula cells on demand with the resolver itself so that formulas can
//! refer to other formulas.

use crate::error::{ResolveError, ResolveResult};
use crate::evaluator::{evaluate_with_options, EvaluationOptions};
use crate::parser::compile;
use crate::resolver::CellResolver;
use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use tally_core::{CellAddress, CellRange};

/// What a cell holds before evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Value(Value),
    /// Formula text without its leading `=` or `of:=`
    Formula(String),
}

/// Strip the `of:=` or `=` marker from formula text
pub fn formula_body(text: &str) -> Option<&str> {
    text.strip_prefix("of:=").or_else(|| text.strip_prefix('='))
}

/// Counts reported by [`Sheet::resolve_formulas`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolved: usize,
    pub failed: usize,
}

/// A sparse grid of cells
///
/// The used extent grows to cover every cell ever set; lookups beyond it
/// fail instead of returning Empty.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    cells: AHashMap<CellAddress, CellContent>,
    /// One past the last used row and column
    rows: u32,
    cols: u32,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, addr: CellAddress, value: impl Into<Value>) {
        self.insert(addr, CellContent::Value(value.into()));
    }

    /// Store a formula; a leading `=` or `of:=` is dropped
    pub fn set_formula(&mut self, addr: CellAddress, formula: &str) {
        let body = formula_body(formula).unwrap_or(formula);
        self.insert(addr, CellContent::Formula(body.to_string()));
    }

    /// Set a cell from A1 notation
    pub fn set(&mut self, reference: &str, content: CellContent) -> tally_core::Result<()> {
        let addr = CellAddress::parse(reference)?;
        self.insert(addr, content);
        Ok(())
    }

    /// Set a cell from user input text
    ///
    /// `=...` and `of:=...` are formulas, `"..."` is literal text, empty
    /// input is an empty cell and anything else is typed like cell text.
    pub fn set_input(&mut self, reference: &str, input: &str) -> tally_core::Result<()> {
        let content = if let Some(body) = formula_body(input) {
            CellContent::Formula(body.to_string())
        } else if input.is_empty() {
            CellContent::Value(Value::Empty)
        } else if let Some(quoted) = input
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            CellContent::Value(Value::from(quoted))
        } else {
            CellContent::Value(Value::from_cell_text(input))
        };
        self.set(reference, content)
    }

    fn insert(&mut self, addr: CellAddress, content: CellContent) {
        self.rows = self.rows.max(addr.row + 1);
        self.cols = self.cols.max(u32::from(addr.col) + 1);
        self.cells.insert(addr, content);
    }

    pub fn get(&self, addr: CellAddress) -> Option<&CellContent> {
        self.cells.get(&addr)
    }

    /// Used rows and columns
    pub fn extent(&self) -> (u32, u32) {
        (self.rows, self.cols)
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        addr.row < self.rows && u32::from(addr.col) < self.cols
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn resolver(&self) -> SheetResolver<'_> {
        self.resolver_with_options(EvaluationOptions::default())
    }

    pub fn resolver_with_options(&self, options: EvaluationOptions) -> SheetResolver<'_> {
        SheetResolver {
            sheet: self,
            options,
            visiting: AHashSet::new(),
            computed: AHashMap::new(),
            depth: 0,
        }
    }

    /// Value of one cell, computing it if it holds a formula
    pub fn evaluate_cell(&self, addr: CellAddress) -> ResolveResult<Value> {
        self.resolver().value_at(addr)
    }

    /// Replace every formula cell with its value
    ///
    /// Cells whose formula fails are logged and left as formulas.
    pub fn resolve_formulas(&mut self) -> ResolveStats {
        let mut formulas: Vec<CellAddress> = self
            .cells
            .iter()
            .filter(|(_, content)| matches!(content, CellContent::Formula(_)))
            .map(|(addr, _)| *addr)
            .collect();
        formulas.sort_unstable();

        let mut stats = ResolveStats::default();
        let mut values = Vec::with_capacity(formulas.len());
        {
            let mut resolver = self.resolver();
            for addr in formulas {
                match resolver.value_at(addr) {
                    Ok(value) => values.push((addr, value)),
                    Err(e) => {
                        log::warn!("Leaving formula in {addr} unresolved: {e}");
                        stats.failed += 1;
                    }
                }
            }
        }

        stats.resolved = values.len();
        for (addr, value) in values {
            self.cells.insert(addr, CellContent::Value(value));
        }
        log::debug!(
            "Resolved {} formula cells, {} failed",
            stats.resolved,
            stats.failed
        );
        stats
    }
}

/// [`CellResolver`] over a [`Sheet`]
///
/// Formula results are cached for the lifetime of the resolver. A formula
/// that reaches back into a cell still being computed fails with
/// [`ResolveError::Circular`]. Nested formula cells share one depth budget
/// with the evaluators above them.
pub struct SheetResolver<'s> {
    sheet: &'s Sheet,
    options: EvaluationOptions,
    visiting: AHashSet<CellAddress>,
    computed: AHashMap<CellAddress, Value>,
    /// Evaluation depth of the caller currently waiting on this resolver
    depth: usize,
}

impl SheetResolver<'_> {
    /// Value of one cell
    pub fn value_at(&mut self, addr: CellAddress) -> ResolveResult<Value> {
        if !self.sheet.contains(addr) {
            return Err(ResolveError::OutOfBounds(addr));
        }

        let sheet = self.sheet;
        match sheet.get(addr) {
            None => Ok(Value::Empty),
            Some(CellContent::Value(Value::String(s))) => Ok(Value::from_cell_text(s)),
            Some(CellContent::Value(value)) => Ok(value.clone()),
            Some(CellContent::Formula(formula)) => self.formula_value(addr, formula),
        }
    }

    fn formula_value(&mut self, addr: CellAddress, formula: &str) -> ResolveResult<Value> {
        if let Some(value) = self.computed.get(&addr) {
            return Ok(value.clone());
        }
        if self.visiting.contains(&addr) {
            return Err(ResolveError::Circular(addr));
        }
        if self.depth >= self.options.max_depth {
            return Err(ResolveError::TooDeep(self.options.max_depth));
        }

        let ast = compile(formula).map_err(|e| ResolveError::Formula {
            cell: addr,
            reason: e.to_string(),
        })?;

        let options = self.options;
        self.visiting.insert(addr);
        self.depth += 1;
        let result = evaluate_with_options(&ast, self, options);
        self.depth -= 1;
        self.visiting.remove(&addr);

        match result {
            Ok(value) => {
                log::trace!("{addr} = {value:?}");
                self.computed.insert(addr, value.clone());
                Ok(value)
            }
            Err(e) => {
                log::debug!("Formula in {addr} failed: {e}");
                Err(ResolveError::Formula {
                    cell: addr,
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl CellResolver for SheetResolver<'_> {
    fn evaluate_range(&mut self, range: CellRange) -> ResolveResult<Vec<Value>> {
        for corner in [range.start, range.end] {
            if !self.sheet.contains(corner) {
                return Err(ResolveError::OutOfBounds(corner));
            }
        }
        range.cells().map(|addr| self.value_at(addr)).collect()
    }

    fn evaluate_range_at(&mut self, range: CellRange, depth: usize) -> ResolveResult<Vec<Value>> {
        let outer = std::mem::replace(&mut self.depth, depth);
        let result = self.evaluate_range(range);
        self.depth = outer;
        result
    }

    fn nesting_depth(&self) -> usize {
        self.depth
    }
}
