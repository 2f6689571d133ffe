//! Tests for compiling and evaluating formulas against sheet data

use pretty_assertions::assert_eq;
use tally_formula::{
    calculate, compile, evaluate, AstNode, CellAddress, CellRange, CellResolver, EvalError,
    FormulaError, NoCells, OperatorKind, ResolveError, ResolveResult, Sheet, Value,
};

fn sales_sheet() -> Sheet {
    let mut sheet = Sheet::new();
    for (cell, input) in [
        ("A1", "\"Region\""),
        ("A2", "\"North\""),
        ("A3", "\"South\""),
        ("A4", "\"East\""),
        ("B1", "\"Units\""),
        ("B2", "120"),
        ("B3", "80.5"),
        ("B4", ""),
        ("C2", "=[B2]*2"),
        ("C3", "=[B3]*2"),
        ("C4", "of:=SUM([C2:C3])"),
    ] {
        sheet.set_input(cell, input).unwrap();
    }
    sheet
}

/// Test the examples every embedding relies on
#[test]
fn test_evaluate_simple_formulas() {
    let cases = [
        ("1+2*3", Value::Integer(7)),
        ("(1+2)*3", Value::Integer(9)),
        ("LEFT(\"hello\",3)", Value::from("hel")),
        ("LEN(\"hello\")", Value::Integer(5)),
        ("\"a\"&\"b\"", Value::from("ab")),
        ("IF(1>0,\"yes\",\"no\")", Value::from("yes")),
        ("IF(0,\"yes\")", Value::Empty),
        ("1<=2", Value::Integer(1)),
        ("1=<2", Value::Integer(1)),
        ("1<>2", Value::Integer(1)),
        ("1!=2", Value::Integer(1)),
    ];
    for (formula, expected) in cases {
        assert_eq!(calculate(formula, &mut NoCells), Ok(expected), "{}", formula);
    }
}

/// Unary minus on a literal leaves no MULTIPLY behind
#[test]
fn test_unary_minus_folds_at_compile_time() {
    let ast = compile("-5").unwrap();
    assert_eq!(ast, AstNode::constant(-5i64));
    assert_eq!(ast.dump(), "-5\n");
}

#[test]
fn test_sum_and_count_with_resolver() {
    let mut resolver = |range: CellRange| -> ResolveResult<Vec<Value>> {
        assert_eq!(range, CellRange::parse("A1:A3").unwrap());
        Ok(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
    };
    assert_eq!(calculate("SUM([A1:A3])", &mut resolver), Ok(Value::Float(6.0)));
    assert_eq!(calculate("COUNT([A1:A3])", &mut resolver), Ok(Value::Integer(3)));
}

#[test]
fn test_division_by_zero_is_an_error() {
    assert_eq!(
        calculate("1/0", &mut NoCells),
        Err(FormulaError::Eval(EvalError::DivisionByZero))
    );
}

#[test]
fn test_sheet_references() {
    let sheet = sales_sheet();
    let mut resolver = sheet.resolver();

    let check = |formula: &str, resolver: &mut dyn CellResolver| {
        let ast = compile(formula).unwrap();
        evaluate(&ast, resolver)
    };

    assert_eq!(check("[B2]+[B3]", &mut resolver), Ok(Value::Float(200.5)));
    assert_eq!(check("[C4]", &mut resolver), Ok(Value::Float(401.0)));
    assert_eq!(check("COUNTA([A1:B4])", &mut resolver), Ok(Value::Integer(7)));
    assert_eq!(check("COUNT([B1:B4])", &mut resolver), Ok(Value::Integer(2)));
    assert_eq!(check("AVERAGE([B1:B4])", &mut resolver), Ok(Value::Float(100.25)));
    assert_eq!(
        check("[A2]&\" sold \"&[B2]", &mut resolver),
        Ok(Value::from("North sold 120"))
    );
    assert_eq!(
        check("IF([B4]=0,\"missing\",\"ok\")", &mut resolver),
        Ok(Value::from("missing"))
    );
    assert_eq!(
        check("[D1]", &mut resolver),
        Err(EvalError::Resolve(ResolveError::OutOfBounds(
            CellAddress::new(0, 3)
        )))
    );
}

#[test]
fn test_fold_with_sheet() {
    let sheet = sales_sheet();
    let mut ast = compile("MAX([B2:B4])-MIN([B2:B4])").unwrap();
    assert_eq!(ast.op(), Some(OperatorKind::Subtract));

    ast.fold(&mut sheet.resolver()).unwrap();
    assert_eq!(ast.dump(), "39.5\n");
}

#[test]
fn test_resolve_whole_sheet() {
    let mut sheet = sales_sheet();
    sheet.set_input("D1", "=[D1]+1").unwrap();

    let stats = sheet.resolve_formulas();
    assert_eq!((stats.resolved, stats.failed), (3, 1));
    assert_eq!(
        sheet.evaluate_cell(CellAddress::parse("C4").unwrap()),
        Ok(Value::Float(401.0))
    );
}

#[test]
fn test_deeply_nested_formula_fails_cleanly() {
    let formula = format!("{}1{}", "ABS(".repeat(300), ")".repeat(300));
    assert!(compile(&formula).is_err());

    let formula = format!("{}1{}", "ABS(".repeat(200), ")".repeat(200));
    assert_eq!(calculate(&formula, &mut NoCells), Ok(Value::Float(1.0)));
}

#[test]
fn test_long_operator_chain_is_checked_at_compile() {
    let formula = vec!["1"; 300].join("+");
    assert!(matches!(
        calculate(&formula, &mut NoCells),
        Err(FormulaError::Syntax(_))
    ));

    let formula = vec!["1"; 250].join("+");
    assert_eq!(calculate(&formula, &mut NoCells), Ok(Value::Integer(250)));
}

#[test]
fn test_chained_formula_cells_fail_cleanly() {
    let mut sheet = Sheet::new();
    let tail = "+1".repeat(128);
    for row in 1..=140 {
        sheet
            .set_input(&format!("A{}", row), &format!("=[A{}]{}", row + 1, tail))
            .unwrap();
    }
    sheet.set_input("A141", "1").unwrap();

    let ast = compile("[A1]").unwrap();
    assert!(evaluate(&ast, &mut sheet.resolver()).is_err());
    assert!(sheet.evaluate_cell(CellAddress::new(0, 0)).is_err());
}
