//! The built-in library exercised through compiled expressions, receiver
//! calls included.

use celvm::{
    CelType, CelValue, Constant, ErrorKind, Expr, ExprBuilder, ExprKind, FunctionRegistry,
    VariableActivation,
    builtins::{
        self, DURATION, FULL_YEAR, IN, INDEX, MATCHES, MILLISECONDS, MINUTES, MONTH, SIZE,
        TIMESTAMP,
    },
    register_builtin_functions,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

fn eval(expr: &Expr) -> CelValue {
    let mut registry = FunctionRegistry::new();
    register_builtin_functions(&mut registry).unwrap();
    ExprBuilder::new(registry)
        .build(expr)
        .unwrap()
        .evaluate(&VariableActivation::new())
        .unwrap()
}

#[test]
fn size_in_global_and_receiver_form() {
    let global = Expr::global_call(2, SIZE, vec![Expr::const_string(1, "abcd")]);
    assert_eq!(eval(&global), CelValue::Int(4));

    let receiver = Expr::member_call(2, Expr::const_string(1, "abcd"), SIZE, vec![]);
    assert_eq!(eval(&receiver), CelValue::Int(4));

    let list = Expr::list(1, vec![Expr::const_int(2, 1), Expr::const_int(3, 2)]);
    let receiver = Expr::member_call(4, list, SIZE, vec![]);
    assert_eq!(eval(&receiver), CelValue::Int(2));
}

#[test]
fn list_indexing_chains() {
    // [[1, 2], [3]][0][1]
    let nested = Expr::list(
        1,
        vec![
            Expr::list(2, vec![Expr::const_int(3, 1), Expr::const_int(4, 2)]),
            Expr::list(5, vec![Expr::const_int(6, 3)]),
        ],
    );
    let expr = Expr::global_call(
        9,
        INDEX,
        vec![
            Expr::global_call(7, INDEX, vec![nested, Expr::const_int(8, 0)]),
            Expr::const_int(10, 1),
        ],
    );
    assert_eq!(eval(&expr), CelValue::Int(2));
}

#[test]
fn map_indexing_by_mixed_key_types() {
    let map = Expr::map(
        1,
        vec![
            (Expr::const_int(2, 1), Expr::const_string(3, "int key")),
            (Expr::const_string(4, "s"), Expr::const_string(5, "string key")),
        ],
    );
    let by_int = Expr::global_call(6, INDEX, vec![map.clone(), Expr::const_int(7, 1)]);
    assert_eq!(eval(&by_int), CelValue::string("int key"));

    let by_string = Expr::global_call(6, INDEX, vec![map, Expr::const_string(7, "s")]);
    assert_eq!(eval(&by_string), CelValue::string("string key"));
}

#[test]
fn membership_over_lists_and_maps() {
    let list = Expr::list(1, vec![Expr::const_int(2, 1), Expr::const_int(3, 2)]);
    let expr = Expr::global_call(4, IN, vec![Expr::const_int(5, 2), list]);
    assert_eq!(eval(&expr), CelValue::Bool(true));

    let map = Expr::map(1, vec![(Expr::const_string(2, "k"), Expr::const_int(3, 9))]);
    let expr = Expr::global_call(4, IN, vec![Expr::const_string(5, "missing"), map]);
    assert_eq!(eval(&expr), CelValue::Bool(false));
}

#[test]
fn matches_as_a_receiver_call() {
    let expr = Expr::member_call(
        3,
        Expr::const_string(1, "cel-rocks"),
        MATCHES,
        vec![Expr::const_string(2, "cel.*")],
    );
    assert_eq!(eval(&expr), CelValue::Bool(true));

    let expr = Expr::member_call(
        3,
        Expr::const_string(1, "cel-rocks"),
        MATCHES,
        vec![Expr::const_string(2, "rocks")],
    );
    assert_eq!(eval(&expr), CelValue::Bool(false));
}

#[test]
fn timestamp_conversion_feeds_accessors() {
    // timestamp("2009-02-13T23:31:30Z").getFullYear()
    let ts = Expr::global_call(
        2,
        TIMESTAMP,
        vec![Expr::const_string(1, "2009-02-13T23:31:30Z")],
    );
    let expr = Expr::member_call(3, ts.clone(), FULL_YEAR, vec![]);
    assert_eq!(eval(&expr), CelValue::Int(2009));

    // Zero-based month, in an explicit zone west of UTC.
    let expr = Expr::member_call(
        3,
        ts,
        MONTH,
        vec![Expr::const_string(4, "America/New_York")],
    );
    assert_eq!(eval(&expr), CelValue::Int(1));
}

#[test]
fn duration_conversion_feeds_accessors() {
    let duration = Expr::global_call(2, DURATION, vec![Expr::const_string(1, "90.250s")]);
    let expr = Expr::member_call(3, duration.clone(), MINUTES, vec![]);
    assert_eq!(eval(&expr), CelValue::Int(1));

    let expr = Expr::member_call(3, duration, MILLISECONDS, vec![]);
    assert_eq!(eval(&expr), CelValue::Int(250));
}

#[test]
fn timestamp_constants_evaluate_directly() {
    let instant = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
    let expr = Expr::member_call(
        2,
        Expr::new(1, ExprKind::Const(Constant::Timestamp(instant))),
        builtins::DATE,
        vec![],
    );
    assert_eq!(eval(&expr), CelValue::Int(1));
}

#[test]
fn arithmetic_over_mixed_expressions() {
    // (2 + 3) * 4 % 7
    let sum = Expr::global_call(
        3,
        builtins::ADD,
        vec![Expr::const_int(1, 2), Expr::const_int(2, 3)],
    );
    let product = Expr::global_call(5, builtins::MULTIPLY, vec![sum, Expr::const_int(4, 4)]);
    let expr = Expr::global_call(7, builtins::MODULO, vec![product, Expr::const_int(6, 7)]);
    assert_eq!(eval(&expr), CelValue::Int(6));
}

#[test]
fn cross_type_equality_is_a_typed_error() {
    let expr = Expr::global_call(
        3,
        builtins::EQUAL,
        vec![Expr::const_int(1, 1), Expr::const_string(2, "1")],
    );
    let CelValue::Error(err) = eval(&expr) else { panic!("expected error value") };
    assert_eq!(err.kind(), ErrorKind::NoMatchingOverload);
}

#[test]
fn selecting_from_scalars_is_invalid_argument() {
    let expr = Expr::select(2, Expr::const_int(1, 7), "field");
    let CelValue::Error(err) = eval(&expr) else { panic!("expected error value") };
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn map_literals_select_like_structs() {
    // {"k": 5}.k
    let map = Expr::map(1, vec![(Expr::const_string(2, "k"), Expr::const_int(3, 5))]);
    let expr = Expr::select(4, map.clone(), "k");
    assert_eq!(eval(&expr), CelValue::Int(5));

    let expr = Expr::select(4, map, "other");
    let CelValue::Error(err) = eval(&expr) else { panic!("expected error value") };
    assert_eq!(err.kind(), ErrorKind::NoSuchKey);
}

#[test]
fn errors_escape_container_literals() {
    // [1, 1/0] evaluates to the division error, not a list holding it.
    let division = Expr::global_call(
        2,
        builtins::DIVIDE,
        vec![Expr::const_int(3, 1), Expr::const_int(4, 0)],
    );
    let expr = Expr::list(1, vec![Expr::const_int(5, 1), division.clone()]);
    let CelValue::Error(err) = eval(&expr) else { panic!("expected error value") };
    assert_eq!(err.message(), "Division by 0");

    let expr = Expr::map(1, vec![(Expr::const_string(5, "k"), division)]);
    assert!(eval(&expr).is_error());
}

#[test]
fn overload_lookup_matches_call_shapes() {
    let mut registry = FunctionRegistry::new();
    register_builtin_functions(&mut registry).unwrap();

    // Both styles of size, each over four container types.
    for receiver_style in [true, false] {
        for tag in [CelType::String, CelType::Bytes, CelType::List, CelType::Map] {
            assert_eq!(registry.find_overloads(SIZE, receiver_style, &[tag]).len(), 1);
        }
    }
    assert!(registry.find_overloads(SIZE, false, &[CelType::Int]).is_empty());
    assert!(
        registry
            .find_overloads(MATCHES, true, &[CelType::String, CelType::String])
            .len()
            == 1
    );
}
