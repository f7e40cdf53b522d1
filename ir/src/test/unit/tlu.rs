use test_case::test_case;
use veil_dtype::DType;

use crate::{
    Data, Error, FunctionKind, GenericFunction, IntermediateNode, TableConfig, Value, flood_fill,
    error::EvaluationSnafu,
    node::element_fn,
    tlu::MAX_TABLE_BIT_WIDTH,
};

#[test]
fn test_single_seed_fills_everything() {
    let mut table: Vec<Option<char>> = vec![None; 8];
    table[0] = Some('A');

    assert_eq!(flood_fill(&mut table), Some(7));
    assert!(table.iter().all(|entry| *entry == Some('A')));
}

#[test]
fn test_two_seeds_meet_in_the_middle() {
    let mut table: Vec<Option<char>> = vec![None; 8];
    table[0] = Some('A');
    table[7] = Some('B');

    assert_eq!(flood_fill(&mut table), Some(6));
    let filled: String = table.into_iter().flatten().collect();
    assert_eq!(filled, "AAAABBBB");
}

#[test]
fn test_tie_goes_to_lower_seed() {
    // Index 2 is equidistant from both seeds.
    let mut table = vec![Some(1), None, None, None, Some(5)];
    flood_fill(&mut table);
    assert_eq!(table, vec![Some(1), Some(1), Some(1), Some(5), Some(5)]);
}

#[test]
fn test_empty_domain() {
    let mut table: Vec<Option<i64>> = vec![None; 8];
    assert_eq!(flood_fill(&mut table), None);
    assert!(table.iter().all(Option::is_none));
}

#[test]
fn test_nothing_to_repair() {
    let mut table = vec![Some(3), Some(1)];
    assert_eq!(flood_fill(&mut table), Some(0));
}

/// Function defined only on the listed inputs.
fn partial(defined: &'static [(i64, i64)]) -> GenericFunction {
    GenericFunction::builder()
        .name("partial")
        .kind(FunctionKind::Tlu)
        .func(element_fn(move |input, _| {
            let value = input.as_int().unwrap_or(-1);
            match defined.iter().find(|(at, _)| *at == value) {
                Some((_, output)) => Ok(Data::int(*output)),
                None => EvaluationSnafu { node: "partial", reason: "undefined" }.fail(),
            }
        }))
        .output(Value::encrypted_scalar(DType::unsigned(4)))
        .build()
}

#[test_case(false; "sequential")]
#[test_case(true; "parallel")]
fn test_table_repairs_gaps(parallel: bool) {
    let function = partial(&[(0, 10), (7, 11)]);
    let config = TableConfig::builder().parallel(parallel).build();

    let table = function.table(&Value::encrypted_scalar(DType::unsigned(3)), &config).unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(table.repaired(), 6);
    assert_eq!(table.get(3), Some(&Data::int(10)));
    assert_eq!(table.get(4), Some(&Data::int(11)));
}

#[test]
fn test_table_of_total_function() {
    let square = GenericFunction::builder()
        .name("square")
        .kind(FunctionKind::Tlu)
        .func(element_fn(|input, _| input.mul(input)))
        .output(Value::encrypted_scalar(DType::unsigned(4)))
        .build();

    let table = square.table(&Value::encrypted_scalar(DType::unsigned(2)), &TableConfig::default()).unwrap();
    assert_eq!(table.entries(), &[Data::int(0), Data::int(1), Data::int(4), Data::int(9)]);
    assert_eq!(table.repaired(), 0);
}

#[test]
fn test_non_finite_results_are_undefined() {
    let reciprocal = GenericFunction::builder()
        .name("reciprocal")
        .kind(FunctionKind::Tlu)
        .func(element_fn(|input, _| Ok(input.map_float(|v| 1.0 / v))))
        .output(Value::encrypted_scalar(DType::float64()))
        .build();

    let table = reciprocal.table(&Value::encrypted_scalar(DType::unsigned(2)), &TableConfig::default()).unwrap();
    assert_eq!(table.repaired(), 1);
    assert_eq!(table.get(0), Some(&Data::float(1.0)));
}

#[test]
fn test_undefined_everywhere() {
    let function = partial(&[]);
    let result = function.table(&Value::encrypted_scalar(DType::unsigned(3)), &TableConfig::default());
    assert!(matches!(result, Err(Error::EmptyDomain { .. })));
}

#[test]
fn test_table_limits() {
    let function = partial(&[(0, 1)]);
    let config = TableConfig::builder().max_bit_width(4).build();

    let wide = function.table(&Value::encrypted_scalar(DType::unsigned(5)), &config);
    assert_eq!(wide.unwrap_err(), Error::TableTooLarge { bit_width: 5, max_bit_width: 4 });

    let signed = function.table(&Value::encrypted_scalar(DType::signed(3)), &config);
    assert!(matches!(signed, Err(Error::TableUnsupported { .. })));
}

#[test_case(64 ; "full machine width")]
#[test_case(40 ; "above the hard ceiling")]
fn test_configured_limit_is_capped(bit_width: u32) {
    let function = partial(&[(0, 1)]);
    let config = TableConfig::builder().max_bit_width(64).build();

    let result = function.table(&Value::encrypted_scalar(DType::unsigned(bit_width)), &config);
    assert_eq!(result.unwrap_err(), Error::TableTooLarge { bit_width, max_bit_width: MAX_TABLE_BIT_WIDTH });
}

#[test]
fn test_table_on_non_function_node() {
    let node = IntermediateNode::constant(Data::int(1)).unwrap();
    assert!(matches!(node.table(&TableConfig::default()), Err(Error::TableUnsupported { .. })));
}

#[test]
fn test_config_defaults() {
    assert_eq!(TableConfig::builder().build(), TableConfig::default());
    assert_eq!(TableConfig::default().max_bit_width, 16);
}
