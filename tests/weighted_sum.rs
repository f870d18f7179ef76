// tests/weighted_sum.rs

use treeargs::{Cli, CliError, Value, ValueType};

fn float(values: &[Option<Value>], index: usize, missing: f64) -> f64 {
    values
        .get(index)
        .cloned()
        .flatten()
        .and_then(|v| v.as_float())
        .unwrap_or(missing)
}

// `sum a [c] b [d] mult...` computes (a*c + b*d) * product(mult), with the weights
// c and d defaulting to 1.
fn calculator() -> Cli {
    let mut cli = Cli::new();
    let sum = cli.root_mut().add_node("sum").unwrap();
    for name in ["a", "b", "c", "d", "mult"] {
        sum.add_param(name).unwrap().set_type(ValueType::Float);
    }
    sum.get_param("c").unwrap().set_default(1.0);
    sum.get_param("d").unwrap().set_default(1.0);
    let mult = sum.get_param("mult").unwrap();
    mult.to_list();
    mult.set_default(vec![1.0]);

    sum.set_params_order("a mult").unwrap();
    sum.set_params_order("a c b d mult").unwrap();
    sum.set_default_order(&["c", "d"], Vec::new()).unwrap();

    sum.add_action(|values| {
        let (a, b) = (float(values, 0, 0.0), float(values, 1, 0.0));
        let (c, d) = (float(values, 2, 1.0), float(values, 3, 1.0));
        let factor: f64 = values
            .get(4)
            .cloned()
            .flatten()
            .map(|v| v.to_list().iter().filter_map(Value::as_float).product())
            .unwrap_or(1.0);
        Ok(Some(Value::Float((a * c + b * d) * factor)))
    });
    cli
}

#[test]
fn test_exact_template_needs_no_skip() {
    let mut cli = calculator();
    let result = cli.parse_line("sum 7 2").unwrap();
    assert_eq!(result.get("a").unwrap(), Some(Value::Float(7.0)));
    assert_eq!(result.get("mult").unwrap(), Some(Value::Float(2.0)));
    assert_eq!(result.get("b").unwrap(), None);
    assert_eq!(result.result(), Some(&Value::Float(14.0)));
}

#[test]
fn test_missing_arity_skips_by_default_order() {
    let mut cli = calculator();
    // Four tokens: the five-name template is used and `c` is skipped.
    let result = cli.parse_line("sum 7 3 0.5 2").unwrap();
    assert_eq!(result.get("c").unwrap(), Some(Value::Float(1.0)));
    assert_eq!(result.get("b").unwrap(), Some(Value::Float(3.0)));
    assert_eq!(result.get("d").unwrap(), Some(Value::Float(0.5)));
    assert_eq!(result.result(), Some(&Value::Float(17.0)));
}

#[test]
fn test_three_arguments_skip_both_weights() {
    let mut cli = calculator();
    // Only the two- and five-name templates exist, so three arguments use the
    // five-name one with both weights left at their defaults.
    let result = cli.parse_line("sum 7 3 2").unwrap();
    assert_eq!(result.get("a").unwrap(), Some(Value::Float(7.0)));
    assert_eq!(result.get("b").unwrap(), Some(Value::Float(3.0)));
    assert_eq!(result.get("mult").unwrap(), Some(Value::Float(2.0)));
    assert_eq!(result.get("c").unwrap(), Some(Value::Float(1.0)));
    assert_eq!(result.get("d").unwrap(), Some(Value::Float(1.0)));
    assert_eq!(result.result(), Some(&Value::Float(20.0)));
}

#[test]
fn test_overflow_goes_to_the_last_parameter() {
    let mut cli = calculator();
    let result = cli.parse_line("sum 7 2 3 4 0.5 3").unwrap();
    assert_eq!(
        result.get("mult").unwrap(),
        Some(Value::from(vec![0.5, 3.0]))
    );
    assert_eq!(result.result(), Some(&Value::Float(39.0)));
}

#[test]
fn test_results_are_independent_after_reset() {
    let mut cli = calculator();
    let first = cli.parse_line("sum 7 3 2").unwrap().result().cloned();
    assert_eq!(first, Some(Value::Float(20.0)));
    cli.reset();
    let second = cli.parse_line("sum 1 1 1").unwrap().result().cloned();
    assert_eq!(second, Some(Value::Float(2.0)));
}

#[test]
fn test_bad_number_is_rejected() {
    let mut cli = calculator();
    let err = cli.parse_line("sum seven 2").unwrap_err();
    assert!(matches!(err, CliError::InvalidValue { ref value, .. } if value == "seven"));
}

#[test]
fn test_too_few_arguments() {
    let mut cli = calculator();
    let err = cli.parse_line("sum 7").unwrap_err();
    assert!(matches!(err, CliError::ArityMismatch { ref node, .. } if node == "sum"));
}

#[test]
fn test_no_arguments_leaves_everything_at_defaults() {
    let mut cli = calculator();
    let result = cli.parse_line("sum").unwrap();
    assert_eq!(result.get("a").unwrap(), None);
    assert_eq!(result.result(), Some(&Value::Float(0.0)));
}
