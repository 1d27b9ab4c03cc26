use super::common::*;
use crate::audit::domain::FormulaStrategy;
use crate::audit::engine::AuditError;
use crate::audit::policy::AuditPolicy;
use crate::audit::resolver::Resolver;

fn resolver() -> Resolver {
    Resolver::new(AuditPolicy::default())
}

#[test]
fn resolves_position_by_exact_number() {
    let store = store();
    let mut claim = claim("T-7");
    claim.position_number = Some(7);

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    assert_eq!(resolved.ref_a, 10_637.0);
    assert_eq!(resolved.ref_b, 3.16);
    assert_eq!(resolved.formula_strategy, FormulaStrategy::Standard);
    assert_eq!(resolved.source_position_id, "t7-p7-2023");
    assert!(!resolved.year_fallback);
}

#[test]
fn missing_position_number_is_a_hard_failure() {
    let store = store();
    let mut claim = claim("T-7");
    claim.position_number = Some(99);

    let error = resolver().resolve(&store, &claim).expect_err("must fail");

    match &error {
        AuditError::PositionNotFound {
            code,
            position_number,
        } => {
            assert_eq!(code, "T-7");
            assert_eq!(*position_number, 99);
        }
        other => panic!("expected PositionNotFound, got {other:?}"),
    }
    let message = error.to_string();
    assert!(message.contains("T-7"));
    assert!(message.contains("99"));
}

#[test]
fn unknown_table_code_fails_in_any_year() {
    let store = store();
    let claim = claim("Z-0");

    let error = resolver().resolve(&store, &claim).expect_err("must fail");

    assert!(matches!(error, AuditError::TableNotFound { code } if code == "Z-0"));
}

#[test]
fn falls_back_to_newest_available_year() {
    let store = store();
    let mut claim = claim("T-7");
    claim.position_number = Some(3);
    claim.year = Some(2025);

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    assert_eq!(resolved.resolved_year, 2023);
    assert!(resolved.year_fallback);
}

#[test]
fn range_mode_matches_containing_interval() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 250.0;

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    assert_eq!(resolved.source_position_id, "r2-b-2023");
    assert_eq!(resolved.formula_strategy, FormulaStrategy::Standard);
    assert_eq!(resolved.range_min, 100.0);
    assert_eq!(resolved.range_max, 500.0);
}

#[test]
fn quantity_above_every_range_extrapolates_from_highest() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 1_500.0;

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    assert_eq!(resolved.source_position_id, "r2-c-2023");
    assert_eq!(resolved.formula_strategy, FormulaStrategy::ExtrapolateAbove);
}

#[test]
fn quantity_below_every_range_fails_by_default() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 2.0;

    let error = resolver().resolve(&store, &claim).expect_err("must fail");

    assert!(matches!(
        error,
        AuditError::QuantityOutOfRange { code, .. } if code == "R-2"
    ));
}

#[test]
fn quantity_below_every_range_extrapolates_when_enabled() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 2.0;
    let policy = AuditPolicy {
        extrapolate_below: true,
        ..AuditPolicy::default()
    };

    let resolved = Resolver::new(policy)
        .resolve(&store, &claim)
        .expect("resolves");

    assert_eq!(resolved.source_position_id, "r2-a-2023");
    assert_eq!(resolved.formula_strategy, FormulaStrategy::ExtrapolateBelow);
}

#[test]
fn gap_between_ranges_is_a_data_error() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 550.0;

    let error = resolver().resolve(&store, &claim).expect_err("must fail");

    assert!(matches!(error, AuditError::QuantityOutOfRange { .. }));
}

#[test]
fn subtitle_rows_are_skipped() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 50.0;

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    // The subtitle header precedes r2-a but carries no constants.
    assert_eq!(resolved.source_position_id, "r2-a-2023");
}

#[test]
fn stage_two_supersedes_stage_one() {
    let mut table = discrete_table(2023);
    for row in &mut table.positions {
        if row.position_number == Some(7) {
            row.stage_coefficient_1 = Some(1.1);
            row.stage_coefficient_2 = Some(1.2);
        }
    }
    let mut store = crate::audit::store::MemoryReferenceStore::default();
    store.insert_table(table);

    let mut claim = claim("T-7");
    claim.position_number = Some(7);
    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    let stage: Vec<_> = resolved
        .valid_coefficients
        .iter()
        .filter(|c| c.id == "K1" || c.id == "K2")
        .collect();
    assert_eq!(stage.len(), 1);
    assert_eq!(stage[0].id, "K2");
    assert_eq!(stage[0].value, 1.2);
}

#[test]
fn tags_stack_all_applicable_coefficients() {
    let store = store();
    let mut claim = claim("T-7");
    claim.position_number = Some(3);
    claim.tags = vec!["seismicity".to_string(), "monolithic".to_string()];

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    let ids: Vec<&str> = resolved
        .valid_coefficients
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert!(ids.contains(&"K4"));
    assert!(ids.contains(&"K5"));
}

#[test]
fn coefficients_for_other_codes_are_ignored() {
    let store = store();
    let mut claim = claim("R-2");
    claim.quantity = 50.0;
    claim.tags = vec!["monolithic".to_string()];

    let resolved = resolver().resolve(&store, &claim).expect("resolves");

    // K5 applies to T-7 only.
    assert!(resolved.valid_coefficients.is_empty());
}

#[test]
fn matched_position_must_carry_constants() {
    let mut table = range_table();
    table.positions[1].param_b = None;
    let mut store = crate::audit::store::MemoryReferenceStore::default();
    store.insert_table(table);

    let mut claim = claim("R-2");
    claim.quantity = 50.0;

    let error = resolver().resolve(&store, &claim).expect_err("must fail");

    assert!(matches!(error, AuditError::MissingInput { field } if field.contains("param_b")));
}
