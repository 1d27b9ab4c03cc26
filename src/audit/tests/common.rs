use std::sync::Arc;

use crate::audit::domain::{
    Claim, ClaimedCoefficient, ConditionalCoefficient, FormulaStrategy, Position, QuantityRange,
    ReferenceTable, ResolvedReference,
};
use crate::audit::engine::AuditEngine;
use crate::audit::policy::AuditPolicy;
use crate::audit::store::MemoryReferenceStore;

pub(super) fn position(number: u32, a: f64, b: f64, year: i32) -> Position {
    Position {
        position_number: Some(number),
        param_a: Some(a),
        param_b: Some(b),
        range: None,
        stage_coefficient_1: None,
        stage_coefficient_2: None,
        is_subtitle: false,
        position_id: format!("t7-p{number}-{year}"),
    }
}

pub(super) fn ranged_position(id: &str, min: f64, max: f64, a: f64, b: f64) -> Position {
    Position {
        position_number: None,
        param_a: Some(a),
        param_b: Some(b),
        range: Some(QuantityRange { min, max }),
        stage_coefficient_1: None,
        stage_coefficient_2: None,
        is_subtitle: false,
        position_id: id.to_string(),
    }
}

pub(super) fn subtitle(id: &str) -> Position {
    Position {
        position_number: None,
        param_a: None,
        param_b: None,
        range: None,
        stage_coefficient_1: None,
        stage_coefficient_2: None,
        is_subtitle: true,
        position_id: id.to_string(),
    }
}

/// Discrete table T-7: positions 1-10, constants from the 2023 edition,
/// stage 2 coefficient 1.2 baked into position 7.
pub(super) fn discrete_table(year: i32) -> ReferenceTable {
    let mut positions = vec![subtitle(&format!("t7-head-{year}"))];
    for number in 1..=10 {
        let mut row = position(number, 10_000.0 + f64::from(number) * 91.0, 3.0, year);
        if number == 7 {
            row.param_a = Some(10_637.0);
            row.param_b = Some(3.16);
            row.stage_coefficient_2 = Some(1.2);
        }
        positions.push(row);
    }

    ReferenceTable {
        code: "T-7".to_string(),
        year,
        name: "Residential frame buildings".to_string(),
        positions,
    }
}

/// Range-indexed table R-2 with a deliberate gap between 500 and 600.
pub(super) fn range_table() -> ReferenceTable {
    ReferenceTable {
        code: "R-2".to_string(),
        year: 2023,
        name: "Earthworks by excavated volume".to_string(),
        positions: vec![
            subtitle("r2-head-2023"),
            ranged_position("r2-a-2023", 10.0, 100.0, 5_000.0, 12.0),
            ranged_position("r2-b-2023", 100.0, 500.0, 6_200.0, 9.5),
            ranged_position("r2-c-2023", 600.0, 900.0, 8_400.0, 7.25),
        ],
    }
}

pub(super) fn seismic_coefficient() -> ConditionalCoefficient {
    ConditionalCoefficient {
        id: "K4".to_string(),
        applicability_codes: vec!["T-7".to_string(), "R-2".to_string()],
        condition_text: "seismicity of the construction site 7 points and above".to_string(),
        value: 1.2,
    }
}

pub(super) fn monolithic_coefficient() -> ConditionalCoefficient {
    ConditionalCoefficient {
        id: "K5".to_string(),
        applicability_codes: vec!["T-7".to_string()],
        condition_text: "monolithic reinforced concrete structure".to_string(),
        value: 1.2,
    }
}

pub(super) fn store() -> MemoryReferenceStore {
    MemoryReferenceStore::new(
        vec![discrete_table(2022), discrete_table(2023), range_table()],
        vec![seismic_coefficient(), monolithic_coefficient()],
    )
}

pub(super) fn claim(table_code: &str) -> Claim {
    Claim {
        table_code: table_code.to_string(),
        position_number: None,
        quantity: 50.0,
        claimed_cost: 10_000.0,
        year: Some(2023),
        claimed_coefficients: Vec::new(),
        tags: Vec::new(),
        description: None,
    }
}

/// Scenario from the 2023 edition audit fixtures: position 7 of T-7,
/// four stacked 1.2 coefficients, claim stated in base currency units.
pub(super) fn approved_claim() -> Claim {
    Claim {
        table_code: "T-7".to_string(),
        position_number: Some(7),
        quantity: 4675.08,
        claimed_cost: 52_690_700.0,
        year: Some(2023),
        claimed_coefficients: vec![
            claimed_coefficient("K3", 1.2, "detailed design stage"),
            claimed_coefficient("K6", 1.2, "cramped site conditions"),
        ],
        tags: vec!["seismicity".to_string()],
        description: Some("Residential building, monolithic frame".to_string()),
    }
}

pub(super) fn claimed_coefficient(id: &str, value: f64, rationale: &str) -> ClaimedCoefficient {
    ClaimedCoefficient {
        id: Some(id.to_string()),
        value: Some(value),
        rationale: Some(rationale.to_string()),
    }
}

pub(super) fn resolved_reference(strategy: FormulaStrategy) -> ResolvedReference {
    ResolvedReference {
        ref_a: 10_637.0,
        ref_b: 3.16,
        range_min: 100.0,
        range_max: 5_000.0,
        formula_strategy: strategy,
        valid_coefficients: Vec::new(),
        source_position_id: "t7-p7-2023".to_string(),
        resolved_year: 2023,
        year_fallback: false,
    }
}

pub(super) fn engine() -> AuditEngine<MemoryReferenceStore> {
    AuditEngine::new(Arc::new(store()), AuditPolicy::default())
}

pub(super) fn engine_with_policy(policy: AuditPolicy) -> AuditEngine<MemoryReferenceStore> {
    AuditEngine::new(Arc::new(store()), policy)
}
