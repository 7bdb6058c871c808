use chrono::NaiveDate;
use serde_json::{json, Value};
use support_engine::models::{FormulaVariant, Payer};
use support_engine::scoring::LeadCategory;
use support_engine::{
    calculate_assessment, classify_lead, resolve_jurisdiction, AssessmentError, AssessmentInput,
    AssessmentOutcome, JurisdictionStatus, LeadScoringInput, ScoringConfig, ValidationError,
};

fn input(value: Value) -> AssessmentInput {
    serde_json::from_value(value).expect("valid assessment input")
}

fn two_parents(ati_a: f64, ati_b: f64, care: Value) -> Value {
    json!({
        "parent_a": { "adjusted_taxable_income": ati_a },
        "parent_b": { "adjusted_taxable_income": ati_b },
        "children": [{ "age": 8, "care": care }]
    })
}

#[test]
fn parent_with_no_care_pays_the_other() {
    let case = input(two_parents(
        80_000.0,
        50_000.0,
        json!({ "period": "fortnight", "parent_a": 14, "parent_b": 0 }),
    ));
    let outcome = calculate_assessment(&case).expect("assessment succeeds");
    let result = outcome.result().expect("assessed");
    assert_eq!(result.formula, FormulaVariant::Formula2);
    assert_eq!(result.payer, Payer::ParentB);
    assert_eq!(result.final_payment_amount, 3281.0);
}

#[test]
fn shared_care_with_equal_incomes_pays_nothing() {
    let case = input(two_parents(
        60_000.0,
        60_000.0,
        json!({ "period": "fortnight", "parent_a": 7, "parent_b": 7 }),
    ));
    let outcome = calculate_assessment(&case).expect("assessment succeeds");
    let result = outcome.result().expect("assessed");
    assert_eq!(result.children[0].rounded_care_a, 50);
    assert_eq!(result.children[0].rounded_care_b, 50);
    assert_eq!(result.children[0].cost_percent_a, result.parent_a.income_percent);
    assert_eq!(result.payer, Payer::Neither);
    assert_eq!(result.final_payment_amount, 0.0);
}

#[test]
fn unknown_country_uses_the_international_formula() {
    assert_eq!(resolve_jurisdiction("Freedonia"), JurisdictionStatus::NonReciprocating);

    let mut case = two_parents(
        80_000.0,
        120_000.0,
        json!({ "period": "percent", "parent_a": 0, "parent_b": 100 }),
    );
    case["overseas_parent"] = json!({ "parent": "parent_b", "country": "Freedonia" });
    let outcome = calculate_assessment(&input(case)).expect("assessment succeeds");
    let result = outcome.result().expect("assessed");
    assert_eq!(result.formula, FormulaVariant::Formula5);
    assert_eq!(result.combined_csi, result.parent_a.child_support_income);
    assert_eq!(result.payer, Payer::ParentA);
}

#[test]
fn carer_below_the_threshold_receives_nothing() {
    let mut case = two_parents(
        80_000.0,
        50_000.0,
        json!({ "period": "percent", "parent_a": 50, "parent_b": 30, "carer": 20 }),
    );
    case["non_parent_carer"] = json!(true);
    let outcome = calculate_assessment(&input(case)).expect("no error for zero care");
    assert!(matches!(outcome, AssessmentOutcome::NoChildSupportPayable(_)));
    assert_eq!(outcome.payer(), Payer::Neither);
    assert_eq!(outcome.final_payment_amount(), Some(0.0));

    let wire = serde_json::to_value(&outcome).expect("serialises");
    assert_eq!(wire["status"], json!("no_child_support_payable"));
}

#[test]
fn excluded_country_is_refused_without_an_error() {
    let mut case = two_parents(
        80_000.0,
        50_000.0,
        json!({ "period": "percent", "parent_a": 100, "parent_b": 0 }),
    );
    case["overseas_parent"] = json!({ "parent": "parent_b", "country": "samoa" });
    let outcome = calculate_assessment(&input(case)).expect("refusal is not an error");
    assert!(matches!(outcome, AssessmentOutcome::CourtOrderRequired(_)));
    assert_eq!(outcome.final_payment_amount(), None);
}

#[test]
fn invalid_input_is_reported() {
    let case = input(two_parents(
        80_000.0,
        50_000.0,
        json!({ "period": "week", "parent_a": 3, "parent_b": 3 }),
    ));
    let err = calculate_assessment(&case).unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::Invalid(ValidationError::CareTotal { index: 0, .. })
    ));
}

#[test]
fn high_value_lead_with_a_property_settlement_is_premium() {
    let mut lead = LeadScoringInput::empty(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    lead.liability = 20_000.0;
    lead.special_circumstances = vec!["property_settlement_pending".to_string()];
    let config = ScoringConfig::default();

    let first = classify_lead(&lead, &config);
    assert_eq!(first.score, 18);
    assert_eq!(first.category, LeadCategory::Premium);
    assert_eq!(first, classify_lead(&lead, &config));
}

#[test]
fn two_carers_are_paid_in_proportion_to_their_costs() {
    let mut case = two_parents(
        80_000.0,
        50_000.0,
        json!({
            "period": "percent",
            "parent_a": 10,
            "parent_b": 10,
            "carer": 45,
            "second_carer": 35
        }),
    );
    case["non_parent_carer"] = json!(true);
    let outcome = calculate_assessment(&input(case)).expect("assessment succeeds");
    let result = outcome.result().expect("assessed");
    assert_eq!(result.payment_to_carer, Some(11443.0));
    let wire = serde_json::to_value(result).expect("serialises");
    assert_eq!(wire["carer_payments"], json!({ "first_carer": 7356.0, "second_carer": 4087.0 }));
    assert_eq!(wire["zero_payment_reason"], json!({ "kind": "both_low_care" }));
}
