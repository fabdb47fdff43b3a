use bid_intake::workflows::fields::{
    normalize, score_rule, standard_rules, CustomMappingSnapshot, IntentResolver, MappingRule,
};
use bid_intake::workflows::units::UnitKind;
use proptest::prelude::*;

const NOISE: &[&str] = &["phase", "north", "bldg2", "area", "tower", "b"];

fn representative_tokens(rule: &MappingRule) -> Vec<&'static str> {
    rule.required_tokens
        .iter()
        .chain(rule.any_of_tokens.iter().take(1))
        .copied()
        .collect()
}

fn representative_unit(rule: &MappingRule) -> UnitKind {
    rule.required_unit_kind.unwrap_or(UnitKind::Unknown)
}

fn every_rule_token() -> Vec<&'static str> {
    let mut tokens: Vec<&'static str> = standard_rules()
        .iter()
        .flat_map(|rule| {
            rule.required_tokens
                .iter()
                .chain(rule.any_of_tokens)
                .chain(rule.excluded_tokens)
                .copied()
        })
        .collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}

#[test]
fn representative_inputs_have_a_unique_winner() {
    let rules = standard_rules();
    for rule in rules {
        let tokens = representative_tokens(rule);
        let unit_kind = representative_unit(rule);

        let own = score_rule(rule, &tokens, unit_kind);
        let best = rules
            .iter()
            .map(|other| score_rule(other, &tokens, unit_kind))
            .max()
            .unwrap_or_default();
        assert_eq!(own, best, "rule {} is outscored on its own input", rule.id);

        for other in rules.iter().filter(|other| other.target != rule.target) {
            assert!(
                score_rule(other, &tokens, unit_kind) < own,
                "rule {} ties or beats {} on {:?}",
                other.id,
                rule.id,
                tokens
            );
        }
    }
}

proptest! {
    #[test]
    fn noise_tokens_never_change_the_winner(
        index in 0..standard_rules().len(),
        noise in prop::sample::subsequence(NOISE.to_vec(), 0..NOISE.len()),
        reversed in any::<bool>(),
    ) {
        let rules = standard_rules();
        let rule = &rules[index];
        let mut tokens = representative_tokens(rule);
        tokens.extend(noise);
        if reversed {
            tokens.reverse();
        }
        let unit_kind = representative_unit(rule);

        let own = score_rule(rule, &tokens, unit_kind);
        prop_assert!(own > 0);
        for other in rules.iter().filter(|other| other.target != rule.target) {
            prop_assert!(score_rule(other, &tokens, unit_kind) < own);
        }
    }

    #[test]
    fn required_tokens_keep_a_positive_score(
        index in 0..standard_rules().len(),
        extra in prop::sample::subsequence(every_rule_token(), 0..4),
    ) {
        let rule = &standard_rules()[index];
        let mut tokens = representative_tokens(rule);
        tokens.extend(
            extra
                .into_iter()
                .filter(|token| !rule.excluded_tokens.contains(token)),
        );

        prop_assert!(score_rule(rule, &tokens, representative_unit(rule)) > 0);
    }

    #[test]
    fn resolution_is_deterministic(
        raw in "[A-Za-z .#/-]{0,24}",
        value in prop::option::of(0.0f64..5_000.0),
    ) {
        let resolver = IntentResolver::default();
        let snapshot = CustomMappingSnapshot::empty();

        let first = resolver.resolve_field(&raw, value, &snapshot);
        let second = resolver.resolve_field(&raw, value, &snapshot);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn normalization_ignores_case(raw in "[A-Za-z .,/()-]{0,32}") {
        prop_assert_eq!(normalize(&raw.to_uppercase()), normalize(&raw.to_lowercase()));
    }
}
