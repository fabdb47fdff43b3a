use crate::workflows::units::UnitKind;

const SEPARATORS: &[char] = &[
    '.', ',', '/', '\\', '-', '_', '(', ')', '[', ']', '{', '}', ':', ';', '#', '&', '+', '*',
    '\'', '"', '|', '!', '?', '@', '%', '=', '~', '`', '<', '>', '$', '^',
];

/// Multi-word spellings collapsed before single-word expansion. None of the
/// outputs below may appear as an input on either table.
const PHRASE_REWRITES: &[(&[&str], &str)] = &[
    (&["sq", "ft"], "sf"),
    (&["sq", "feet"], "sf"),
    (&["square", "feet"], "sf"),
    (&["s", "f"], "sf"),
    (&["lin", "ft"], "lf"),
    (&["linear", "ft"], "lf"),
    (&["linear", "feet"], "lf"),
    (&["l", "f"], "lf"),
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("balc", "balcony"),
    ("balcs", "balcony"),
    ("balconies", "balcony"),
    ("cor", "corridor"),
    ("corr", "corridor"),
    ("corridors", "corridor"),
    ("hall", "corridor"),
    ("halls", "corridor"),
    ("hallway", "corridor"),
    ("hallways", "corridor"),
    ("ext", "exterior"),
    ("int", "interior"),
    ("lid", "ceiling"),
    ("lids", "ceiling"),
    ("clg", "ceiling"),
    ("ceil", "ceiling"),
    ("ceilings", "ceiling"),
    ("lvl", "level"),
    ("lvls", "level"),
    ("levels", "level"),
    ("flr", "level"),
    ("floors", "level"),
    ("qty", "count"),
    ("cnt", "count"),
    ("apt", "unit"),
    ("apts", "unit"),
    ("apartment", "unit"),
    ("apartments", "unit"),
    ("units", "unit"),
    ("dr", "door"),
    ("drs", "door"),
    ("doors", "door"),
    ("walls", "wall"),
    ("stairs", "stair"),
    ("stairwell", "stair"),
    ("stairwells", "stair"),
    ("rail", "railing"),
    ("rails", "railing"),
    ("railings", "railing"),
    ("handrail", "railing"),
    ("handrails", "railing"),
    ("gar", "garage"),
    ("garages", "garage"),
    ("amen", "amenity"),
    ("amenities", "amenity"),
    ("clubhouse", "amenity"),
    ("bldg", "building"),
    ("baseboard", "base"),
    ("baseboards", "base"),
    ("bollards", "bollard"),
    ("soffits", "soffit"),
    ("fences", "fence"),
    ("fencing", "fence"),
    ("sign", "signage"),
    ("signs", "signage"),
];

/// Canonicalizes a raw spreadsheet key: lowercase, separators to spaces,
/// phrase and abbreviation rewrites, collapsed whitespace.
///
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(raw: &str) -> String {
    let cleaned = raw.replace(['\u{feff}', '\u{200b}'], "").to_lowercase();
    let spaced: String = cleaned
        .chars()
        .map(|ch| if SEPARATORS.contains(&ch) { ' ' } else { ch })
        .collect();

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    tokens = rewrite_phrases(tokens);

    tokens
        .into_iter()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(from, _)| *from == token)
                .map(|(_, to)| *to)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn rewrite_phrases(tokens: Vec<&str>) -> Vec<&str> {
    let mut tokens = tokens;
    for (phrase, replacement) in PHRASE_REWRITES {
        let mut rewritten = Vec::with_capacity(tokens.len());
        let mut index = 0;
        while index < tokens.len() {
            if tokens[index..].starts_with(phrase) {
                rewritten.push(*replacement);
                index += phrase.len();
            } else {
                rewritten.push(tokens[index]);
                index += 1;
            }
        }
        tokens = rewritten;
    }
    tokens
}

/// Whitespace-delimited tokens of an already normalized key.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Infers the unit kind of a field from literal unit tokens, falling back to
/// the magnitude of its value.
///
/// The fallback is lossy: any whole number in `(0, 500]` without a unit token
/// reads as a COUNT, so "500" square feet under an unlabeled key is
/// misclassified. Rule unit requirements are calibrated against this
/// behavior, so it stays as-is.
pub fn detect_unit_kind(normalized: &str, value: Option<f64>) -> UnitKind {
    let tokens = tokenize(normalized);
    let has_any = |candidates: &[&str]| tokens.iter().any(|token| candidates.contains(token));

    if has_any(&["sf", "sqft", "square"]) {
        return UnitKind::Sf;
    }
    if has_any(&["lf", "linear"]) {
        return UnitKind::Lf;
    }
    if has_any(&["lvl", "level"]) {
        return UnitKind::Lvl;
    }
    if has_any(&["count", "ea", "each", "qty"]) {
        return UnitKind::Ea;
    }

    match value {
        Some(value) if value > 0.0 && value <= 500.0 && value.fract() == 0.0 => UnitKind::Count,
        _ => UnitKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_is_case_and_punctuation_insensitive() {
        let expected = normalize("cor wall sf");
        assert_eq!(expected, "corridor wall sf");
        assert_eq!(normalize("Cor. Wall SF"), expected);
        assert_eq!(normalize("COR WALL SF"), expected);
        assert_eq!(normalize("\u{feff}  Cor-Wall   (S.F.) "), expected);
    }

    #[test]
    fn normalize_expands_abbreviations_as_whole_words() {
        assert_eq!(normalize("Ext. Balc Lid"), "exterior balcony ceiling");
        assert_eq!(normalize("Stair Lvl Qty"), "stair level count");
        assert_eq!(normalize("Corner Trim"), "corner trim");
        assert_eq!(normalize("Unit Base Sq Ft"), "unit base sf");
        assert_eq!(normalize("Fence Lin. Ft."), "fence lf");
    }

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("corridor wall sf"), vec!["corridor", "wall", "sf"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn detect_unit_kind_prefers_literal_tokens() {
        assert_eq!(detect_unit_kind("corridor wall sf", Some(12.0)), UnitKind::Sf);
        assert_eq!(detect_unit_kind("square footage", None), UnitKind::Sf);
        assert_eq!(detect_unit_kind("fence lf", Some(1200.0)), UnitKind::Lf);
        assert_eq!(detect_unit_kind("stair level", Some(4.0)), UnitKind::Lvl);
        assert_eq!(detect_unit_kind("door count", Some(900.0)), UnitKind::Ea);
        assert_eq!(detect_unit_kind("bollard each", None), UnitKind::Ea);
    }

    #[test]
    fn detect_unit_kind_falls_back_to_magnitude() {
        assert_eq!(detect_unit_kind("unit door", Some(120.0)), UnitKind::Count);
        assert_eq!(detect_unit_kind("unit door", Some(500.0)), UnitKind::Count);
        assert_eq!(detect_unit_kind("unit door", Some(501.0)), UnitKind::Unknown);
        assert_eq!(detect_unit_kind("unit door", Some(12.5)), UnitKind::Unknown);
        assert_eq!(detect_unit_kind("unit door", Some(0.0)), UnitKind::Unknown);
        assert_eq!(detect_unit_kind("unit door", None), UnitKind::Unknown);
    }

    fn vocabulary_key() -> impl Strategy<Value = String> {
        let words = prop::sample::select(vec![
            "Cor", "corr.", "Balc", "LID", "lvl", "qty", "Sq", "Ft", "S.F.", "l", "f", "Lin",
            "linear", "feet", "walls", "Doors", "ext", "Garage", "#", "-", "(", ")", "unit",
            "Apts", "sf", "lf",
        ]);
        prop::collection::vec(words, 0..8).prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent_for_ascii_input(raw in "[A-Za-z0-9 .,/()#&_-]{0,40}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_for_vocabulary_keys(raw in vocabulary_key()) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert_eq!(normalize(&raw.to_uppercase()), once);
        }
    }
}
