use crate::workflows::units::UnitKind;

const PUNCTUATION: &[char] = &[
    '.', ',', '/', '\\', '-', '(', ')', '[', ']', '{', '}', ':', ';', '#', '&', '+', '|', '\'',
    '"',
];

/// Multi-word synonyms, applied before single-token synonyms.
const PHRASE_SYNONYMS: &[(&[&str], &str)] = &[
    (&["concrete", "masonry", "units"], "cmu"),
    (&["concrete", "masonry", "unit"], "cmu"),
    (&["concrete", "masonry"], "cmu"),
    (&["concrete", "block"], "cmu"),
    (&["overhead", "door"], "garage door"),
    (&["overhead", "doors"], "garage door"),
];

const TOKEN_SYNONYMS: &[(&str, &str)] = &[
    ("balc", "balcony"),
    ("balconies", "balcony"),
    ("walls", "wall"),
    ("ceilings", "ceiling"),
    ("clg", "ceiling"),
    ("lid", "ceiling"),
    ("doors", "door"),
    ("dr", "door"),
    ("railings", "railing"),
    ("rail", "railing"),
    ("rails", "railing"),
    ("handrail", "railing"),
    ("handrails", "railing"),
    ("guardrail", "railing"),
    ("stairs", "stair"),
    ("stairwell", "stair"),
    ("fences", "fence"),
    ("fencing", "fence"),
    ("bollards", "bollard"),
    ("soffits", "soffit"),
    ("baseboard", "base"),
    ("baseboards", "base"),
    ("garages", "garage"),
];

/// Unit words that appear inside classification text and carry no meaning
/// for rule matching.
const UNIT_WORDS: &[&str] = &[
    "lf", "sf", "ea", "ft", "sq", "sqft", "each", "linear", "square", "feet", "foot", "count",
    "qty",
];

/// Compounds collapse into one token after synonyms so that partial words
/// cannot satisfy unrelated rules.
const COMPOUNDS: &[(&[&str], &str)] = &[
    (&["chain", "link", "fence"], "chain_link_fence"),
    (&["garage", "door"], "garage_door"),
];

/// Closed lookup from an explicit unit code to a unit kind.
pub fn unit_kind_for_code(code: &str) -> UnitKind {
    let cleaned = code.replace('.', "");
    let canonical = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    match canonical.to_ascii_uppercase().as_str() {
        "FT" | "LF" | "LINEAR FT" | "LIN FT" | "LINEAR FEET" => UnitKind::Lf,
        "SF" | "SQFT" | "SQ FT" | "SQUARE FEET" => UnitKind::Sf,
        "EA" | "EACH" | "COUNT" => UnitKind::Ea,
        _ => UnitKind::Unknown,
    }
}

/// Canonical token string for classification text.
pub fn normalize_classification(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|ch| if PUNCTUATION.contains(&ch) { ' ' } else { ch })
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || *ch == '_')
        .collect();

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let tokens = rewrite(tokens, PHRASE_SYNONYMS);
    let tokens: Vec<&str> = tokens
        .into_iter()
        .map(|token| {
            TOKEN_SYNONYMS
                .iter()
                .find(|(from, _)| *from == token)
                .map(|(_, to)| *to)
                .unwrap_or(token)
        })
        .filter(|token| !UNIT_WORDS.contains(token))
        .collect();
    let tokens = rewrite(tokens, COMPOUNDS);

    tokens.join(" ")
}

/// Whole-word phrase substitution. Replacements may hold several words; they
/// are split back into tokens.
fn rewrite<'a>(
    tokens: Vec<&'a str>,
    table: &[(&'static [&'static str], &'static str)],
) -> Vec<&'a str> {
    let mut tokens = tokens;
    for &(phrase, replacement) in table {
        let mut rewritten = Vec::with_capacity(tokens.len());
        let mut index = 0;
        while index < tokens.len() {
            if tokens[index..].starts_with(phrase) {
                rewritten.extend(replacement.split_whitespace());
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

/// Words of the original text worth proposing as new rule tokens.
pub fn suggested_tokens(raw_text: &str) -> Vec<String> {
    let lowered = raw_text.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for word in lowered
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
    {
        if !tokens.iter().any(|seen| seen == word) {
            tokens.push(word.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_codes_are_a_closed_lookup() {
        assert_eq!(unit_kind_for_code("FT"), UnitKind::Lf);
        assert_eq!(unit_kind_for_code("l.f."), UnitKind::Lf);
        assert_eq!(unit_kind_for_code("linear  ft"), UnitKind::Lf);
        assert_eq!(unit_kind_for_code("SQ FT"), UnitKind::Sf);
        assert_eq!(unit_kind_for_code("sqft"), UnitKind::Sf);
        assert_eq!(unit_kind_for_code("Each"), UnitKind::Ea);
        assert_eq!(unit_kind_for_code("SQM"), UnitKind::Unknown);
        assert_eq!(unit_kind_for_code(""), UnitKind::Unknown);
    }

    #[test]
    fn compounds_form_after_unit_words_are_stripped() {
        assert_eq!(
            normalize_classification("Chain Link Fence LF"),
            "chain_link_fence"
        );
        assert_eq!(
            normalize_classification("Chain-Link Fencing (6')"),
            "chain_link_fence 6"
        );
        assert_eq!(normalize_classification("Overhead Doors"), "garage_door");
        assert_eq!(normalize_classification("Garage Doors EA"), "garage_door");
    }

    #[test]
    fn masonry_synonyms_collapse_to_cmu() {
        assert_eq!(normalize_classification("Concrete Block Walls"), "cmu wall");
        assert_eq!(
            normalize_classification("Concrete Masonry Units - SF"),
            "cmu"
        );
        assert_eq!(normalize_classification("Balc. Railings"), "balcony railing");
    }

    #[test]
    fn symbols_outside_the_punctuation_set_are_dropped() {
        assert_eq!(normalize_classification("Soffit* @ Eaves"), "soffit eaves");
    }

    #[test]
    fn suggested_tokens_keep_longer_words_once() {
        assert_eq!(
            suggested_tokens("Roof Deck / roof Access LF"),
            vec!["roof", "deck", "access"]
        );
    }
}
