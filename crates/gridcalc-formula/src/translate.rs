//! Moving formula text between a locale's notation and the canonical one
//!
//! Only number tokens and argument separators change; every other token is
//! copied through untouched.

use crate::tokenizer::{tokenize, TokenKind};
use gridcalc_core::Locale;

/// Rewrite a formula typed in `locale` into canonical (en-US) notation.
/// Text that is not a formula is returned as is.
///
/// ```
/// use gridcalc_core::Locale;
/// use gridcalc_formula::canonicalize_formula;
///
/// assert_eq!(canonicalize_formula("=SUM(1,5; 2)", &Locale::de_de()), "=SUM(1.5, 2)");
/// ```
pub fn canonicalize_formula(formula: &str, locale: &Locale) -> String {
    translate(formula, locale, &Locale::en_us())
}

/// Rewrite a canonical formula into the notation of `locale`.
pub fn localize_formula(formula: &str, locale: &Locale) -> String {
    translate(formula, &Locale::en_us(), locale)
}

fn translate(formula: &str, from: &Locale, to: &Locale) -> String {
    if !formula.starts_with('=') || (from.decimal_separator == to.decimal_separator
        && from.formula_arg_separator == to.formula_arg_separator)
    {
        return formula.to_string();
    }
    tokenize(formula, from)
        .into_iter()
        .map(|token| match token.kind {
            TokenKind::Number => token
                .value
                .replace(from.decimal_separator, &to.decimal_separator.to_string()),
            TokenKind::ArgSeparator => to.formula_arg_separator.to_string(),
            _ => token.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_canonicalize_leaves_strings_alone() {
        let de = Locale::de_de();
        assert_eq!(
            canonicalize_formula("=CONCAT(\"1,5;\"; 2,25; A1)", &de),
            "=CONCAT(\"1,5;\", 2.25, A1)"
        );
    }

    #[test]
    fn test_localize() {
        assert_eq!(
            localize_formula("=ROUND(3.14159, 2)", &Locale::fr_fr()),
            "=ROUND(3,14159; 2)"
        );
        assert_eq!(localize_formula("=1.5", &Locale::en_gb()), "=1.5");
    }

    #[test]
    fn test_non_formula_untouched() {
        assert_eq!(canonicalize_formula("1,5", &Locale::de_de()), "1,5");
    }

    fn localized_number(locale: Locale) -> impl Strategy<Value = String> {
        (0u32..10_000, proptest::option::of(0u32..1000)).prop_map(move |(int, frac)| match frac {
            Some(frac) => format!("{}{}{}", int, locale.decimal_separator, frac),
            None => int.to_string(),
        })
    }

    fn localized_formula(locale: Locale) -> impl Strategy<Value = String> {
        (
            proptest::sample::select(vec!["SUM", "MAX", "ROUND", "CONCAT"]),
            proptest::collection::vec(localized_number(locale), 1..5),
            proptest::bool::ANY,
        )
            .prop_map(move |(name, mut args, spaced)| {
                args.push("A1".to_string());
                let mut sep = locale.formula_arg_separator.to_string();
                if spaced {
                    sep.push(' ');
                }
                format!("={}({})", name, args.join(&sep))
            })
    }

    proptest! {
        #[test]
        fn round_trip_de(formula in localized_formula(Locale::de_de())) {
            let de = Locale::de_de();
            prop_assert_eq!(localize_formula(&canonicalize_formula(&formula, &de), &de), formula);
        }

        #[test]
        fn round_trip_fr(formula in localized_formula(Locale::fr_fr())) {
            let fr = Locale::fr_fr();
            prop_assert_eq!(localize_formula(&canonicalize_formula(&formula, &fr), &fr), formula);
        }

        #[test]
        fn round_trip_en(formula in localized_formula(Locale::en_us())) {
            let en = Locale::en_us();
            prop_assert_eq!(localize_formula(&canonicalize_formula(&formula, &en), &en), formula);
        }
    }
}
