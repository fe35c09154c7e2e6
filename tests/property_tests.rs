//! Property-based tests using proptest
//!
//! These tests generate many random inputs to check invariants that should
//! hold for all of them.

use proptest::prelude::*;

use modelgate::application::upload_gate::{fit_dimensions, secure_filename};
use modelgate::domain::inspection::ModelInspector;
use modelgate::domain::sanitization::Sanitizer;
use modelgate::domain::validation::national_id::{digits_only, is_valid_cpf};
use modelgate::domain::value_objects::RateLimitKey;

/// Check digits for the first nine digits of a CPF
fn cpf_with_check_digits(base: &[u32; 9]) -> String {
    let digit = |digits: &[u32], weight_start: u32| {
        let sum: u32 = digits
            .iter()
            .zip((2..=weight_start).rev())
            .map(|(d, w)| d * w)
            .sum();
        let rest = sum % 11;
        if rest < 2 {
            0
        } else {
            11 - rest
        }
    };
    let mut digits = base.to_vec();
    digits.push(digit(&digits, 10));
    digits.push(digit(&digits, 11));
    digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
}

/// Wrap `payload` in `layers` rounds of named or decimal entity encoding
fn entity_layers(payload: &str, layers: usize, numeric: bool) -> String {
    if !numeric {
        return (0..layers).fold(payload.to_string(), |acc, _| Sanitizer::escape_html(&acc));
    }
    let mut encoded: String = payload.chars().map(|c| format!("&#{};", c as u32)).collect();
    for _ in 1..layers {
        encoded = encoded.replace('&', "&#38;");
    }
    encoded
}

proptest! {
    #[test]
    fn advanced_xss_strips_handlers_through_layered_encoding(
        handler in "on[a-zA-Z]{1,12}",
        quoted in any::<bool>(),
        layers in 1usize..=5,
        numeric in any::<bool>(),
    ) {
        let value = if quoted { "\"alert(1)\"" } else { "alert(1)" };
        let payload = format!("<img src=x {}={}><a href=javascript:alert(2)>x</a>", handler, value);
        let out = Sanitizer::sanitize_advanced_xss(&entity_layers(&payload, layers, numeric));

        let attribute = regex::Regex::new(r"(?i)\bon\w+\s*=").unwrap();
        prop_assert!(!attribute.is_match(&out), "{}", out);
        prop_assert!(!out.to_lowercase().contains("javascript:"), "{}", out);
    }

    #[test]
    fn escaped_html_has_no_markup(input in ".{0,200}") {
        let escaped = Sanitizer::escape_html(&input);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }

    #[test]
    fn plain_text_is_trimmed(input in "[a-z<>/ ]{0,100}") {
        let text = Sanitizer::plain_text(&input);
        prop_assert_eq!(text.trim(), text.as_str());
    }

    #[test]
    fn normalized_filename_has_no_separators(input in ".{0,100}") {
        let name = Sanitizer::normalize_filename(&input);
        prop_assert!(!name.contains('/'));
        prop_assert!(!name.contains('\\'));
        prop_assert!(!name.starts_with('.'));
    }

    #[test]
    fn generated_cpfs_validate(base in prop::array::uniform9(0u32..10)) {
        prop_assume!(base.iter().any(|d| *d != base[0]));
        let cpf = cpf_with_check_digits(&base);
        prop_assert!(is_valid_cpf(&cpf));
        let formatted = format!("{}.{}.{}-{}", &cpf[0..3], &cpf[3..6], &cpf[6..9], &cpf[9..]);
        prop_assert!(is_valid_cpf(&formatted));
    }

    #[test]
    fn cpf_with_wrong_length_fails(digits in "[0-9]{1,10}") {
        prop_assert!(!is_valid_cpf(&digits));
    }

    #[test]
    fn digits_only_keeps_digits(input in ".{0,50}") {
        prop_assert!(digits_only(&input).chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn secure_filename_is_a_single_safe_component(
        stem in ".{0,40}",
        ext in "[a-zA-Z]{1,4}",
        preserve in any::<bool>(),
        ts in 0i64..4_000_000_000,
    ) {
        let original = format!("{}.{}", stem, ext);
        let name = secure_filename(&original, preserve, ts);
        prop_assert!(!name.contains('/'));
        prop_assert!(!name.contains('\\'));
        prop_assert!(!name.starts_with('.'));
        prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
    }

    #[test]
    fn fitted_dimensions_stay_in_bounds(
        w in 1u32..5000,
        h in 1u32..5000,
        max_w in 1u32..2000,
        max_h in 1u32..2000,
    ) {
        if let Some((nw, nh)) = fit_dimensions(w, h, Some(max_w), Some(max_h)) {
            prop_assert!(nw >= 1 && nh >= 1);
            prop_assert!(nw <= max_w && nh <= max_h);
        } else {
            prop_assert!(w <= max_w && h <= max_h);
        }
    }

    #[test]
    fn rate_limit_keys_embed_both_parts(
        action in "[a-z_]{1,20}",
        identifier in "[0-9.]{1,15}",
    ) {
        let key = RateLimitKey::new(action.clone(), identifier.clone()).unwrap();
        prop_assert_eq!(key.storage_key(), format!("rate_limit:{}:{}", action, identifier));
    }

    #[test]
    fn inspector_never_panics_on_noise(
        bytes in prop::collection::vec(any::<u8>(), 0..2048),
        ext in prop_oneof![Just("stl"), Just("obj"), Just("3mf")],
    ) {
        let verdict = ModelInspector::default().inspect(&mut std::io::Cursor::new(bytes), ext);
        prop_assert!(!verdict.message().is_empty());
    }
}
