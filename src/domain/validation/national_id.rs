//! Brazilian document numbers (CPF, CNPJ, CEP) and phone digit checks

/// Keep only ASCII digits
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn to_digits(input: &str) -> Vec<u32> {
    input.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// CPF: 11 digits, two modulus-11 check digits, repeated-digit numbers rejected.
///
/// Accepts formatted input ("529.982.247-25").
pub fn is_valid_cpf(input: &str) -> bool {
    let digits = to_digits(&digits_only(input));
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }

    for t in 9..11 {
        let sum: u32 = digits[..t]
            .iter()
            .enumerate()
            .map(|(c, d)| d * (t as u32 + 1 - c as u32))
            .sum();
        let check = ((10 * sum) % 11) % 10;
        if digits[t] != check {
            return false;
        }
    }

    true
}

/// CNPJ: 14 digits with two modulus-11 check digits (weights 5..2,9..2 then 6..2,9..2)
pub fn is_valid_cnpj(input: &str) -> bool {
    let digits = to_digits(&digits_only(input));
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }

    for (len, first_weight) in [(12usize, 5u32), (13, 6)] {
        let mut weight = first_weight;
        let mut sum = 0;
        for d in &digits[..len] {
            sum += d * weight;
            weight = if weight == 2 { 9 } else { weight - 1 };
        }
        let rest = sum % 11;
        let check = if rest < 2 { 0 } else { 11 - rest };
        if digits[len] != check {
            return false;
        }
    }

    true
}

/// CEP: exactly 8 digits after normalization
pub fn is_valid_cep(input: &str) -> bool {
    digits_only(input).len() == 8
}

/// Phone: digit count within `min..=max`
pub fn is_valid_phone(input: &str, min: usize, max: usize) -> bool {
    let len = digits_only(input).len();
    len >= min && len <= max
}
