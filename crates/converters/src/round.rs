/// Round to 6 decimals the way `Number.prototype.toFixed(6)` does before the
/// string is parsed back: nearest decimal to the exact binary value, exact ties
/// away from zero.
pub fn round6(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let abs = x.abs();
    let mut digits = format!("{:.6}", abs);
    // `{:.6}` breaks exact ties to even. A tie at the 7th decimal means
    // abs * 2^7 is an odd integer (the scaling is exact).
    let scaled = abs * 128.0;
    if scaled.fract() == 0.0 && scaled % 2.0 == 1.0 && digits.parse::<f64>().map_or(false, |v| v < abs) {
        digits = bump_last_digit(&digits);
    }
    let rounded = digits.parse::<f64>().unwrap_or(abs);
    // no negative zero on the wire
    if rounded == 0.0 {
        0.0
    } else if x.is_sign_negative() {
        -rounded
    } else {
        rounded
    }
}

/// Add one unit in the last place of a plain decimal string.
fn bump_last_digit(s: &str) -> String {
    let mut out: Vec<u8> = s.as_bytes().to_vec();
    let mut i = out.len();
    while i > 0 {
        i -= 1;
        match out[i] {
            b'.' => continue,
            b'9' => out[i] = b'0',
            d => {
                out[i] = d + 1;
                return String::from_utf8(out).unwrap_or_else(|_| s.to_string());
            }
        }
    }
    // every digit carried over
    let mut carried = String::with_capacity(out.len() + 1);
    carried.push('1');
    carried.push_str(&String::from_utf8_lossy(&out));
    carried
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_six_places() {
        assert_eq!(round6(3.5 * 3.28084), 11.48294);
        assert_eq!(round6(1.0 / 3.0), 0.333333);
        assert_eq!(round6(2.0 / 3.0), 0.666667);
        assert_eq!(round6(0.000_000_4), 0.0);
        assert_eq!(round6(12.0), 12.0);
    }

    #[test]
    fn exact_ties_go_away_from_zero() {
        // 1/128 = 0.0078125 exactly
        assert_eq!(round6(0.0078125), 0.007813);
        assert_eq!(round6(-0.0078125), -0.007813);
        // 3/128 = 0.0234375, half-even would keep 0.023438 anyway
        assert_eq!(round6(0.0234375), 0.023438);
        assert_eq!(round6(1.5078125), 1.507813);
    }

    #[test]
    fn negative_values_mirror_positive() {
        assert_eq!(round6(-3.5 * 3.28084), -11.48294);
        assert_eq!(round6(-1.0 / 3.0), -0.333333);
    }

    #[test]
    fn negative_values_below_half_unit_round_to_positive_zero() {
        let r = round6(-3.28084e-7);
        assert_eq!(r, 0.0);
        assert!(r.is_sign_positive());
        assert!(round6(-0.0).is_sign_positive());
    }

    #[test]
    fn carry_propagates_through_nines() {
        assert_eq!(bump_last_digit("0.999999"), "1.000000");
        assert_eq!(bump_last_digit("9.999999"), "10.000000");
        assert_eq!(bump_last_digit("0.007812"), "0.007813");
    }

    #[test]
    fn large_values_pass_through() {
        assert_eq!(round6(1e21), 1e21);
        assert_eq!(round6(5280.0 * 1e9), 5.28e12);
    }
}
