//! Small helpers.

pub fn sanitize_symbol(sym: &str) -> String {
    sym.trim().to_uppercase()
}

/// Trim and uppercase a categorical field for stable comparison.
pub fn normalize_token(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

/// Integer coercion; empty or garbage becomes 0. Accepts "2.0".
pub fn coerce_int(s: &str) -> i64 {
    let t = s.trim();
    if let Ok(n) = t.parse::<i64>() {
        return n;
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => f as i64,
        _ => 0,
    }
}

/// Largest contract count a single fill may carry.
pub const MAX_QUANTITY: i64 = u32::MAX as i64;

/// Contract count; negative or out-of-range values become 0 like any other
/// bad input.
pub fn coerce_count(s: &str) -> i64 {
    match coerce_int(s) {
        n @ 0..=MAX_QUANTITY => n,
        _ => 0,
    }
}

/// Float coercion; empty, garbage (including "1,250") or non-finite becomes
/// missing.
pub fn coerce_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Round to 2 decimals, ties to even.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Mean of the present values; missing when none are present.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}
