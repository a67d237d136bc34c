use fixed::types::{I32F32, I64F64};

/// Q32.32 fixed-point. Every per-minute rate, clock factor and purity
/// multiplier is a `Rate`, so repeated passes produce bit-identical flows.
pub type Rate = I32F32;

/// Convert an f64 to a Rate. Use for construction and catalog loading.
#[inline]
pub fn f64_to_rate(v: f64) -> Rate {
    Rate::from_num(v)
}

/// Convert an f64 to a Rate, or `None` if it is NaN or outside Q32.32.
/// Use for untrusted input such as catalog files.
#[inline]
pub fn checked_f64_to_rate(v: f64) -> Option<Rate> {
    Rate::checked_from_num(v)
}

/// `v * num / den` computed at double width, so the intermediate product
/// cannot overflow. `None` on a zero divisor or an out-of-range result.
pub fn scale_rate(v: Rate, num: Rate, den: Rate) -> Option<Rate> {
    let wide = I64F64::from_num(v).checked_mul(I64F64::from_num(num))?;
    let scaled = wide.checked_div(I64F64::from_num(den))?;
    Rate::checked_from_num(scaled)
}

/// Convert a Rate to f64. Use only for display and timing estimates.
#[inline]
pub fn rate_to_f64(v: Rate) -> f64 {
    v.to_num::<f64>()
}

/// Checked division that returns None on a zero divisor or overflow.
#[inline]
pub fn checked_div(a: Rate, b: Rate) -> Option<Rate> {
    a.checked_div(b)
}

/// Sum a sequence of rates, saturating at `Rate::MAX`.
pub fn sum_rates(rates: impl IntoIterator<Item = Rate>) -> Rate {
    rates.into_iter().fold(Rate::ZERO, |acc, r| acc.saturating_add(r))
}
