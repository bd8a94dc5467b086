//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first value, then EMA[i] = EMA[i-1] + k*(C[i] - EMA[i-1]).
//! Every entry is defined; there is no NaN warmup. A run of closes equal to
//! the current EMA leaves it unchanged.

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);

    for &v in &values[1..] {
        ema += k * (v - ema);
        out.push(ema);
    }

    out
}
