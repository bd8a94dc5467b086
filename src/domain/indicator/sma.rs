//! Simple Moving Average.
//!
//! Rolling mean over `n` closes. Warmup: first (n-1) entries are NaN.
//! A window of equal closes yields that close exactly.

pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    // length of the run of equal values ending at i
    let mut run = 0;

    for (i, &v) in values.iter().enumerate() {
        run = if i > 0 && v == values[i - 1] { run + 1 } else { 1 };
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 < period {
            out.push(f64::NAN);
        } else if run >= period {
            out.push(v);
        } else {
            out.push(sum / period as f64);
        }
    }

    out
}
