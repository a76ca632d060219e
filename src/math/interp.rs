//! Gap filling for masked or undefined values.

/// Replace every masked position by linear interpolation (by index) between the
/// nearest unmasked neighbors.
///
/// A masked run touching either end takes the value of the single neighbor that
/// exists. If every position is masked the input is returned unchanged.
pub fn fill_masked(values: &[f64], mask: &[bool]) -> Vec<f64> {
    debug_assert_eq!(values.len(), mask.len());
    let mut out = values.to_vec();
    let n = values.len();

    let mut prev: Option<usize> = None;
    let mut i = 0;
    while i < n {
        if !mask[i] {
            prev = Some(i);
            i += 1;
            continue;
        }

        // Find the end of this masked run.
        let mut j = i;
        while j < n && mask[j] {
            j += 1;
        }
        let next = (j < n).then_some(j);

        for k in i..j {
            out[k] = match (prev, next) {
                (Some(a), Some(b)) => {
                    let u = (k - a) as f64 / (b - a) as f64;
                    values[a] + u * (values[b] - values[a])
                }
                (Some(a), None) => values[a],
                (None, Some(b)) => values[b],
                (None, None) => values[k],
            };
        }
        i = j;
    }

    out
}

/// Fill each `None` with the next defined value later in the sequence.
///
/// Trailing `None`s (no later defined value) are left as `None`.
pub fn backfill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut next: Option<f64> = None;
    for slot in out.iter_mut().rev() {
        match slot {
            Some(v) => next = Some(*v),
            None => *slot = next,
        }
    }
    out
}
