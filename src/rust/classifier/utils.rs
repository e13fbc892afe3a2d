use ndarray::{Array1, ArrayView1};

pub(crate) fn normalize_vector(vec: &Array1<f32>) -> Array1<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        vec / norm
    } else {
        Array1::zeros(vec.len())
    }
}

/// Index of the largest value; ties and NaNs resolve to the earliest index.
pub(crate) fn argmax(values: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if !(value > current) => {}
            _ if value.is_nan() => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

pub(crate) fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp = logits.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    exp / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        let values = array![0.1f32, 0.4, 0.4, 0.1];
        assert_eq!(argmax(values.view()), Some(1));
    }

    #[test]
    fn test_argmax_skips_nan() {
        let values = array![f32::NAN, 0.2, 0.3];
        assert_eq!(argmax(values.view()), Some(2));
        let empty: Array1<f32> = Array1::zeros(0);
        assert_eq!(argmax(empty.view()), None);
    }

    #[test]
    fn test_round_to_three_decimals() {
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(0.9996, 3), 1.0);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&array![1.0, 2.0, 1000.0]);
        assert!((probs.sum() - 1.0).abs() < 1e-9);
        assert!(probs[2] > 0.99);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let zero = Array1::<f32>::zeros(3);
        assert_eq!(normalize_vector(&zero), zero);
    }
}
