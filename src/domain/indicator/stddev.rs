//! Population standard deviation (divides by N, not N-1).

use super::mean;

pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - avg;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_empty() {
        assert_eq!(population_stddev(&[]), 0.0);
    }

    #[test]
    fn stddev_constant_values() {
        assert!(population_stddev(&[5.0, 5.0, 5.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_known_values() {
        // mean 5, squared diffs 9,1,1,1,0,0,4,16 -> variance 4
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_stddev(&values) - 2.0).abs() < 1e-12);
    }
}
