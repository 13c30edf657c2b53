use crate::error::TrainError;

/// Fraction of positions where `predicted` equals `labels`.
pub fn accuracy(predicted: &[i64], labels: &[i64]) -> Result<f64, TrainError> {
    if predicted.len() != labels.len() {
        return Err(TrainError::LengthMismatch {
            predicted: predicted.len(),
            labels: labels.len(),
        });
    }
    if labels.is_empty() {
        return Err(TrainError::EmptyEvaluation);
    }
    let correct = predicted
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    Ok(correct as f64 / labels.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1, 2, 2, 0], &[1, 2, 0, 0]).unwrap(), 0.75);
        assert_eq!(accuracy(&[3, 3], &[3, 3]).unwrap(), 1.0);
        assert_eq!(accuracy(&[0, 1], &[1, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_accuracy_rejects_bad_input() {
        assert!(matches!(
            accuracy(&[1, 2], &[1]),
            Err(TrainError::LengthMismatch { predicted: 2, labels: 1 })
        ));
        assert!(matches!(accuracy(&[], &[]), Err(TrainError::EmptyEvaluation)));
    }
}
