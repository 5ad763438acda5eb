//! Classification metrics for model selection and held-out evaluation.
//!
//! Metrics follow the zero-division convention of reporting 0.0 when a ratio
//! has an empty denominator.

use fd_types::Label;
use serde::{Deserialize, Serialize};

/// 2x2 confusion matrix, rows are actual labels and columns predicted labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[Label], y_pred: &[Label]) -> Self {
        let mut counts = [[0usize; 2]; 2];
        for (actual, predicted) in y_true.iter().zip(y_pred.iter()) {
            counts[actual.index()][predicted.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, actual: Label, predicted: Label) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn true_positives(&self, label: Label) -> usize {
        self.get(label, label)
    }

    /// Rows whose actual label is `label`.
    pub fn support(&self, label: Label) -> usize {
        self.counts[label.index()].iter().sum()
    }

    /// Rows predicted as `label`.
    pub fn predicted(&self, label: Label) -> usize {
        self.counts.iter().map(|row| row[label.index()]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn recall(&self, label: Label) -> f64 {
        ratio(self.true_positives(label), self.support(label))
    }

    pub fn precision(&self, label: Label) -> f64 {
        ratio(self.true_positives(label), self.predicted(label))
    }

    /// Unweighted mean of per-class recall over the classes that appear in
    /// either the actual or the predicted labels.
    pub fn recall_macro(&self) -> f64 {
        let present: Vec<Label> = Label::ALL
            .into_iter()
            .filter(|&l| self.support(l) > 0 || self.predicted(l) > 0)
            .collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().map(|&l| self.recall(l)).sum::<f64>() / present.len() as f64
    }
}

/// Macro-averaged recall of a prediction.
pub fn recall_macro(y_true: &[Label], y_pred: &[Label]) -> f64 {
    ConfusionMatrix::from_labels(y_true, y_pred).recall_macro()
}

/// Precision, recall, F1 and support for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Diagnostic evaluation of a fitted model on held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub recall_macro: f64,
    pub classes: Vec<ClassReport>,
    pub confusion_matrix: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn evaluate(y_true: &[Label], y_pred: &[Label]) -> Self {
        let confusion_matrix = ConfusionMatrix::from_labels(y_true, y_pred);
        let classes = Label::ALL
            .into_iter()
            .map(|label| {
                let precision = confusion_matrix.precision(label);
                let recall = confusion_matrix.recall(label);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassReport {
                    label,
                    precision,
                    recall,
                    f1,
                    support: confusion_matrix.support(label),
                }
            })
            .collect();

        Self {
            recall_macro: confusion_matrix.recall_macro(),
            classes,
            confusion_matrix,
        }
    }

    pub fn class(&self, label: Label) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.label == label)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_types::Label::{Fraud as F, Legitimate as L};

    #[test]
    fn confusion_matrix_counts() {
        let cm = ConfusionMatrix::from_labels(&[L, L, F, F, F], &[L, F, F, L, F]);
        assert_eq!(cm.get(L, L), 1);
        assert_eq!(cm.get(L, F), 1);
        assert_eq!(cm.get(F, L), 1);
        assert_eq!(cm.get(F, F), 2);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn macro_recall_penalizes_ignoring_the_minority() {
        let y_true = [L, L, L, L, L, L, L, L, L, F];
        let all_legit = [L; 10];
        // accuracy would be 0.9; macro recall is (1.0 + 0.0) / 2
        assert!((recall_macro(&y_true, &all_legit) - 0.5).abs() < 1e-12);

        let mut perfect = [L; 10];
        perfect[9] = F;
        assert_eq!(recall_macro(&y_true, &perfect), 1.0);
    }

    #[test]
    fn macro_recall_only_counts_present_classes() {
        assert_eq!(recall_macro(&[L, L], &[L, L]), 1.0);
        assert_eq!(recall_macro(&[], &[]), 0.0);
    }

    #[test]
    fn evaluation_report_matches_hand_computation() {
        let report = EvaluationReport::evaluate(&[L, L, L, F, F], &[L, L, F, F, L]);

        let fraud = report.class(F).unwrap();
        assert_eq!(fraud.support, 2);
        assert!((fraud.precision - 0.5).abs() < 1e-12);
        assert!((fraud.recall - 0.5).abs() < 1e-12);
        assert!((fraud.f1 - 0.5).abs() < 1e-12);

        let legit = report.class(L).unwrap();
        assert_eq!(legit.support, 3);
        assert!((legit.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.recall_macro - (0.5 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_division_reports_zero() {
        let report = EvaluationReport::evaluate(&[L, F], &[L, L]);
        let fraud = report.class(F).unwrap();
        assert_eq!(fraud.precision, 0.0);
        assert_eq!(fraud.f1, 0.0);
    }
}
