//! Ranking a score vector into the response the API returns

use crate::disease::{self, DiseaseInfo};
use serde::Serialize;

/// One class and its confidence, in percent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class: String,
    pub confidence: f64,
}

/// A complete, successful classification
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub predicted_class: String,
    pub confidence: f64,

    /// Every class, highest confidence first
    pub all_predictions: Vec<ClassScore>,
    pub is_healthy: bool,
    pub disease_info: DiseaseInfo,
}

impl Prediction {
    /// `scores` are probabilities aligned with `classes`. Equal confidences
    /// keep class-list order, so the arg-max is the first maximal class.
    ///
    /// Callers guarantee the two slices have the same, non-zero length.
    pub fn from_scores(scores: &[f32], classes: &[String]) -> Self {
        debug_assert_eq!(scores.len(), classes.len());
        debug_assert!(!classes.is_empty());

        let mut ranked: Vec<(usize, f64)> = scores
            .iter()
            .map(|p| 100.0 * f64::from(*p))
            .enumerate()
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let all_predictions: Vec<ClassScore> = ranked
            .into_iter()
            .map(|(i, confidence)| ClassScore {
                class: classes[i].clone(),
                confidence,
            })
            .collect();

        let top = &all_predictions[0];
        let predicted_class = top.class.clone();
        let confidence = top.confidence;

        Prediction {
            is_healthy: predicted_class.eq_ignore_ascii_case("healthy"),
            disease_info: disease::lookup(&predicted_class).clone(),
            predicted_class,
            confidence,
            all_predictions,
        }
    }
}
