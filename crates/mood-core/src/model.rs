//! Binary preference model over item metadata.
//!
//! One categorical feature (the item's source tag), one-hot encoded over the
//! sorted vocabulary seen at training time. Unseen tags encode to the zero
//! vector and score from the intercept alone. The classifier is an
//! L2-regularized logistic regression with an unpenalized intercept and
//! class-balanced sample weights, fitted with damped Newton steps.
//!
//! Because every sample activates exactly one coefficient, the Hessian is an
//! arrow matrix (diagonal plus the intercept row and column) and each Newton
//! step is solved in closed form in O(categories).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_REGULARIZATION, DEFAULT_TOLERANCE, MIN_TRAINING_REACTIONS,
    UNTRAINED_SCORE,
};
use crate::emotion::Emotion;
use crate::item::Item;
use crate::time::now_iso8601;

/// One training row: a stored reaction joined with its item's source tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub emotion: Emotion,
    pub source: String,
}

impl TrainingSample {
    pub fn new(emotion: Emotion, source: &str) -> Self {
        Self {
            emotion,
            source: source.to_string(),
        }
    }

    fn target(&self) -> bool {
        self.emotion.is_positive()
    }
}

/// Fitting parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Minimum number of reactions before training is attempted.
    pub min_reactions: usize,
    /// Inverse L2 strength (`C`). Larger means weaker regularization.
    pub regularization: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the largest parameter step.
    pub tolerance: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_reactions: MIN_TRAINING_REACTIONS,
            regularization: DEFAULT_REGULARIZATION,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Why `train` declined to fit. The model state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainSkipped {
    TooFewReactions { found: usize, required: usize },
    SingleClass { found: usize, positive: bool },
}

impl fmt::Display for TrainSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainSkipped::TooFewReactions { found, required } => write!(
                f,
                "not enough data to train: {found} reactions collected, at least {required} needed"
            ),
            TrainSkipped::SingleClass { found, positive } => {
                let class = if *positive { "positive" } else { "negative" };
                write!(
                    f,
                    "not enough data to train: all {found} reactions are {class}, two distinct outcomes needed"
                )
            }
        }
    }
}

impl std::error::Error for TrainSkipped {}

/// Summary of a successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub samples: usize,
    pub positives: usize,
    pub categories: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Fitted encoder + classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Sorted, deduplicated source tags seen at training time.
    pub categories: Vec<String>,
    /// One coefficient per category, same order.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Pipeline {
    /// Index of the active one-hot column, `None` for an unseen tag.
    pub fn encode(&self, source: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(source))
            .ok()
    }

    /// Probability of the positive class for one source tag.
    pub fn predict_proba(&self, source: &str) -> f64 {
        let z = match self.encode(source) {
            Some(idx) => self.coefficients[idx] + self.intercept,
            None => self.intercept,
        };
        sigmoid(z)
    }
}

/// A trained pipeline plus what it was trained on.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainedModel {
    pub pipeline: Pipeline,
    pub samples: usize,
    pub positives: usize,
    pub trained_at: String,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum ModelState {
    #[default]
    Untrained,
    Trained(TrainedModel),
}

/// Scoring model with an explicit trained/untrained lifecycle.
///
/// Untrained models answer every prediction with [`UNTRAINED_SCORE`].
#[derive(Clone, Debug, Default)]
pub struct ScoringModel {
    state: ModelState,
    config: TrainingConfig,
}

impl ScoringModel {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            state: ModelState::Untrained,
            config,
        }
    }

    pub fn from_trained(trained: TrainedModel, config: TrainingConfig) -> Self {
        Self {
            state: ModelState::Trained(trained),
            config,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ModelState::Trained(_))
    }

    pub fn trained(&self) -> Option<&TrainedModel> {
        match &self.state {
            ModelState::Trained(t) => Some(t),
            ModelState::Untrained => None,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Drop any trained pipeline.
    pub fn reset(&mut self) {
        self.state = ModelState::Untrained;
    }

    /// Fit on `samples`, replacing any previous pipeline.
    ///
    /// Declines (state unchanged) with fewer than `min_reactions` samples or
    /// when every sample derives the same target.
    pub fn train(&mut self, samples: &[TrainingSample]) -> Result<TrainReport, TrainSkipped> {
        let positives = samples.iter().filter(|s| s.target()).count();

        if samples.len() < self.config.min_reactions {
            return Err(TrainSkipped::TooFewReactions {
                found: samples.len(),
                required: self.config.min_reactions,
            });
        }
        if positives == 0 || positives == samples.len() {
            return Err(TrainSkipped::SingleClass {
                found: samples.len(),
                positive: positives > 0,
            });
        }

        let fit = fit_pipeline(samples, positives, &self.config);
        let report = TrainReport {
            samples: samples.len(),
            positives,
            categories: fit.pipeline.categories.len(),
            iterations: fit.iterations,
            converged: fit.converged,
        };

        self.state = ModelState::Trained(TrainedModel {
            pipeline: fit.pipeline,
            samples: samples.len(),
            positives,
            trained_at: now_iso8601(),
        });
        Ok(report)
    }

    /// Positive-class probability per source tag, same order as the input.
    pub fn predict_scores<S: AsRef<str>>(&self, sources: &[S]) -> Vec<f64> {
        match &self.state {
            ModelState::Untrained => vec![UNTRAINED_SCORE; sources.len()],
            ModelState::Trained(t) => sources
                .iter()
                .map(|s| t.pipeline.predict_proba(s.as_ref()))
                .collect(),
        }
    }

    /// Score catalog items by their source tag.
    pub fn score_items(&self, items: &[Item]) -> Vec<f64> {
        let sources: Vec<&str> = items.iter().map(|i| i.source.as_str()).collect();
        self.predict_scores(&sources)
    }
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

struct Fit {
    pipeline: Pipeline,
    iterations: usize,
    converged: bool,
}

/// Per-category weighted totals: (sum of weights, sum of weights on positives).
struct Aggregates {
    categories: Vec<String>,
    totals: Vec<f64>,
    positive_mass: Vec<f64>,
}

fn aggregate(samples: &[TrainingSample], positives: usize) -> Aggregates {
    let n = samples.len() as f64;
    let negatives = samples.len() - positives;
    // Balanced weighting: n_samples / (n_classes * n_in_class)
    let w_pos = n / (2.0 * positives as f64);
    let w_neg = n / (2.0 * negatives as f64);

    let mut by_source: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for s in samples {
        let entry = by_source.entry(s.source.as_str()).or_insert((0.0, 0.0));
        if s.target() {
            entry.0 += w_pos;
            entry.1 += w_pos;
        } else {
            entry.0 += w_neg;
        }
    }

    let mut agg = Aggregates {
        categories: Vec::with_capacity(by_source.len()),
        totals: Vec::with_capacity(by_source.len()),
        positive_mass: Vec::with_capacity(by_source.len()),
    };
    for (source, (total, pos)) in by_source {
        agg.categories.push(source.to_string());
        agg.totals.push(total);
        agg.positive_mass.push(pos);
    }
    agg
}

fn objective(agg: &Aggregates, coef: &[f64], intercept: f64, lambda: f64) -> f64 {
    let mut loss = 0.0;
    for c in 0..coef.len() {
        let z = coef[c] + intercept;
        loss += agg.totals[c] * softplus(z) - agg.positive_mass[c] * z;
    }
    loss + 0.5 * lambda * coef.iter().map(|w| w * w).sum::<f64>()
}

fn fit_pipeline(samples: &[TrainingSample], positives: usize, config: &TrainingConfig) -> Fit {
    let agg = aggregate(samples, positives);
    let k = agg.categories.len();
    let lambda = 1.0 / config.regularization.max(f64::MIN_POSITIVE);

    let mut coef = vec![0.0; k];
    let mut intercept = 0.0;
    let mut iterations = 0;
    let mut converged = false;

    let mut grad = vec![0.0; k];
    let mut hess = vec![0.0; k];
    let mut step = vec![0.0; k];

    while iterations < config.max_iterations {
        iterations += 1;

        let mut grad_b = 0.0;
        for c in 0..k {
            let p = sigmoid(coef[c] + intercept);
            let residual = agg.totals[c] * p - agg.positive_mass[c];
            grad[c] = residual + lambda * coef[c];
            hess[c] = agg.totals[c] * p * (1.0 - p);
            grad_b += residual;
        }

        // Arrow-matrix solve: eliminate the coefficient block, then back-substitute.
        let mut schur = 0.0;
        let mut rhs = grad_b;
        for c in 0..k {
            let d = hess[c] + lambda;
            schur += hess[c] * lambda / d;
            rhs -= hess[c] * grad[c] / d;
        }
        if schur <= f64::EPSILON {
            break;
        }
        let step_b = rhs / schur;
        for c in 0..k {
            step[c] = (grad[c] - hess[c] * step_b) / (hess[c] + lambda);
        }

        // Backtracking keeps every accepted step a descent step.
        let current = objective(&agg, &coef, intercept, lambda);
        let mut t = 1.0;
        let mut next_coef = vec![0.0; k];
        loop {
            for c in 0..k {
                next_coef[c] = coef[c] - t * step[c];
            }
            let next_b = intercept - t * step_b;
            if objective(&agg, &next_coef, next_b, lambda) <= current || t < 1e-10 {
                break;
            }
            t *= 0.5;
        }

        let max_step = step
            .iter()
            .chain(std::iter::once(&step_b))
            .fold(0.0f64, |m, s| m.max((t * s).abs()));

        coef.copy_from_slice(&next_coef);
        intercept -= t * step_b;

        if max_step < config.tolerance {
            converged = true;
            break;
        }
    }

    Fit {
        pipeline: Pipeline {
            categories: agg.categories,
            coefficients: coef,
            intercept,
        },
        iterations,
        converged,
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn samples(spec: &[(&str, Emotion, usize)]) -> Vec<TrainingSample> {
        let mut out = Vec::new();
        for (source, emotion, count) in spec {
            for _ in 0..*count {
                out.push(TrainingSample::new(emotion.clone(), source));
            }
        }
        out
    }

    fn trained_model() -> ScoringModel {
        let mut model = ScoringModel::default();
        let data = samples(&[
            ("x", Emotion::Happy, 5),
            ("y", Emotion::Angry, 5),
        ]);
        model.train(&data).unwrap();
        model
    }

    #[test]
    fn test_untrained_scores_half() {
        let model = ScoringModel::default();
        assert!(!model.is_trained());
        let scores = model.predict_scores(&["a", "b", "c"]);
        assert_eq!(scores, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_untrained_empty_input() {
        let model = ScoringModel::default();
        let none: [&str; 0] = [];
        assert!(model.predict_scores(&none).is_empty());
    }

    #[test]
    fn test_nine_reactions_is_too_few() {
        let mut model = ScoringModel::default();
        let data = samples(&[("x", Emotion::Happy, 4), ("y", Emotion::Sad, 5)]);
        let err = model.train(&data).unwrap_err();
        assert_eq!(
            err,
            TrainSkipped::TooFewReactions {
                found: 9,
                required: 10
            }
        );
        assert!(!model.is_trained());
    }

    #[test]
    fn test_single_class_is_skipped() {
        let mut model = ScoringModel::default();
        let data = samples(&[("x", Emotion::Neutral, 6), ("y", Emotion::Angry, 6)]);
        let err = model.train(&data).unwrap_err();
        assert!(matches!(
            err,
            TrainSkipped::SingleClass {
                found: 12,
                positive: false
            }
        ));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_skip_keeps_previous_pipeline() {
        let mut model = trained_model();
        let before = model.trained().unwrap().pipeline.clone();
        let data = samples(&[("z", Emotion::Happy, 3)]);
        assert!(model.train(&data).is_err());
        assert_eq!(model.trained().unwrap().pipeline, before);
    }

    #[test]
    fn test_skip_message_mentions_counts() {
        let msg = TrainSkipped::TooFewReactions {
            found: 3,
            required: 10,
        }
        .to_string();
        assert!(msg.contains('3') && msg.contains("10"), "{msg}");
    }

    #[test]
    fn test_train_ranks_liked_source_higher() {
        let model = trained_model();
        assert!(model.is_trained());
        let scores = model.predict_scores(&["x", "y"]);
        assert!(scores[0] > 0.5, "x should score high: {}", scores[0]);
        assert!(scores[1] < 0.5, "y should score low: {}", scores[1]);
    }

    #[test]
    fn test_symmetric_data_gives_zero_intercept() {
        let model = trained_model();
        let pipeline = &model.trained().unwrap().pipeline;
        assert_relative_eq!(pipeline.intercept, 0.0, epsilon = 1e-8);
        assert_relative_eq!(
            pipeline.coefficients[0],
            -pipeline.coefficients[1],
            epsilon = 1e-8
        );
    }

    #[test]
    fn test_optimum_satisfies_first_order_condition() {
        // For x (5 happy, weight 1 each): 5*sigmoid(w) - 5 + w = 0 at the optimum.
        let model = trained_model();
        let w = model.trained().unwrap().pipeline.coefficients[0];
        assert_relative_eq!(5.0 * sigmoid(w) - 5.0 + w, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_unseen_source_uses_intercept_only() {
        let model = trained_model();
        let scores = model.predict_scores(&["never-seen"]);
        assert_relative_eq!(scores[0], 0.5, epsilon = 1e-8);
    }

    #[test]
    fn test_scores_within_unit_interval_and_ordered() {
        let mut model = ScoringModel::default();
        let data = samples(&[
            ("a", Emotion::Happy, 9),
            ("a", Emotion::Neutral, 1),
            ("b", Emotion::Angry, 12),
            ("c", Emotion::Surprise, 2),
            ("c", Emotion::Sad, 2),
        ]);
        let report = model.train(&data).unwrap();
        assert!(report.converged);
        assert_eq!(report.samples, 26);
        assert_eq!(report.positives, 11);
        assert_eq!(report.categories, 3);

        let input = ["b", "a", "zzz", "c", "a"];
        let scores = model.predict_scores(&input);
        assert_eq!(scores.len(), input.len());
        for s in &scores {
            assert!((0.0..=1.0).contains(s));
        }
        assert!(scores[1] > scores[3]);
        assert!(scores[3] > scores[0]);
        assert_eq!(scores[1], scores[4]);
    }

    #[test]
    fn test_balanced_weights_counter_imbalance() {
        // 2 positives vs 10 negatives on the same source: balanced weights make
        // both classes carry equal mass, so the fit lands near 0.5.
        let mut model = ScoringModel::default();
        let data = samples(&[("x", Emotion::Happy, 2), ("x", Emotion::Angry, 10)]);
        model.train(&data).unwrap();
        let score = model.predict_scores(&["x"])[0];
        assert_relative_eq!(score, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_retrain_replaces_pipeline() {
        let mut model = trained_model();
        let data = samples(&[("y", Emotion::Happy, 5), ("x", Emotion::Angry, 5)]);
        model.train(&data).unwrap();
        let scores = model.predict_scores(&["x", "y"]);
        assert!(scores[0] < 0.5 && scores[1] > 0.5);
    }

    #[test]
    fn test_custom_min_reactions() {
        let config = TrainingConfig {
            min_reactions: 2,
            ..TrainingConfig::default()
        };
        let mut model = ScoringModel::new(config);
        let data = samples(&[("x", Emotion::Happy, 1), ("y", Emotion::Fear, 1)]);
        assert!(model.train(&data).is_ok());
    }

    #[test]
    fn test_reset_returns_to_untrained() {
        let mut model = trained_model();
        model.reset();
        assert!(!model.is_trained());
        assert_eq!(model.predict_scores(&["x"]), vec![0.5]);
    }

    #[test]
    fn test_encode_sorted_vocabulary() {
        let model = trained_model();
        let pipeline = &model.trained().unwrap().pipeline;
        assert_eq!(pipeline.categories, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(pipeline.encode("y"), Some(1));
        assert_eq!(pipeline.encode("q"), None);
    }

    #[test]
    fn test_sigmoid_extremes_are_finite() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(softplus(800.0).is_finite());
        assert!(softplus(-800.0) >= 0.0);
    }
}
