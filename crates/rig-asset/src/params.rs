/// What to do when the weights of a vertex do not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightDriftPolicy {
    /// Count and log the drift, keep the primitive.
    #[default]
    Warn,
    /// Fail validation on the first drifting vertex.
    Reject,
}

/// What to do when a joint is listed as a child of more than one joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentConflictPolicy {
    /// Keep the first candidate in bone order and log a warning.
    #[default]
    FirstMatch,
    /// Fail skin resolution.
    Reject,
}

#[derive(Debug, Clone)]
pub struct RigParams {
    pub weight_tolerance: f32,
    pub weight_drift: WeightDriftPolicy,
    pub parent_conflict: ParentConflictPolicy,
}

impl Default for RigParams {
    fn default() -> Self {
        Self {
            weight_tolerance: 1e-3,
            weight_drift: WeightDriftPolicy::default(),
            parent_conflict: ParentConflictPolicy::default(),
        }
    }
}

impl RigParams {
    /// Parameters that turn every soft anomaly into an error.
    pub fn strict() -> Self {
        Self {
            weight_drift: WeightDriftPolicy::Reject,
            parent_conflict: ParentConflictPolicy::Reject,
            ..Default::default()
        }
    }
}
