//! Per-arm observations and observation specs
//!
//! A per-arm observation has two parts: a global context vector shared by
//! every arm, and a feature matrix holding one row per arm. Both are batched
//! along the first axis.

use ndarray::{concatenate, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::{BanditError, Result};

/// Shape of the observations an environment produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpec {
    /// Length of the global feature vector
    pub global_dim: usize,
    /// Length of each arm's feature vector (`None` when arm features are absent)
    pub per_arm_dim: Option<usize>,
    /// Number of arms per observation
    pub num_actions: usize,
}

impl ObservationSpec {
    /// Spec of a per-arm observation
    #[must_use]
    pub fn per_arm(global_dim: usize, per_arm_dim: usize, num_actions: usize) -> Self {
        Self {
            global_dim,
            per_arm_dim: Some(per_arm_dim),
            num_actions,
        }
    }

    /// Spec of the same observation once per-arm features are dropped
    #[must_use]
    pub fn without_per_arm_features(&self) -> Self {
        Self {
            per_arm_dim: None,
            ..*self
        }
    }

    /// Width of a global vector concatenated with one arm's features
    #[must_use]
    pub fn joint_dim(&self) -> usize {
        self.global_dim + self.per_arm_dim.unwrap_or(0)
    }
}

/// Spec of the time steps an environment emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStepSpec {
    /// Observation spec
    pub observation: ObservationSpec,
}

impl TimeStepSpec {
    /// Wrap an observation spec
    #[must_use]
    pub fn new(observation: ObservationSpec) -> Self {
        Self { observation }
    }
}

/// Batched observation with global and per-arm features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerArmObservation {
    /// Global features, `[batch, global_dim]`
    pub global: Array2<f32>,
    /// Arm features, `[batch, num_actions, per_arm_dim]`
    pub per_arm: Option<Array3<f32>>,
}

impl PerArmObservation {
    /// Build an observation, checking that both parts agree on the batch size
    pub fn new(global: Array2<f32>, per_arm: Option<Array3<f32>>) -> Result<Self> {
        if let Some(arms) = &per_arm {
            if arms.len_of(Axis(0)) != global.nrows() {
                return Err(BanditError::DimensionMismatch {
                    expected: global.nrows(),
                    actual: arms.len_of(Axis(0)),
                });
            }
        }
        Ok(Self { global, per_arm })
    }

    /// Number of batch elements
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.global.nrows()
    }

    /// Number of arms, if per-arm features are present
    #[must_use]
    pub fn num_actions(&self) -> Option<usize> {
        self.per_arm.as_ref().map(|a| a.len_of(Axis(1)))
    }

    /// Per-arm features, or `MissingFeature` when they were dropped
    pub fn per_arm_features(&self) -> Result<&Array3<f32>> {
        self.per_arm
            .as_ref()
            .ok_or_else(|| BanditError::MissingFeature("per-arm observation".to_string()))
    }

    /// Check the observation against a spec
    pub fn validate(&self, spec: &ObservationSpec) -> Result<()> {
        if self.global.ncols() != spec.global_dim {
            return Err(BanditError::DimensionMismatch {
                expected: spec.global_dim,
                actual: self.global.ncols(),
            });
        }
        match (spec.per_arm_dim, &self.per_arm) {
            (Some(dim), Some(arms)) => {
                let (_, k, a) = arms.dim();
                if k != spec.num_actions {
                    return Err(BanditError::DimensionMismatch {
                        expected: spec.num_actions,
                        actual: k,
                    });
                }
                if a != dim {
                    return Err(BanditError::DimensionMismatch {
                        expected: dim,
                        actual: a,
                    });
                }
                Ok(())
            }
            (Some(_), None) => Err(BanditError::MissingFeature(
                "per-arm observation".to_string(),
            )),
            (None, _) => Ok(()),
        }
    }

    /// Gather the feature row of the chosen arm for every batch element
    pub fn arm_features(&self, actions: &[usize]) -> Result<Array2<f32>> {
        let arms = self.per_arm_features()?;
        let (batch, k, dim) = arms.dim();
        if actions.len() != batch {
            return Err(BanditError::DimensionMismatch {
                expected: batch,
                actual: actions.len(),
            });
        }

        let mut chosen = Array2::zeros((batch, dim));
        for (b, &action) in actions.iter().enumerate() {
            if action >= k {
                return Err(BanditError::InvalidAction(format!(
                    "action {action} outside [0, {k})"
                )));
            }
            chosen.row_mut(b).assign(&arms.slice(ndarray::s![b, action, ..]));
        }
        Ok(chosen)
    }

    /// Copy of this observation with the per-arm features removed
    #[must_use]
    pub fn without_per_arm_features(&self) -> Self {
        Self {
            global: self.global.clone(),
            per_arm: None,
        }
    }

    /// Concatenate observations along the batch axis
    ///
    /// Per-arm features survive only if every part carries them.
    pub fn concatenate(parts: &[&PerArmObservation]) -> Result<Self> {
        if parts.is_empty() {
            return Err(BanditError::EmptyExperience);
        }

        let globals: Vec<_> = parts.iter().map(|p| p.global.view()).collect();
        let global = concatenate(Axis(0), &globals)
            .map_err(|e| BanditError::Computation(format!("global features: {e}")))?;

        let per_arm = if parts.iter().all(|p| p.per_arm.is_some()) {
            let arms: Vec<_> = parts
                .iter()
                .filter_map(|p| p.per_arm.as_ref().map(|a| a.view()))
                .collect();
            Some(
                concatenate(Axis(0), &arms)
                    .map_err(|e| BanditError::Computation(format!("per-arm features: {e}")))?,
            )
        } else {
            None
        };

        Ok(Self { global, per_arm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, arr3};
    use proptest::prelude::*;

    fn sample_observation() -> PerArmObservation {
        PerArmObservation::new(
            arr2(&[[1.0, 0.0], [0.0, 1.0]]),
            Some(arr3(&[
                [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
                [[7.0, 8.0, 9.0], [10.0, 11.0, 12.0]],
            ])),
        )
        .unwrap()
    }

    #[test]
    fn test_arm_features_gathers_chosen_rows() {
        let obs = sample_observation();
        let chosen = obs.arm_features(&[1, 0]).unwrap();
        assert_eq!(chosen, arr2(&[[4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]));
    }

    #[test]
    fn test_arm_features_rejects_bad_action() {
        let obs = sample_observation();
        assert!(matches!(
            obs.arm_features(&[2, 0]),
            Err(BanditError::InvalidAction(_))
        ));
        assert!(matches!(
            obs.arm_features(&[0]),
            Err(BanditError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let obs = sample_observation();
        assert!(obs.validate(&ObservationSpec::per_arm(2, 3, 2)).is_ok());
        assert!(obs.validate(&ObservationSpec::per_arm(2, 3, 4)).is_err());

        let dropped = obs.without_per_arm_features();
        assert!(matches!(
            dropped.validate(&ObservationSpec::per_arm(2, 3, 2)),
            Err(BanditError::MissingFeature(_))
        ));
        assert!(dropped
            .validate(&ObservationSpec::per_arm(2, 3, 2).without_per_arm_features())
            .is_ok());
    }

    #[test]
    fn test_batch_mismatch_rejected() {
        let result = PerArmObservation::new(
            arr2(&[[1.0, 0.0]]),
            Some(arr3(&[[[1.0]], [[2.0]]])),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_concatenate() {
        let a = sample_observation();
        let b = sample_observation();
        let joined = PerArmObservation::concatenate(&[&a, &b]).unwrap();
        assert_eq!(joined.batch_size(), 4);
        assert_eq!(joined.num_actions(), Some(2));

        let dropped = b.without_per_arm_features();
        let joined = PerArmObservation::concatenate(&[&a, &dropped]).unwrap();
        assert_eq!(joined.batch_size(), 4);
        assert!(joined.per_arm.is_none());
    }

    proptest! {
        #[test]
        fn prop_arm_features_match_chosen_slice(
            (batch, arms, dim, values, actions) in (1usize..5, 1usize..6, 1usize..4)
                .prop_flat_map(|(batch, arms, dim)| (
                    Just(batch),
                    Just(arms),
                    Just(dim),
                    prop::collection::vec(-5.0f32..5.0, batch * arms * dim),
                    prop::collection::vec(0..arms, batch),
                ))
        ) {
            let per_arm = Array3::from_shape_vec((batch, arms, dim), values).unwrap();
            let obs = PerArmObservation::new(Array2::zeros((batch, 1)), Some(per_arm.clone())).unwrap();
            let chosen = obs.arm_features(&actions).unwrap();

            prop_assert_eq!(chosen.dim(), (batch, dim));
            for (b, &action) in actions.iter().enumerate() {
                prop_assert_eq!(chosen.row(b), per_arm.slice(ndarray::s![b, action, ..]));
            }
        }
    }
}
