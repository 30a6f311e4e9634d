//! Trajectory buffer for on-policy bandit training

use std::collections::VecDeque;

use banditry_core::{BanditError, Result, Trajectory};

/// FIFO buffer of batched trajectories
///
/// Holds at most `capacity` trajectories; pushing into a full buffer evicts
/// the oldest one.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer {
    buffer: VecDeque<Trajectory>,
    capacity: usize,
}

impl TrajectoryBuffer {
    /// Create a new buffer
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BanditError::InvalidParameter(
                "buffer capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Add a trajectory to the buffer
    pub fn push(&mut self, trajectory: Trajectory) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(trajectory);
    }

    /// All stored trajectories concatenated along the batch axis
    pub fn gather_all(&self) -> Result<Trajectory> {
        let parts: Vec<Trajectory> = self.buffer.iter().cloned().collect();
        Trajectory::concatenate(&parts)
    }

    /// Get the number of stored trajectories
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of trajectories
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banditry_core::{PerArmObservation, PolicyInfo};
    use ndarray::{arr1, Array2};

    fn trajectory(action: usize) -> Trajectory {
        Trajectory {
            observation: PerArmObservation::new(Array2::zeros((1, 2)), None).unwrap(),
            action: vec![action],
            reward: arr1(&[action as f32]),
            policy_info: PolicyInfo::default(),
        }
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut buffer = TrajectoryBuffer::new(2).unwrap();
        buffer.push(trajectory(0));
        buffer.push(trajectory(1));
        buffer.push(trajectory(2));
        assert_eq!(buffer.len(), 2);

        let all = buffer.gather_all().unwrap();
        assert_eq!(all.action, vec![1, 2]);
        assert_eq!(all.reward, arr1(&[1.0, 2.0]));
    }

    #[test]
    fn test_gather_empty_buffer() {
        let mut buffer = TrajectoryBuffer::new(1).unwrap();
        assert!(matches!(
            buffer.gather_all(),
            Err(BanditError::EmptyExperience)
        ));
        buffer.push(trajectory(0));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity() {
        assert!(TrajectoryBuffer::new(0).is_err());
    }
}
