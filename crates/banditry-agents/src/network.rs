//! Reward prediction networks for per-arm bandit agents
//!
//! Networks are small feed-forward stacks built directly on ndarray. Each one
//! exposes its parameters as a single flat vector, and `backward` returns the
//! gradient in that same order so optimizers can treat every network alike.

use ndarray::{concatenate, s, Array1, Array2, Array3, Axis};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use banditry_core::{BanditError, ObservationSpec, PerArmObservation, Result};

/// Network that predicts one reward per arm
pub trait RewardNetwork: Send + Sync {
    /// Architecture name, stored in checkpoints
    fn name(&self) -> &str;

    /// Observation spec the network was built for
    fn input_spec(&self) -> ObservationSpec;

    /// Predicted rewards, `[batch, num_arms]`
    fn predict(&self, observation: &PerArmObservation) -> Result<Array2<f32>>;

    /// Gradient of `sum(grad_predictions * predict(observation))` with
    /// respect to the flat parameter vector
    fn backward(
        &self,
        observation: &PerArmObservation,
        grad_predictions: &Array2<f32>,
    ) -> Result<Vec<f32>>;

    /// Total number of trainable parameters
    fn num_parameters(&self) -> usize;

    /// Flat copy of all parameters
    fn parameters(&self) -> Vec<f32>;

    /// Overwrite all parameters from a flat vector
    fn set_parameters(&mut self, params: &[f32]) -> Result<()>;
}

/// Activation function of a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// `max(0, x)`
    Relu,
    /// Identity
    Linear,
}

impl Activation {
    fn apply(self, x: &Array2<f32>) -> Array2<f32> {
        match self {
            Self::Relu => x.mapv(|v| v.max(0.0)),
            Self::Linear => x.clone(),
        }
    }

    fn backward(self, pre_activation: &Array2<f32>, grad_out: &Array2<f32>) -> Array2<f32> {
        match self {
            Self::Relu => {
                let mask = pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                grad_out * &mask
            }
            Self::Linear => grad_out.clone(),
        }
    }
}

/// Fully connected layer
#[derive(Debug, Clone)]
pub struct Dense {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

/// Values saved by `Dense::forward` for the backward pass
#[derive(Debug, Clone)]
pub struct DenseCache {
    input: Array2<f32>,
    pre_activation: Array2<f32>,
}

/// Parameter gradients of one dense layer
#[derive(Debug, Clone)]
pub struct DenseGrads {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl DenseGrads {
    fn flatten_into(&self, out: &mut Vec<f32>) {
        out.extend(self.weights.iter());
        out.extend(self.bias.iter());
    }
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    pub fn new(in_dim: usize, out_dim: usize, activation: Activation, rng: &mut dyn RngCore) -> Self {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let weights = Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(out_dim),
            activation,
        }
    }

    /// Input width
    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Output width
    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass over a `[rows, in_dim]` batch
    #[must_use]
    pub fn forward(&self, input: &Array2<f32>) -> (Array2<f32>, DenseCache) {
        let pre_activation = input.dot(&self.weights) + &self.bias;
        let output = self.activation.apply(&pre_activation);
        (
            output,
            DenseCache {
                input: input.clone(),
                pre_activation,
            },
        )
    }

    /// Backward pass: gradient with respect to the input, plus parameter gradients
    #[must_use]
    pub fn backward(&self, cache: &DenseCache, grad_out: &Array2<f32>) -> (Array2<f32>, DenseGrads) {
        let grad_pre = self.activation.backward(&cache.pre_activation, grad_out);
        let grads = DenseGrads {
            weights: cache.input.t().dot(&grad_pre),
            bias: grad_pre.sum_axis(Axis(0)),
        };
        (grad_pre.dot(&self.weights.t()), grads)
    }

    fn num_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    fn write_parameters(&self, out: &mut Vec<f32>) {
        out.extend(self.weights.iter());
        out.extend(self.bias.iter());
    }

    /// Read this layer's parameters from the front of `params`; returns the rest
    fn read_parameters<'a>(&mut self, params: &'a [f32]) -> Result<&'a [f32]> {
        let (w, b) = (self.weights.len(), self.bias.len());
        if params.len() < w + b {
            return Err(BanditError::DimensionMismatch {
                expected: w + b,
                actual: params.len(),
            });
        }
        self.weights = Array2::from_shape_vec(self.weights.dim(), params[..w].to_vec())
            .map_err(|e| BanditError::Computation(e.to_string()))?;
        self.bias = Array1::from(params[w..w + b].to_vec());
        Ok(&params[w + b..])
    }
}

/// Stack of dense layers
///
/// Hidden layers use ReLU; the last layer uses `last_activation`.
#[derive(Debug, Clone)]
pub struct Tower {
    input_dim: usize,
    layers: Vec<Dense>,
}

impl Tower {
    /// Build a tower with the given layer widths
    pub fn new(
        input_dim: usize,
        layer_sizes: &[usize],
        last_activation: Activation,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        if layer_sizes.contains(&0) {
            return Err(BanditError::InvalidParameter(format!(
                "layer sizes must be positive: {layer_sizes:?}"
            )));
        }

        let mut layers = Vec::with_capacity(layer_sizes.len());
        let mut prev = input_dim;
        for (i, &size) in layer_sizes.iter().enumerate() {
            let activation = if i + 1 == layer_sizes.len() {
                last_activation
            } else {
                Activation::Relu
            };
            layers.push(Dense::new(prev, size, activation, rng));
            prev = size;
        }
        Ok(Self { input_dim, layers })
    }

    /// Output width (the input width for an empty tower)
    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(self.input_dim, Dense::out_dim)
    }

    /// Forward pass
    #[must_use]
    pub fn forward(&self, input: &Array2<f32>) -> (Array2<f32>, Vec<DenseCache>) {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut hidden = input.clone();
        for layer in &self.layers {
            let (out, cache) = layer.forward(&hidden);
            caches.push(cache);
            hidden = out;
        }
        (hidden, caches)
    }

    /// Backward pass; parameter gradients come back in layer order
    #[must_use]
    pub fn backward(&self, caches: &[DenseCache], grad_out: &Array2<f32>) -> (Array2<f32>, Vec<DenseGrads>) {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut grad = grad_out.clone();
        for (layer, cache) in self.layers.iter().zip(caches).rev() {
            let (grad_in, layer_grads) = layer.backward(cache, &grad);
            grads.push(layer_grads);
            grad = grad_in;
        }
        grads.reverse();
        (grad, grads)
    }

    fn num_parameters(&self) -> usize {
        self.layers.iter().map(Dense::num_parameters).sum()
    }

    fn write_parameters(&self, out: &mut Vec<f32>) {
        for layer in &self.layers {
            layer.write_parameters(out);
        }
    }

    fn read_parameters<'a>(&mut self, mut params: &'a [f32]) -> Result<&'a [f32]> {
        for layer in &mut self.layers {
            params = layer.read_parameters(params)?;
        }
        Ok(params)
    }
}

fn flatten(groups: &[&[DenseGrads]], capacity: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(capacity);
    for grads in groups {
        for g in *grads {
            g.flatten_into(&mut out);
        }
    }
    out
}

/// Checks an observation against the network spec and unpacks it
fn unpack<'a>(
    spec: &ObservationSpec,
    observation: &'a PerArmObservation,
) -> Result<(&'a Array2<f32>, &'a Array3<f32>)> {
    let arms = observation.per_arm_features()?;
    if observation.global.ncols() != spec.global_dim {
        return Err(BanditError::DimensionMismatch {
            expected: spec.global_dim,
            actual: observation.global.ncols(),
        });
    }
    let arm_dim = spec.per_arm_dim.unwrap_or_default();
    if arms.len_of(Axis(2)) != arm_dim {
        return Err(BanditError::DimensionMismatch {
            expected: arm_dim,
            actual: arms.len_of(Axis(2)),
        });
    }
    Ok((&observation.global, arms))
}

/// `[batch, arms, dim]` to `[batch * arms, dim]`
fn flatten_arms(arms: &Array3<f32>) -> Result<Array2<f32>> {
    let (b, k, a) = arms.dim();
    Array2::from_shape_vec((b * k, a), arms.iter().copied().collect())
        .map_err(|e| BanditError::Computation(e.to_string()))
}

/// `[batch * arms, 1]` (or any `batch * arms` values) to `[batch, arms]`
fn unflatten_rewards(values: &Array2<f32>, batch: usize, arms: usize) -> Result<Array2<f32>> {
    Array2::from_shape_vec((batch, arms), values.iter().copied().collect())
        .map_err(|e| BanditError::Computation(e.to_string()))
}

fn require_per_arm(spec: &ObservationSpec) -> Result<usize> {
    spec.per_arm_dim.ok_or_else(|| {
        BanditError::MissingFeature("reward network needs per-arm features in its spec".to_string())
    })
}

/// Shared-tower network
///
/// The global tower output is tiled over arms and concatenated with each
/// arm's tower output; a common tower and a 1-unit linear head turn the
/// result into one reward per arm.
#[derive(Debug, Clone)]
pub struct CommonTowerNetwork {
    spec: ObservationSpec,
    global_tower: Tower,
    arm_tower: Tower,
    common_tower: Tower,
    head: Dense,
}

struct CommonTowerCache {
    batch: usize,
    arms: usize,
    global: Vec<DenseCache>,
    arm: Vec<DenseCache>,
    common: Vec<DenseCache>,
    head: DenseCache,
}

impl CommonTowerNetwork {
    /// Name stored in checkpoints
    pub const NAME: &'static str = "commontower";

    /// Create a common-tower network
    pub fn new(
        spec: &ObservationSpec,
        global_layers: &[usize],
        arm_layers: &[usize],
        common_layers: &[usize],
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        let arm_dim = require_per_arm(spec)?;
        let global_tower = Tower::new(spec.global_dim, global_layers, Activation::Relu, rng)?;
        let arm_tower = Tower::new(arm_dim, arm_layers, Activation::Relu, rng)?;
        let joint_dim = global_tower.output_dim() + arm_tower.output_dim();
        let common_tower = Tower::new(joint_dim, common_layers, Activation::Relu, rng)?;
        let head = Dense::new(common_tower.output_dim(), 1, Activation::Linear, rng);

        Ok(Self {
            spec: *spec,
            global_tower,
            arm_tower,
            common_tower,
            head,
        })
    }

    fn forward(&self, observation: &PerArmObservation) -> Result<(Array2<f32>, CommonTowerCache)> {
        let (global, arms) = unpack(&self.spec, observation)?;
        let (batch, num_arms, _) = arms.dim();

        let (global_out, global_cache) = self.global_tower.forward(global);
        let (arm_out, arm_cache) = self.arm_tower.forward(&flatten_arms(arms)?);

        let tiled = Array2::from_shape_fn((batch * num_arms, global_out.ncols()), |(r, j)| {
            global_out[[r / num_arms, j]]
        });
        let joint = concatenate(Axis(1), &[tiled.view(), arm_out.view()])
            .map_err(|e| BanditError::Computation(e.to_string()))?;

        let (common_out, common_cache) = self.common_tower.forward(&joint);
        let (rewards, head_cache) = self.head.forward(&common_out);

        Ok((
            unflatten_rewards(&rewards, batch, num_arms)?,
            CommonTowerCache {
                batch,
                arms: num_arms,
                global: global_cache,
                arm: arm_cache,
                common: common_cache,
                head: head_cache,
            },
        ))
    }
}

impl RewardNetwork for CommonTowerNetwork {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn input_spec(&self) -> ObservationSpec {
        self.spec
    }

    fn predict(&self, observation: &PerArmObservation) -> Result<Array2<f32>> {
        self.forward(observation).map(|(rewards, _)| rewards)
    }

    fn backward(
        &self,
        observation: &PerArmObservation,
        grad_predictions: &Array2<f32>,
    ) -> Result<Vec<f32>> {
        let (rewards, cache) = self.forward(observation)?;
        if grad_predictions.dim() != rewards.dim() {
            return Err(BanditError::DimensionMismatch {
                expected: rewards.len(),
                actual: grad_predictions.len(),
            });
        }
        let rows = cache.batch * cache.arms;

        let grad_head = unflatten_rewards(grad_predictions, rows, 1)?;
        let (grad_common, head_grads) = self.head.backward(&cache.head, &grad_head);
        let (grad_joint, common_grads) = self.common_tower.backward(&cache.common, &grad_common);

        let global_width = self.global_tower.output_dim();
        let grad_tiled = grad_joint.slice(s![.., ..global_width]);
        let grad_arm = grad_joint.slice(s![.., global_width..]).to_owned();

        let mut grad_global = Array2::zeros((cache.batch, global_width));
        for r in 0..rows {
            let mut row = grad_global.row_mut(r / cache.arms);
            row += &grad_tiled.row(r);
        }

        let (_, global_grads) = self.global_tower.backward(&cache.global, &grad_global);
        let (_, arm_grads) = self.arm_tower.backward(&cache.arm, &grad_arm);

        Ok(flatten(
            &[
                global_grads.as_slice(),
                arm_grads.as_slice(),
                common_grads.as_slice(),
                std::slice::from_ref(&head_grads),
            ],
            self.num_parameters(),
        ))
    }

    fn num_parameters(&self) -> usize {
        self.global_tower.num_parameters()
            + self.arm_tower.num_parameters()
            + self.common_tower.num_parameters()
            + self.head.num_parameters()
    }

    fn parameters(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_parameters());
        self.global_tower.write_parameters(&mut out);
        self.arm_tower.write_parameters(&mut out);
        self.common_tower.write_parameters(&mut out);
        self.head.write_parameters(&mut out);
        out
    }

    fn set_parameters(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.num_parameters() {
            return Err(BanditError::DimensionMismatch {
                expected: self.num_parameters(),
                actual: params.len(),
            });
        }
        let rest = self.global_tower.read_parameters(params)?;
        let rest = self.arm_tower.read_parameters(rest)?;
        let rest = self.common_tower.read_parameters(rest)?;
        self.head.read_parameters(rest)?;
        Ok(())
    }
}

/// Dot-product network
///
/// The predicted reward of an arm is the dot product of the global tower
/// output and that arm's tower output. Both towers end in a linear layer of
/// the same width.
#[derive(Debug, Clone)]
pub struct DotProductNetwork {
    spec: ObservationSpec,
    global_tower: Tower,
    arm_tower: Tower,
}

struct DotProductCache {
    batch: usize,
    arms: usize,
    global_out: Array2<f32>,
    arm_out: Array2<f32>,
    global: Vec<DenseCache>,
    arm: Vec<DenseCache>,
}

impl DotProductNetwork {
    /// Name stored in checkpoints
    pub const NAME: &'static str = "dotproduct";

    /// Create a dot-product network
    pub fn new(
        spec: &ObservationSpec,
        global_layers: &[usize],
        arm_layers: &[usize],
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        let arm_dim = require_per_arm(spec)?;
        let global_tower = Tower::new(spec.global_dim, global_layers, Activation::Linear, rng)?;
        let arm_tower = Tower::new(arm_dim, arm_layers, Activation::Linear, rng)?;
        if global_tower.output_dim() != arm_tower.output_dim() {
            return Err(BanditError::InvalidParameter(format!(
                "global and arm towers must end in the same width, got {} and {}",
                global_tower.output_dim(),
                arm_tower.output_dim()
            )));
        }

        Ok(Self {
            spec: *spec,
            global_tower,
            arm_tower,
        })
    }

    fn forward(&self, observation: &PerArmObservation) -> Result<(Array2<f32>, DotProductCache)> {
        let (global, arms) = unpack(&self.spec, observation)?;
        let (batch, num_arms, _) = arms.dim();

        let (global_out, global_cache) = self.global_tower.forward(global);
        let (arm_out, arm_cache) = self.arm_tower.forward(&flatten_arms(arms)?);

        let rewards = Array2::from_shape_fn((batch, num_arms), |(b, k)| {
            global_out.row(b).dot(&arm_out.row(b * num_arms + k))
        });

        Ok((
            rewards,
            DotProductCache {
                batch,
                arms: num_arms,
                global_out,
                arm_out,
                global: global_cache,
                arm: arm_cache,
            },
        ))
    }
}

impl RewardNetwork for DotProductNetwork {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn input_spec(&self) -> ObservationSpec {
        self.spec
    }

    fn predict(&self, observation: &PerArmObservation) -> Result<Array2<f32>> {
        self.forward(observation).map(|(rewards, _)| rewards)
    }

    fn backward(
        &self,
        observation: &PerArmObservation,
        grad_predictions: &Array2<f32>,
    ) -> Result<Vec<f32>> {
        let (rewards, cache) = self.forward(observation)?;
        if grad_predictions.dim() != rewards.dim() {
            return Err(BanditError::DimensionMismatch {
                expected: rewards.len(),
                actual: grad_predictions.len(),
            });
        }

        let mut grad_global = Array2::zeros(cache.global_out.dim());
        let mut grad_arm = Array2::zeros(cache.arm_out.dim());
        for b in 0..cache.batch {
            for k in 0..cache.arms {
                let g = grad_predictions[[b, k]];
                let r = b * cache.arms + k;
                grad_global
                    .row_mut(b)
                    .scaled_add(g, &cache.arm_out.row(r));
                grad_arm
                    .row_mut(r)
                    .scaled_add(g, &cache.global_out.row(b));
            }
        }

        let (_, global_grads) = self.global_tower.backward(&cache.global, &grad_global);
        let (_, arm_grads) = self.arm_tower.backward(&cache.arm, &grad_arm);

        Ok(flatten(
            &[global_grads.as_slice(), arm_grads.as_slice()],
            self.num_parameters(),
        ))
    }

    fn num_parameters(&self) -> usize {
        self.global_tower.num_parameters() + self.arm_tower.num_parameters()
    }

    fn parameters(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_parameters());
        self.global_tower.write_parameters(&mut out);
        self.arm_tower.write_parameters(&mut out);
        out
    }

    fn set_parameters(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.num_parameters() {
            return Err(BanditError::DimensionMismatch {
                expected: self.num_parameters(),
                actual: params.len(),
            });
        }
        let rest = self.global_tower.read_parameters(params)?;
        self.arm_tower.read_parameters(rest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec() -> ObservationSpec {
        ObservationSpec::per_arm(4, 5, 3)
    }

    fn observation(rng: &mut StdRng, batch: usize, arms: usize) -> PerArmObservation {
        let global = Array2::from_shape_fn((batch, 4), |_| rng.gen_range(-2.0..2.0));
        let per_arm = Array3::from_shape_fn((batch, arms, 5), |_| rng.gen_range(-2.0..2.0));
        PerArmObservation::new(global, Some(per_arm)).unwrap()
    }

    /// Central finite differences of `sum(upstream * predict)`
    fn check_gradients(network: &mut dyn RewardNetwork, rng: &mut StdRng) {
        let obs = observation(rng, 2, 3);
        let upstream = Array2::from_shape_fn((2, 3), |_| rng.gen_range(-1.0..1.0));
        let analytic = network.backward(&obs, &upstream).unwrap();
        assert_eq!(analytic.len(), network.num_parameters());

        let params = network.parameters();
        let h = 1e-3_f32;
        for i in 0..params.len() {
            let mut plus = params.clone();
            plus[i] += h;
            network.set_parameters(&plus).unwrap();
            let f_plus = (&network.predict(&obs).unwrap() * &upstream).sum();

            let mut minus = params.clone();
            minus[i] -= h;
            network.set_parameters(&minus).unwrap();
            let f_minus = (&network.predict(&obs).unwrap() * &upstream).sum();

            let numeric = (f_plus - f_minus) / (2.0 * h);
            let tolerance = 2e-2 * (1.0 + numeric.abs());
            assert!(
                (numeric - analytic[i]).abs() < tolerance,
                "parameter {i}: numeric {numeric} vs analytic {}",
                analytic[i]
            );
        }
        network.set_parameters(&params).unwrap();
    }

    #[test]
    fn test_common_tower_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = CommonTowerNetwork::new(&spec(), &[4, 3], &[3, 4], &[4, 2], &mut rng).unwrap();
        let obs = observation(&mut rng, 16, 3);
        assert_eq!(net.predict(&obs).unwrap().dim(), (16, 3));

        // the same network scores a single chosen arm per row
        let single = observation(&mut rng, 5, 1);
        assert_eq!(net.predict(&single).unwrap().dim(), (5, 1));
        assert_eq!(net.parameters().len(), net.num_parameters());
        assert_eq!(net.name(), "commontower");
    }

    #[test]
    fn test_common_tower_gradients() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = CommonTowerNetwork::new(&spec(), &[4, 3], &[3, 4], &[4, 2], &mut rng).unwrap();
        check_gradients(&mut net, &mut rng);
    }

    #[test]
    fn test_dot_product_shapes_and_gradients() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut net = DotProductNetwork::new(&spec(), &[4, 3, 6], &[3, 4, 6], &mut rng).unwrap();
        let obs = observation(&mut rng, 7, 3);
        assert_eq!(net.predict(&obs).unwrap().dim(), (7, 3));
        check_gradients(&mut net, &mut rng);
    }

    #[test]
    fn test_dot_product_width_mismatch() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = DotProductNetwork::new(&spec(), &[4, 6], &[3, 5], &mut rng);
        assert!(matches!(result, Err(BanditError::InvalidParameter(_))));
    }

    #[test]
    fn test_requires_per_arm_features() {
        let mut rng = StdRng::seed_from_u64(4);
        let dropped = spec().without_per_arm_features();
        assert!(CommonTowerNetwork::new(&dropped, &[2], &[2], &[2], &mut rng).is_err());

        let net = CommonTowerNetwork::new(&spec(), &[2], &[2], &[2], &mut rng).unwrap();
        let obs = observation(&mut rng, 2, 3).without_per_arm_features();
        assert!(matches!(
            net.predict(&obs),
            Err(BanditError::MissingFeature(_))
        ));
    }

    #[test]
    fn test_parameter_roundtrip_preserves_predictions() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = CommonTowerNetwork::new(&spec(), &[4, 3], &[3, 4], &[4, 2], &mut rng).unwrap();
        let mut b = CommonTowerNetwork::new(&spec(), &[4, 3], &[3, 4], &[4, 2], &mut rng).unwrap();
        b.set_parameters(&a.parameters()).unwrap();

        let obs = observation(&mut rng, 3, 3);
        let pa = a.predict(&obs).unwrap();
        let pb = b.predict(&obs).unwrap();
        for (x, y) in pa.iter().zip(pb.iter()) {
            assert_abs_diff_eq!(x, y);
        }
        assert!(b.set_parameters(&[0.0; 3]).is_err());
    }

    #[test]
    fn test_dense_relu_blocks_negative_gradient() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut layer = Dense::new(1, 1, Activation::Relu, &mut rng);
        layer.read_parameters(&[1.0, -5.0]).unwrap();
        let input = Array2::from_elem((1, 1), 1.0);
        let (out, cache) = layer.forward(&input);
        assert_eq!(out[[0, 0]], 0.0);
        let (grad_in, grads) = layer.backward(&cache, &Array2::from_elem((1, 1), 1.0));
        assert_eq!(grad_in[[0, 0]], 0.0);
        assert_eq!(grads.weights[[0, 0]], 0.0);
    }
}
