use std::iter::zip;

use itertools::izip;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    scheme::Scheme,
};

/// Constant value of the bias node prepended to every layer.
pub const BIAS: f64 = -1.0;

pub fn sigmoid(x: f64) -> f64 {
    if x < -40.0 {
        0.0
    } else if x > 40.0 {
        1.0
    } else {
        1.0 / (1.0 + f64::exp(-x))
    }
}

/// Derivative of the sigmoid, expressed through its output `y = sigmoid(x)`.
fn sigmoid_prime_from_output(y: f64) -> f64 {
    y * (1.0 - y)
}

/// Shape of a network with a single output node.
///
/// Counts exclude the bias nodes; every layer gets one extra `-1` input on top of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub inputs: usize,
    pub hidden_layers: usize,
    pub hidden_nodes: usize,
}

impl Topology {
    pub fn new(inputs: usize, hidden_layers: usize, hidden_nodes: usize) -> Result<Self> {
        let topology = Self {
            inputs,
            hidden_layers,
            hidden_nodes,
        };

        topology.validate()?;

        Ok(topology)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs == 0 {
            return Err(Error::Topology("network needs at least one input".into()));
        }
        if self.hidden_layers == 0 {
            return Err(Error::Topology(
                "network needs at least one hidden layer".into(),
            ));
        }
        if self.hidden_nodes == 0 {
            return Err(Error::Topology(
                "hidden layers need at least one node".into(),
            ));
        }

        Ok(())
    }

    /// `(rows, cols)` of each weight matrix in feed order; rows are target nodes, cols
    /// are source nodes with the bias first.
    pub fn matrix_shapes(&self) -> Vec<(usize, usize)> {
        let mut shapes = Vec::with_capacity(self.hidden_layers + 1);

        shapes.push((self.hidden_nodes, self.inputs + 1));
        shapes.extend((1..self.hidden_layers).map(|_| (self.hidden_nodes, self.hidden_nodes + 1)));
        shapes.push((1, self.hidden_nodes + 1));

        shapes
    }

    /// Number of learnable weights. Bias nodes have no incoming weights.
    pub fn weight_count(&self) -> usize {
        self.matrix_shapes().iter().map(|(r, c)| r * c).sum()
    }
}

/// Activations recorded during one forward pass.
#[derive(Clone, Debug)]
pub struct Pass {
    /// Input of every weight matrix, bias node first.
    pub activations: Vec<DVector<f64>>,
    pub output: f64,
}

#[derive(Clone, Debug)]
pub struct Network {
    topology: Topology,
    alpha: f64,
    weights: Vec<DMatrix<f64>>,
    scheme: Option<Scheme>,
}

impl Network {
    /// Network whose weights are drawn independently from `[-1, 1)`.
    pub fn new_random<R: Rng + ?Sized>(topology: Topology, alpha: f64, rng: &mut R) -> Result<Self> {
        topology.validate()?;

        let weights = topology
            .matrix_shapes()
            .into_iter()
            .map(|(rows, cols)| DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0)))
            .collect();

        Ok(Network {
            topology,
            alpha,
            weights,
            scheme: None,
        })
    }

    /// Network whose initial weights follow `scheme`: equal letters get equal weights.
    pub fn from_scheme<R: Rng + ?Sized>(
        topology: Topology,
        alpha: f64,
        scheme: Scheme,
        rng: &mut R,
    ) -> Result<Self> {
        topology.validate()?;

        if scheme.len() != topology.weight_count() {
            return Err(Error::SchemeLength {
                expected: topology.weight_count(),
                actual: scheme.len(),
            });
        }

        let flat = scheme.draw_weights(rng);
        let mut network = Network {
            topology,
            alpha,
            weights: topology
                .matrix_shapes()
                .into_iter()
                .map(|(rows, cols)| DMatrix::zeros(rows, cols))
                .collect(),
            scheme: Some(scheme),
        };

        network.set_weights_flat(&flat)?;

        Ok(network)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn scheme(&self) -> Option<&Scheme> {
        self.scheme.as_ref()
    }

    pub fn weights(&self) -> &[DMatrix<f64>] {
        &self.weights
    }

    pub fn weight_count(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum()
    }

    /// All weights in scheme order: layer by layer, grouped by source node, then target.
    pub fn weights_flat(&self) -> Vec<f64> {
        self.weights
            .iter()
            .flat_map(|w| w.as_slice().iter().copied())
            .collect()
    }

    pub fn set_weights_flat(&mut self, flat: &[f64]) -> Result<()> {
        if flat.len() != self.weight_count() {
            return Err(Error::SchemeLength {
                expected: self.weight_count(),
                actual: flat.len(),
            });
        }

        let mut rest = flat;
        for w in &mut self.weights {
            let (head, tail) = rest.split_at(w.len());
            w.as_mut_slice().copy_from_slice(head);
            rest = tail;
        }

        Ok(())
    }

    /// Nudges tied weights toward their letter's average. Does nothing without a scheme.
    pub fn pull_scheme(&mut self) -> Result<()> {
        let Some(scheme) = &self.scheme else {
            return Ok(());
        };

        let mut flat = self.weights_flat();
        scheme.pull(&mut flat)?;

        self.set_weights_flat(&flat)
    }

    pub fn forward(&self, input: &[f64]) -> Result<Pass> {
        if input.len() != self.topology.inputs {
            return Err(Error::InputLength {
                expected: self.topology.inputs,
                actual: input.len(),
            });
        }

        let mut activation = DVector::from_column_slice(input);
        let mut activations = Vec::with_capacity(self.weights.len());

        for w in &self.weights {
            let a = activation.insert_row(0, BIAS);

            activation = (w * &a).map(sigmoid);
            activations.push(a);
        }

        Ok(Pass {
            activations,
            output: activation[0],
        })
    }

    pub fn feed_forward(&self, input: &[f64]) -> Result<f64> {
        self.forward(input).map(|pass| pass.output)
    }

    /// Per-weight gradient steps for one sample, shaped like [`Network::weights`], plus
    /// the output of the forward pass.
    ///
    /// Each entry is `activation × delta` with the delta signed toward the expected
    /// output, so adding `alpha` times it to the weights descends the squared error.
    pub fn back_prop(&self, input: &[f64], expected: f64) -> Result<(Vec<DMatrix<f64>>, f64)> {
        let Pass {
            activations,
            output,
        } = self.forward(input)?;

        let mut delta = DVector::from_element(1, (expected - output) * sigmoid_prime_from_output(output));
        let mut nablas: Vec<DMatrix<f64>> = self
            .weights
            .iter()
            .map(|w| DMatrix::zeros(w.nrows(), w.ncols()))
            .collect();

        if let (Some(nw), Some(a)) = (nablas.last_mut(), activations.last()) {
            *nw = &delta * a.transpose();
        }

        for (w, nw, a, a_next) in izip!(
            self.weights.iter().rev(),
            nablas.iter_mut().rev().skip(1),
            activations.iter().rev().skip(1),
            activations.iter().rev()
        ) {
            // `a_next` is the output of the layer `nw` feeds, behind its bias node.
            let sp = a_next
                .rows(1, a_next.nrows() - 1)
                .map(sigmoid_prime_from_output);

            delta = (w.transpose() * &delta).remove_row(0).component_mul(&sp);
            *nw = &delta * a.transpose();
        }

        Ok((nablas, output))
    }

    /// One stochastic gradient descent step. Returns the output before the update.
    pub fn train(&mut self, input: &[f64], expected: f64) -> Result<f64> {
        let (nablas, output) = self.back_prop(input, expected)?;
        let rate = self.alpha;

        zip(&mut self.weights, nablas).for_each(|(w, nw)| *w += nw * rate);

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn xor_topology() -> Topology {
        Topology::new(2, 2, 2).unwrap()
    }

    fn squared_error(network: &Network, input: &[f64], expected: f64) -> f64 {
        let out = network.feed_forward(input).unwrap();
        0.5 * (expected - out).powi(2)
    }

    #[test]
    fn sigmoid_is_clamped_and_centered() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(-100.0), 0.0);
        assert_eq!(sigmoid(100.0), 1.0);
        assert!((sigmoid_prime_from_output(sigmoid(0.0)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn weight_count_excludes_bias_targets() {
        // 3*2 + 1*3*2 + 3*1
        assert_eq!(xor_topology().weight_count(), 15);
        // 4*3 + 3
        assert_eq!(Topology::new(3, 1, 3).unwrap().weight_count(), 16);
        assert!(Topology::new(2, 0, 2).is_err());
        assert!(Topology::new(0, 1, 2).is_err());
    }

    #[test]
    fn flat_weights_round_through_matrices() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut network = Network::new_random(xor_topology(), 0.5, &mut rng).unwrap();
        let flat: Vec<f64> = (0..15).map(|i| i as f64 / 10.0).collect();

        network.set_weights_flat(&flat).unwrap();

        assert_eq!(network.weights_flat(), flat);
        // Column-major: the first column holds the bias node's outgoing weights.
        assert_eq!(network.weights()[0][(0, 0)], 0.0);
        assert_eq!(network.weights()[0][(1, 0)], 0.1);
        assert_eq!(network.weights()[0][(0, 1)], 0.2);
        assert!(network.set_weights_flat(&flat[1..]).is_err());
    }

    #[test]
    fn forward_matches_hand_computation() {
        let mut rng = StdRng::seed_from_u64(1);
        let topology = Topology::new(1, 1, 1).unwrap();
        let mut network = Network::new_random(topology, 0.5, &mut rng).unwrap();

        // hidden: bias weight 0.5, input weight 2.0; output: bias weight -1.0, hidden weight 1.5
        network.set_weights_flat(&[0.5, 2.0, -1.0, 1.5]).unwrap();

        let hidden = sigmoid(-0.5 + 2.0 * 0.3);
        let expected = sigmoid(1.0 + 1.5 * hidden);

        let pass = network.forward(&[0.3]).unwrap();
        assert!((pass.output - expected).abs() < 1e-12);
        assert_eq!(pass.activations.len(), 2);
        assert_eq!(pass.activations[1][0], BIAS);
        assert!((pass.activations[1][1] - hidden).abs() < 1e-12);
    }

    #[test]
    fn forward_rejects_wrong_input_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = Network::new_random(xor_topology(), 0.5, &mut rng).unwrap();

        assert!(matches!(
            network.forward(&[1.0]),
            Err(Error::InputLength {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn back_prop_matches_numeric_gradient() {
        let mut rng = StdRng::seed_from_u64(3);
        let network = Network::new_random(Topology::new(2, 3, 3).unwrap(), 0.5, &mut rng).unwrap();
        let input = [0.4, -0.7];
        let expected = 1.0;

        let (nablas, _) = network.back_prop(&input, expected).unwrap();
        let analytic: Vec<f64> = nablas
            .iter()
            .flat_map(|n| n.as_slice().iter().copied())
            .collect();

        let flat = network.weights_flat();
        let eps = 1e-6;

        for i in 0..flat.len() {
            let mut plus = network.clone();
            let mut minus = network.clone();
            let mut w = flat.clone();

            w[i] += eps;
            plus.set_weights_flat(&w).unwrap();
            w[i] -= 2.0 * eps;
            minus.set_weights_flat(&w).unwrap();

            let numeric = -(squared_error(&plus, &input, expected)
                - squared_error(&minus, &input, expected))
                / (2.0 * eps);

            assert!(
                (numeric - analytic[i]).abs() < 1e-6,
                "weight {i}: numeric {numeric}, analytic {}",
                analytic[i]
            );
        }
    }

    #[test]
    fn training_step_reduces_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut network = Network::new_random(xor_topology(), 0.5, &mut rng).unwrap();
        let before = squared_error(&network, &[1.0, -1.0], 1.0);

        network.set_alpha(0.1);
        network.train(&[1.0, -1.0], 1.0).unwrap();

        assert!(squared_error(&network, &[1.0, -1.0], 1.0) < before);
    }

    #[test]
    fn scheme_ties_initial_weights() {
        let mut rng = StdRng::seed_from_u64(11);
        let topology = Topology::new(1, 1, 1).unwrap();
        let scheme: Scheme = "ABBA".parse().unwrap();
        let network = Network::from_scheme(topology, 0.5, scheme, &mut rng).unwrap();
        let flat = network.weights_flat();

        assert_eq!(flat[0], flat[3]);
        assert_eq!(flat[1], flat[2]);
        assert_ne!(flat[0], flat[1]);
    }

    #[test]
    fn scheme_length_must_match() {
        let mut rng = StdRng::seed_from_u64(11);
        let scheme = Scheme::uniform(3).unwrap();

        assert!(matches!(
            Network::from_scheme(Topology::new(1, 1, 1).unwrap(), 0.5, scheme, &mut rng),
            Err(Error::SchemeLength {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn pull_scheme_draws_tied_weights_together() {
        let mut rng = StdRng::seed_from_u64(2);
        let topology = Topology::new(1, 1, 1).unwrap();
        let scheme: Scheme = "AABB".parse().unwrap();
        let mut network = Network::from_scheme(topology, 0.5, scheme, &mut rng).unwrap();

        network.set_weights_flat(&[0.2, 0.6, -0.4, 0.0]).unwrap();
        network.pull_scheme().unwrap();

        let flat = network.weights_flat();
        let expected = [0.3, 0.5, -0.3, -0.1];
        for (got, want) in zip(&flat, &expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn pull_without_scheme_is_noop() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut network = Network::new_random(xor_topology(), 0.5, &mut rng).unwrap();
        let before = network.weights_flat();

        network.pull_scheme().unwrap();

        assert_eq!(network.weights_flat(), before);
    }
}
