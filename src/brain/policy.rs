//! Learned policy: a small feed-forward network and its lifecycle
//!
//! Architecture: 16 snapshot features -> hidden (tanh) -> 16 action
//! probabilities (softmax), plus a scalar value head (tanh).
//!
//! Initialisation may run on a blocking tokio task. Until it reports back
//! the villager decides rule-only; a failed initialisation is permanent for
//! the session.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::actions::catalog::ActionKind;
use crate::brain::perception::FEATURE_COUNT;
use crate::core::error::{BrainError, Result};

const ACTION_COUNT: usize = ActionKind::COUNT;

/// Weights are clamped to this magnitude after every update
const WEIGHT_LIMIT: f32 = 5.0;

/// Output of one forward pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutput {
    /// Probability per action slot, sums to 1
    pub probabilities: [f32; ACTION_COUNT],
    /// Estimated reward of the current state, [-1, 1]
    pub value: f32,
}

impl PolicyOutput {
    pub fn probability(&self, action: ActionKind) -> f32 {
        self.probabilities[action.index()]
    }

    /// Highest-probability action; the lowest slot wins ties
    pub fn argmax(&self) -> ActionKind {
        let mut best = 0;
        for (i, p) in self.probabilities.iter().enumerate() {
            if *p > self.probabilities[best] {
                best = i;
            }
        }
        ActionKind::from_index(best).unwrap_or(ActionKind::Idle)
    }
}

/// Backend seam for the learned path
pub trait PolicyModel: Send + fmt::Debug {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<PolicyOutput>;

    /// One online update toward `target` probabilities and `value_target`
    fn fit(
        &mut self,
        features: &[f32; FEATURE_COUNT],
        target: &[f32; ACTION_COUNT],
        value_target: f32,
        learning_rate: f32,
    ) -> Result<()>;

    /// Export parameters as JSON
    fn to_json(&self) -> Result<String>;
}

/// Policy network with a value head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyNetwork {
    hidden_dim: usize,
    /// Input -> hidden (hidden_dim x FEATURE_COUNT)
    w1: Vec<Vec<f32>>,
    b1: Vec<f32>,
    /// Hidden -> action logits (ACTION_COUNT x hidden_dim)
    w2: Vec<Vec<f32>>,
    b2: Vec<f32>,
    /// Hidden -> value
    wv: Vec<f32>,
    bv: f32,
}

impl PolicyNetwork {
    /// Xavier-like initialisation from a seeded RNG
    pub fn new(hidden_dim: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scale1 = std::f32::consts::SQRT_2 / (FEATURE_COUNT as f32).sqrt();
        let scale2 = std::f32::consts::SQRT_2 / (hidden_dim.max(1) as f32).sqrt();

        let w1 = (0..hidden_dim)
            .map(|_| (0..FEATURE_COUNT).map(|_| rng.gen_range(-1.0f32..1.0) * scale1).collect())
            .collect();
        let w2 = (0..ACTION_COUNT)
            .map(|_| (0..hidden_dim).map(|_| rng.gen_range(-1.0f32..1.0) * scale2).collect())
            .collect();
        let wv = (0..hidden_dim).map(|_| rng.gen_range(-1.0f32..1.0) * scale2).collect();

        Self {
            hidden_dim,
            w1,
            b1: vec![0.0; hidden_dim],
            w2,
            b2: vec![0.0; ACTION_COUNT],
            wv,
            bv: 0.0,
        }
    }

    fn forward(&self, input: &[f32; FEATURE_COUNT]) -> (Vec<f32>, [f32; ACTION_COUNT], f32) {
        let hidden: Vec<f32> = self
            .w1
            .iter()
            .zip(&self.b1)
            .map(|(row, b)| (b + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>()).tanh())
            .collect();

        let mut logits = [0.0f32; ACTION_COUNT];
        for (i, logit) in logits.iter_mut().enumerate() {
            *logit = self.b2[i] + self.w2[i].iter().zip(&hidden).map(|(w, h)| w * h).sum::<f32>();
        }

        let value = (self.bv + self.wv.iter().zip(&hidden).map(|(w, h)| w * h).sum::<f32>()).tanh();
        (hidden, logits, value)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let network: PolicyNetwork = serde_json::from_str(json)?;
        network.check_shape()?;
        Ok(network)
    }

    fn check_shape(&self) -> Result<()> {
        let h = self.hidden_dim;
        let ok = self.w1.len() == h
            && self.w1.iter().all(|r| r.len() == FEATURE_COUNT)
            && self.b1.len() == h
            && self.w2.len() == ACTION_COUNT
            && self.w2.iter().all(|r| r.len() == h)
            && self.b2.len() == ACTION_COUNT
            && self.wv.len() == h;
        if ok {
            Ok(())
        } else {
            Err(BrainError::PolicyInit("network parameters have inconsistent shapes".into()))
        }
    }
}

impl PolicyModel for PolicyNetwork {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<PolicyOutput> {
        let (_, logits, value) = self.forward(features);
        let probabilities = softmax(&logits);
        if !value.is_finite() || probabilities.iter().any(|p| !p.is_finite()) {
            return Err(BrainError::Inference("network produced non-finite output".into()));
        }
        Ok(PolicyOutput { probabilities, value })
    }

    fn fit(
        &mut self,
        features: &[f32; FEATURE_COUNT],
        target: &[f32; ACTION_COUNT],
        value_target: f32,
        learning_rate: f32,
    ) -> Result<()> {
        let finite = features.iter().chain(target.iter()).all(|v| v.is_finite())
            && value_target.is_finite()
            && learning_rate.is_finite();
        if !finite {
            return Err(BrainError::Fit("non-finite training sample".into()));
        }

        let (hidden, logits, value) = self.forward(features);
        let probabilities = softmax(&logits);

        // Move output probabilities toward the target distribution
        let mut d_out = [0.0f32; ACTION_COUNT];
        for i in 0..ACTION_COUNT {
            d_out[i] = (target[i] - probabilities[i]) * learning_rate;
        }
        // Value head: squared error through tanh
        let d_value = (value_target - value) * (1.0 - value * value) * learning_rate;

        // Backprop to hidden using pre-update weights
        let mut d_hidden = vec![0.0f32; self.hidden_dim];
        for (j, dh) in d_hidden.iter_mut().enumerate() {
            let mut sum = d_value * self.wv[j];
            for (i, d) in d_out.iter().enumerate() {
                sum += d * self.w2[i][j];
            }
            *dh = sum * (1.0 - hidden[j] * hidden[j]);
        }

        for i in 0..ACTION_COUNT {
            for (w, h) in self.w2[i].iter_mut().zip(&hidden) {
                *w += d_out[i] * h;
            }
            self.b2[i] += d_out[i];
        }
        for (w, h) in self.wv.iter_mut().zip(&hidden) {
            *w += d_value * h;
        }
        self.bv += d_value;

        for (j, row) in self.w1.iter_mut().enumerate() {
            for (w, x) in row.iter_mut().zip(features) {
                *w += d_hidden[j] * x;
            }
            self.b1[j] += d_hidden[j];
        }

        clamp_weights(&mut self.w1, WEIGHT_LIMIT);
        clamp_weights(&mut self.w2, WEIGHT_LIMIT);
        for w in self.wv.iter_mut() {
            *w = w.clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
        }
        Ok(())
    }

    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn softmax(logits: &[f32; ACTION_COUNT]) -> [f32; ACTION_COUNT] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out = [0.0f32; ACTION_COUNT];
    let mut sum = 0.0;
    for (o, l) in out.iter_mut().zip(logits) {
        *o = (l - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
    out
}

fn clamp_weights(weights: &mut [Vec<f32>], max_abs: f32) {
    for row in weights.iter_mut() {
        for w in row.iter_mut() {
            *w = w.clamp(-max_abs, max_abs);
        }
    }
}

/// Builds a model, possibly slowly
pub type PolicyFactory = Box<dyn FnOnce() -> Result<Box<dyn PolicyModel>> + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyStatus {
    /// No model yet (never requested, or still initialising)
    Uninitialized,
    Ready,
    Failed,
}

type InitResult = Result<Box<dyn PolicyModel>>;

#[derive(Debug)]
enum PolicyState {
    Uninitialized,
    Pending(oneshot::Receiver<InitResult>),
    Ready(Box<dyn PolicyModel>),
    Failed(String),
}

/// Lifecycle wrapper around an optional model
#[derive(Debug)]
pub struct LearnedPolicy {
    state: PolicyState,
}

impl Default for LearnedPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl LearnedPolicy {
    /// Rule-only: no model will ever be available
    pub fn none() -> Self {
        Self { state: PolicyState::Uninitialized }
    }

    /// Wrap an already-built model
    pub fn ready(model: Box<dyn PolicyModel>) -> Self {
        Self { state: PolicyState::Ready(model) }
    }

    /// Start initialisation
    ///
    /// Inside a tokio runtime the factory runs on a blocking task and the
    /// result is picked up by `poll`. Without a runtime it runs inline.
    pub fn spawn(factory: PolicyFactory) -> Self {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let (tx, rx) = oneshot::channel();
                handle.spawn_blocking(move || {
                    // Receiver may be gone if the villager was dropped
                    let _ = tx.send(factory());
                });
                Self { state: PolicyState::Pending(rx) }
            }
            Err(_) => {
                let mut policy = Self { state: PolicyState::Uninitialized };
                policy.resolve(Ok(factory()));
                policy
            }
        }
    }

    pub fn status(&self) -> PolicyStatus {
        match self.state {
            PolicyState::Uninitialized | PolicyState::Pending(_) => PolicyStatus::Uninitialized,
            PolicyState::Ready(_) => PolicyStatus::Ready,
            PolicyState::Failed(_) => PolicyStatus::Failed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PolicyState::Pending(_))
    }

    /// Reason the initialisation failed, if it did
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            PolicyState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Pick up a finished initialisation without blocking
    pub fn poll(&mut self) -> PolicyStatus {
        let received = match &mut self.state {
            PolicyState::Pending(rx) => match rx.try_recv() {
                Ok(result) => Ok(result),
                Err(oneshot::error::TryRecvError::Empty) => return PolicyStatus::Uninitialized,
                Err(oneshot::error::TryRecvError::Closed) => Err(()),
            },
            _ => return self.status(),
        };
        self.resolve(received);
        self.status()
    }

    /// Wait at most `limit` for a pending initialisation
    pub async fn wait(&mut self, limit: Duration) -> PolicyStatus {
        let received = match &mut self.state {
            PolicyState::Pending(rx) => match tokio::time::timeout(limit, rx).await {
                Ok(result) => result.map_err(|_| ()),
                Err(_) => {
                    tracing::debug!("policy still initialising after {:?}", limit);
                    return PolicyStatus::Uninitialized;
                }
            },
            _ => return self.status(),
        };
        self.resolve(received);
        self.status()
    }

    fn resolve(&mut self, received: std::result::Result<InitResult, ()>) {
        self.state = match received {
            Ok(Ok(model)) => {
                tracing::info!("learned policy ready");
                PolicyState::Ready(model)
            }
            Ok(Err(e)) => {
                tracing::warn!("learned policy initialisation failed: {}", e);
                PolicyState::Failed(e.to_string())
            }
            Err(()) => {
                tracing::warn!("learned policy initialiser dropped without reporting");
                PolicyState::Failed("initialiser dropped".into())
            }
        };
    }

    pub fn model(&self) -> Option<&dyn PolicyModel> {
        match &self.state {
            PolicyState::Ready(model) => Some(model.as_ref()),
            _ => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut (dyn PolicyModel + 'static)> {
        match &mut self.state {
            PolicyState::Ready(model) => Some(model.as_mut()),
            _ => None,
        }
    }
}
