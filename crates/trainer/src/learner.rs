use anyhow::{Context, Result};
use babi::Vectorized;
use tch::{nn, nn::OptimizerConfig, Device, Kind, Tensor};

use memn2n_kv::{MemN2NKV, ModelConfig};

use crate::config::TrainerConfig;
use crate::error::TrainError;

/// A trainable answer predictor, driven one batch at a time.
pub trait Learner {
    /// Runs forward, backward and one parameter update on `batch`.
    /// Returns the labels predicted for the batch rows.
    fn train_step(&mut self, batch: &Vectorized) -> Result<Vec<i64>>;

    /// Predicts labels for every row of `data` without updating parameters.
    fn predict(&self, data: &Vectorized) -> Result<Vec<i64>>;

    /// Number of updates applied so far.
    fn global_step(&self) -> u64;
}

/// Gradient descent settings applied on every step.
#[derive(Debug, Clone)]
pub struct StepSettings {
    pub learning_rate: f64,
    pub decay_steps: u64,
    pub decay_rate: f64,
    pub max_grad_norm: f64,
    pub noise_stddev: f64,
}

impl StepSettings {
    pub fn from_config(config: &TrainerConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            decay_steps: config.decay_steps,
            decay_rate: config.decay_rate,
            max_grad_norm: config.max_grad_norm,
            noise_stddev: config.gradient_noise_stddev,
        }
    }

    /// Staircase exponential decay.
    pub fn learning_rate_at(&self, step: u64) -> f64 {
        let periods = (step / self.decay_steps.max(1)) as i32;
        self.learning_rate * self.decay_rate.powi(periods)
    }
}

/// Picks the libtorch device for a run.
pub fn select_device(config: &TrainerConfig) -> Device {
    if config.allow_soft_placement {
        Device::cuda_if_available()
    } else {
        Device::Cpu
    }
}

/// Checks that `data` has the shape the model was built for. `rows` pins
/// the row count, as training batches must be exactly `batch_size` rows.
pub fn check_shape(config: &ModelConfig, data: &Vectorized, rows: Option<usize>) -> Result<(), TrainError> {
    let n = rows.unwrap_or(data.len());
    let checks = [
        (
            "stories",
            vec![n, config.memory_key_size as usize, config.note_size as usize],
            vec![data.len(), data.memory_size(), data.sentence_size()],
        ),
        (
            "queries",
            vec![n, config.doc_size as usize],
            vec![data.len(), data.sentence_size()],
        ),
        (
            "answers",
            vec![n, config.vocab_size as usize],
            vec![data.len(), data.vocab_size()],
        ),
    ];
    for (what, expected, actual) in checks {
        if expected != actual {
            return Err(TrainError::ShapeMismatch {
                what,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// [`Learner`] backed by libtorch: the memory network plus Adam.
pub struct TchLearner {
    model: MemN2NKV,
    optimizer: nn::Optimizer,
    settings: StepSettings,
    device: Device,
    global_step: u64,
    _vs: nn::VarStore,
}

impl TchLearner {
    pub fn new(model_config: ModelConfig, config: &TrainerConfig, device: Device) -> Result<Self> {
        if let Some(seed) = config.random_state {
            tch::manual_seed(seed as i64);
        }

        let vs = nn::VarStore::new(device);
        let model = MemN2NKV::new(&vs.root(), &model_config);
        if config.log_device_placement {
            for (id, param) in model.parameters() {
                log::info!("{:?} {:?} placed on {:?}", id, param.size(), param.device());
            }
        }

        let settings = StepSettings::from_config(config);
        let optimizer = nn::Adam {
            eps: config.epsilon,
            ..Default::default()
        }
        .build(&vs, settings.learning_rate)
        .context("Failed to build Adam optimizer")?;

        Ok(Self {
            model,
            optimizer,
            settings,
            device,
            global_step: 0,
            _vs: vs,
        })
    }

    pub fn model(&self) -> &MemN2NKV {
        &self.model
    }

    fn inputs(&self, data: &Vectorized) -> (Tensor, Tensor) {
        let n = data.len() as i64;
        let stories = Tensor::from_slice(data.stories())
            .view([n, data.memory_size() as i64, data.sentence_size() as i64])
            .to(self.device);
        let queries = Tensor::from_slice(data.queries())
            .view([n, data.sentence_size() as i64])
            .to(self.device);
        (stories, queries)
    }

    fn answers(&self, data: &Vectorized) -> Tensor {
        Tensor::from_slice(data.answers())
            .view([data.len() as i64, data.vocab_size() as i64])
            .to(self.device)
    }

    /// Clips, adds noise to, and masks the nil rows of every gradient.
    fn transform_gradients(&self) {
        let max_norm = self.settings.max_grad_norm;
        let stddev = self.settings.noise_stddev;
        let nil = self.model.nil_params();

        tch::no_grad(|| {
            for (id, param) in self.model.parameters() {
                let mut grad = param.grad();
                if grad.defined() {
                    transform_gradient(&mut grad, max_norm, stddev, nil.contains(&id));
                }
            }
        });
    }
}

/// In place: rescale `grad` to L2 norm `max_norm` if it is larger, add
/// N(0, stddev) noise, then zero row 0 when the tensor has a nil row.
fn transform_gradient(grad: &mut Tensor, max_norm: f64, stddev: f64, is_nil: bool) {
    let norm = grad.norm().double_value(&[]);
    if norm > max_norm {
        let _ = grad.g_mul_scalar_(max_norm / norm);
    }
    if stddev > 0.0 {
        let noise = grad.randn_like() * stddev;
        let _ = grad.g_add_(&noise);
    }
    if is_nil {
        let _ = grad.narrow(0, 0, 1).zero_();
    }
}

impl Learner for TchLearner {
    fn train_step(&mut self, batch: &Vectorized) -> Result<Vec<i64>> {
        check_shape(&self.model.config, batch, Some(self.model.config.batch_size as usize))?;
        let (stories, queries) = self.inputs(batch);
        let answers = self.answers(batch);

        self.optimizer.zero_grad();
        let logits = self.model.forward(&stories, &queries);
        let loss = MemN2NKV::cross_entropy(&logits, &answers);
        loss.backward();
        self.transform_gradients();

        let lr = self.settings.learning_rate_at(self.global_step);
        self.optimizer.set_lr(lr);
        self.optimizer.step();
        self.global_step += 1;
        if self.global_step % self.settings.decay_steps.max(1) == 0 {
            log::debug!(
                "Step {}: learning rate now {:.6}",
                self.global_step,
                self.settings.learning_rate_at(self.global_step)
            );
        }

        let predicted = logits.detach().argmax(-1, false).to_kind(Kind::Int64).to(Device::Cpu);
        Ok(Vec::<i64>::try_from(&predicted)?)
    }

    fn predict(&self, data: &Vectorized) -> Result<Vec<i64>> {
        check_shape(&self.model.config, data, None)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let (stories, queries) = self.inputs(data);
        let predicted = tch::no_grad(|| self.model.predict(&stories, &queries))
            .to_kind(Kind::Int64)
            .to(Device::Cpu);
        Ok(Vec::<i64>::try_from(&predicted)?)
    }

    fn global_step(&self) -> u64 {
        self.global_step
    }
}
