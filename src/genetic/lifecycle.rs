//! Population search over first-order coefficients for one axis

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::fitness::{Axis, FitnessFunction};
use super::gene::CoefficientGene;

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneticConfig {
    pub population: usize,
    pub max_generations: u32,
    /// Stop once the best fitness drops below this
    pub convergence_threshold: f64,
    pub mutation_probability: f64,
    pub nan_cull_probability: f64,
    pub outlier_cull_probability: f64,
    /// Candidates worse than `outlier_ratio * best` are outliers
    pub outlier_ratio: f64,
    /// Largest exponent magnitude for fresh random genes
    pub max_initial_exponent: u8,
    /// Fixed seed for reproducible runs. The latitude axis uses `seed + 1`.
    pub seed: Option<u64>,
    /// Wall-clock budget per axis
    pub deadline_ms: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population: 200,
            max_generations: 1000,
            convergence_threshold: 1.0,
            mutation_probability: 0.8,
            nan_cull_probability: 0.98,
            outlier_cull_probability: 0.5,
            outlier_ratio: 2.0,
            max_initial_exponent: 3,
            seed: None,
            deadline_ms: None,
        }
    }
}

/// A search parameter outside its usable range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneticConfigError {
    #[error("{field} must be a probability in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },

    #[error("outlier_ratio must be positive, got {0}")]
    OutlierRatio(f64),

    #[error("convergence_threshold must be finite, got {0}")]
    ConvergenceThreshold(f64),
}

impl GeneticConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Check the probabilities and thresholds the search samples with
    pub fn validate(&self) -> Result<(), GeneticConfigError> {
        for (field, value) in [
            ("mutation_probability", self.mutation_probability),
            ("nan_cull_probability", self.nan_cull_probability),
            ("outlier_cull_probability", self.outlier_cull_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GeneticConfigError::Probability { field, value });
            }
        }
        if self.outlier_ratio.is_nan() || self.outlier_ratio <= 0.0 {
            return Err(GeneticConfigError::OutlierRatio(self.outlier_ratio));
        }
        if !self.convergence_threshold.is_finite() {
            return Err(GeneticConfigError::ConvergenceThreshold(self.convergence_threshold));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifeCycleState {
    Initialized,
    Evaluating { generation: u32 },
    Converged { generation: u32 },
    GenerationCapReached { generation: u32 },
    DeadlineExpired { generation: u32 },
}

impl LifeCycleState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            LifeCycleState::Initialized | LifeCycleState::Evaluating { .. }
        )
    }

    pub fn generation(&self) -> u32 {
        match *self {
            LifeCycleState::Initialized => 0,
            LifeCycleState::Evaluating { generation }
            | LifeCycleState::Converged { generation }
            | LifeCycleState::GenerationCapReached { generation }
            | LifeCycleState::DeadlineExpired { generation } => generation,
        }
    }
}

/// Three genes for `c0 + c1*x + c2*y` and their score
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub genes: [CoefficientGene; 3],
    /// NaN until evaluated
    pub fitness: f64,
}

impl Candidate {
    fn random(rng: &mut impl Rng, max_exponent: u8) -> Self {
        Self {
            genes: std::array::from_fn(|_| CoefficientGene::random(rng, max_exponent)),
            fitness: f64::NAN,
        }
    }

    pub fn coefficients(&self) -> [f64; 3] {
        self.genes.map(|g| g.decode())
    }

    fn rank(&self) -> f64 {
        if self.fitness.is_nan() {
            f64::INFINITY
        } else {
            self.fitness
        }
    }

    fn cmp_fitness(&self, other: &Self) -> Ordering {
        self.rank().total_cmp(&other.rank())
    }
}

/// Result of one axis search
#[derive(Debug, Clone, Serialize)]
pub struct AxisOutcome {
    pub axis: Axis,
    pub coefficients: [f64; 3],
    /// Text form of the winning genes
    pub genes: [String; 3],
    pub fitness: f64,
    pub state: LifeCycleState,
}

pub struct LifeCycle<'a> {
    config: GeneticConfig,
    fitness: FitnessFunction<'a>,
    rng: StdRng,
    population: Vec<Candidate>,
    best: Option<Candidate>,
    state: LifeCycleState,
    deadline: Option<Instant>,
}

impl<'a> LifeCycle<'a> {
    pub fn new(
        config: GeneticConfig,
        fitness: FitnessFunction<'a>,
        rng: StdRng,
    ) -> Result<Self, GeneticConfigError> {
        config.validate()?;
        let deadline = config.deadline().map(|d| Instant::now() + d);
        Ok(Self {
            config,
            fitness,
            rng,
            population: Vec::new(),
            best: None,
            state: LifeCycleState::Initialized,
            deadline,
        })
    }

    pub fn state(&self) -> LifeCycleState {
        self.state
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Advance one generation and return the new state
    pub fn step(&mut self) -> LifeCycleState {
        let generation = match self.state {
            LifeCycleState::Initialized => {
                let size = self.config.population.max(2);
                self.population = (0..size)
                    .map(|_| Candidate::random(&mut self.rng, self.config.max_initial_exponent))
                    .collect();
                1
            }
            LifeCycleState::Evaluating { generation } => generation + 1,
            terminal => return terminal,
        };

        self.evaluate();
        let best = match self.population.iter().min_by(|a, b| a.cmp_fitness(b)) {
            Some(best) => *best,
            None => return self.state,
        };
        self.best = Some(best);

        self.state = if best.fitness < self.config.convergence_threshold {
            LifeCycleState::Converged { generation }
        } else if generation >= self.config.max_generations {
            LifeCycleState::GenerationCapReached { generation }
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            LifeCycleState::DeadlineExpired { generation }
        } else {
            self.cull(best.fitness);
            self.breed(best);
            LifeCycleState::Evaluating { generation }
        };
        self.state
    }

    /// Step until a terminal state
    pub fn run(mut self) -> AxisOutcome {
        let axis = self.fitness.axis();
        while !self.step().is_terminal() {
            if self.state.generation() % 100 == 0 {
                debug!(
                    "{} axis generation {}: best fitness {:.3}",
                    axis,
                    self.state.generation(),
                    self.best.map_or(f64::NAN, |b| b.fitness)
                );
            }
        }

        let best = self.best.unwrap_or(Candidate {
            genes: [CoefficientGene::ZERO; 3],
            fitness: f64::NAN,
        });
        info!(
            "{} axis search finished: {:?}, fitness {:.3}",
            axis, self.state, best.fitness
        );
        AxisOutcome {
            axis,
            coefficients: best.coefficients(),
            genes: best.genes.map(|g| g.to_text()),
            fitness: best.fitness,
            state: self.state,
        }
    }

    fn evaluate(&mut self) {
        for candidate in self.population.iter_mut().filter(|c| c.fitness.is_nan()) {
            candidate.fitness = self.fitness.evaluate(&candidate.coefficients());
        }
    }

    /// Replace NaN scorers and outliers with fresh random candidates
    fn cull(&mut self, best: f64) {
        let limit = best * self.config.outlier_ratio;
        let mut replaced = 0;
        for i in 0..self.population.len() {
            let fitness = self.population[i].fitness;
            let cull = if fitness.is_nan() {
                self.rng.random_bool(self.config.nan_cull_probability)
            } else if fitness > limit {
                self.rng.random_bool(self.config.outlier_cull_probability)
            } else {
                false
            };
            if cull {
                let mut fresh = Candidate::random(&mut self.rng, self.config.max_initial_exponent);
                fresh.fitness = self.fitness.evaluate(&fresh.coefficients());
                self.population[i] = fresh;
                replaced += 1;
            }
        }
        if replaced > 0 {
            debug!("{} axis: culled {} candidates", self.fitness.axis(), replaced);
        }
    }

    /// Next generation: the best survives unchanged, the rest are children
    fn breed(&mut self, best: Candidate) {
        let size = self.population.len();
        let mut next = Vec::with_capacity(size);
        next.push(best);

        while next.len() < size {
            let a = self.tournament();
            let b = self.tournament();
            let mut genes: [CoefficientGene; 3] =
                std::array::from_fn(|i| a.genes[i].crossover(&b.genes[i], &mut self.rng));

            if self.rng.random_bool(self.config.mutation_probability) {
                let which = self.rng.random_range(0..genes.len());
                genes[which].mutate(&mut self.rng);
            }
            next.push(Candidate {
                genes,
                fitness: f64::NAN,
            });
        }
        self.population = next;
    }

    /// Fitter of two random picks
    fn tournament(&mut self) -> Candidate {
        let n = self.population.len();
        let a = &self.population[self.rng.random_range(0..n)];
        let b = &self.population[self.rng.random_range(0..n)];
        if a.cmp_fitness(b) == Ordering::Greater {
            *b
        } else {
            *a
        }
    }
}
