use thiserror::Error;

/// A decoded blueprint that cannot be turned into physics bodies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlueprintError {
    #[error("{field}[{index}] = {value} is outside [0, 1]")]
    FractionOutOfRange {
        field: &'static str,
        index: usize,
        value: f32,
    },
    #[error("bodyDensity = {0} is outside [0, 1]")]
    BodyDensityOutOfRange(f32),
    #[error("wheelAttachment[{wheel}] = {index} must be below {num_body_points}")]
    AttachmentOutOfRange {
        wheel: usize,
        index: usize,
        num_body_points: usize,
    },
    #[error("{field} has {actual} entries, expected {expected}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A bit string that breaks the genome contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenomeError {
    #[error("genome has {actual} bits, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
    #[error("genome holds {found:?} at position {position}, only '0' and '1' are allowed")]
    NonBinary { position: usize, found: char },
    #[error("genome is empty")]
    Empty,
}

/// Output of a genetic operator that violated the length/alphabet contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperatorError {
    #[error("mutation operator produced an invalid genome: {0}")]
    Mutation(GenomeError),
    #[error("crossover operator produced an invalid genome: {0}")]
    Crossover(GenomeError),
}

/// A population tunable rejected at assignment; the prior value is kept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunableError {
    #[error("numClones = {value} exceeds the {available} slots left by {num_random} random")]
    NumClones {
        value: usize,
        num_random: usize,
        available: usize,
    },
    #[error("numRandom = {value} exceeds the {available} slots left after {num_clones} clones")]
    NumRandom {
        value: usize,
        num_clones: usize,
        available: usize,
    },
    #[error("mutationRate = {0} is outside [0, 1]")]
    MutationRate(f32),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("chassis polygon is degenerate and has no convex hull")]
    DegenerateChassis,
    #[error("{0} body missing from the physics world")]
    MissingBody(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid seed {input:?}: {reason}")]
    Seed { input: String, reason: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
    #[error(transparent)]
    Genome(#[from] GenomeError),
    #[error(transparent)]
    Operator(#[from] OperatorError),
    #[error(transparent)]
    Tunable(#[from] TunableError),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("population has no cars to rank")]
    EmptyPopulation,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
