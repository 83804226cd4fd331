use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("Solver diverged at iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("No matched solution found: {0}")]
    NoMatchedSolution(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BeamError {
    /// True for failures of a derivation on otherwise well-formed input.
    pub fn is_derivation_failure(&self) -> bool {
        matches!(
            self,
            BeamError::NoMatchedSolution(_) | BeamError::SolverDiverged { .. }
        )
    }
}

pub type BeamResult<T> = Result<T, BeamError>;
