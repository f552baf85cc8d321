//! Policy optimization: CEM search, morphology evolution, curriculum and the
//! budgeted trainer that ties them together.

pub mod cem;
pub mod curriculum;
pub mod evolution;
pub mod trainer;

pub use cem::{CandidateResult, CemConfig, CemState, GenerationStats};
pub use curriculum::{AdvancementCriteria, Curriculum, CurriculumStage};
pub use evolution::{EvolutionConfig, EvolutionState};
pub use trainer::{Champion, GenerationStatus, Trainer, TrainerConfig, TrainingProgress};
