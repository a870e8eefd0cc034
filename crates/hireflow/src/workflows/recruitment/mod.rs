pub mod applications;

pub use applications::{
    Application, ApplicationId, ApplicationRegistry, ApplicationServiceError, ApplicationStatus,
    MatchingEngine, ScoreBreakdown,
};
