pub mod analysis;
pub mod resume;

pub use analysis::{CandidateAnalysis, EducationEntry, ProjectEntry, WorkEntry};
pub use resume::{ResumeRecord, ResumeRow};
