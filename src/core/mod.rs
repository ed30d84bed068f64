pub mod classify;
pub mod etl;
pub mod expander;
pub mod merger;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod resolver;
pub mod run_log;

pub use crate::domain::model::{CourseRow, SemesterFlag, SourceRecord, StudentHeader, TranscriptBundle};
pub use crate::domain::ports::{Pipeline, RecordStore, Storage};
pub use crate::utils::error::Result;
