pub mod batch;
pub mod builder;
pub mod invoker;
pub mod results;

pub use crate::domain::model::{ObjectTarget, ResultRecord, RunOutput};
pub use crate::domain::ports::{BatchSettings, CutoutService, FitRunner, Storage, SurveyCatalog};
pub use crate::utils::error::Result;
pub use batch::{BatchRunner, BatchSummary};
pub use builder::{FeedmeBuilder, FitInputs};
pub use invoker::GalfitmInvoker;
pub use results::{result_record, ResultStore};
