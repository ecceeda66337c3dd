pub mod error;
pub mod model;
pub mod utils;

pub use error::{PyarchError, Result, ResultExt};
pub use model::*;
pub use utils::{log_filter_error, log_filter_warn};
