pub mod routes;
pub mod warmup;

pub use routes::{router, AppState};
pub use warmup::{FragmentPrimer, WarmUp, WarmUpError};
