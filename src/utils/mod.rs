pub mod clock;
pub mod error;
pub mod http_client;
pub mod logger;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AppError, Result};
pub use http_client::HttpClient;
pub use logger::init_logger;
