pub mod caller;

pub use caller::{identify_caller, USER_ID_HEADER};
