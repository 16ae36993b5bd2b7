pub mod caller;
pub mod session;
pub mod transformation;
pub mod usage_record;
pub mod user;

pub use caller::{Caller, MAX_USER_ID_CHARS};
pub use session::{AnonymousUsage, LearnedPhrase, NewPhrase, NewSession, PhraseUpdate, Session};
pub use transformation::{KeyPhrase, TransformRequest, TransformationResult, KEY_PHRASE_COUNT};
pub use usage_record::{RecordOutcome, UsageBody, UsageRecord, UsageResponse, UsageSnapshot};
pub use user::{NewUser, UserProfile, UserUpdate};
