pub mod quality;
pub mod review_record;
pub mod review_session;
pub mod review_state;
pub mod sm2;

pub use quality::ReviewQuality;
pub use review_record::{ReviewLogEntry, ReviewRecord, ReviewStats};
pub use review_session::ReviewSession;
pub use review_state::{ReviewState, ScheduledReview};
