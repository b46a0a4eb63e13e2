pub mod question;
pub mod response;
pub mod session;
pub mod timer;

pub use question::{Question, RawAlternatives};
pub use response::{PersistenceStatus, ResponseRecord, SubmitAnswerRequest, SubmitAnswerResponse};
pub use session::{CreateSessionRequest, Session, SessionPhase, SessionResponse, SessionView};
