//! Entity model mirrored from the server.
//!
//! Field names follow the server's JSON (`sessionID`, `messageID`, …) so
//! entities can be deserialized straight from event payloads and written back
//! out in snapshots without a translation layer.

mod message;
mod part;
mod request;
mod session;

pub use message::{MessageInfo, MessageTime, MessageWithParts, Role};
pub use part::{OtherPart, Part, PartBody, PartKind, PartTime, KNOWN_PART_TYPES};
pub use request::{PermissionRequest, QuestionInfo, QuestionOption, QuestionRequest, ToolRef};
pub use session::{Session, SessionStatus};
