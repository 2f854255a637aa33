//! # mirror-core
//!
//! Foundation types shared by every mirror crate:
//!
//! - **Branded IDs**: `SessionId`, `MessageId`, `PartId`, `RequestId`, `EventId`
//!   as ordered newtypes so one kind of ID can't stand in for another
//! - **Entity model**: sessions, messages, parts, permission and question
//!   requests, and the session status side table
//! - **Logging**: `tracing` subscriber bootstrap and an in-memory capture layer
//!   for tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod model;

pub use ids::{EventId, MessageId, PartId, RequestId, SessionId};
pub use model::{
    MessageInfo, MessageTime, MessageWithParts, OtherPart, Part, PartBody, PartKind, PartTime,
    PermissionRequest, QuestionInfo, QuestionOption, QuestionRequest, Role, Session,
    SessionStatus, ToolRef,
};
