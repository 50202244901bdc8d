//! Wire protocol between the Driftbox agent and its control process.
//!
//! Every message is a JSON object carrying a `label` and an opaque `handle`,
//! sent as one length-prefixed frame. Requests ask the agent to
//! `synchronize`, `upload`, or `remove`; each gets exactly one response
//! echoing its handle, either a success envelope or `failed`.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{read_frame, write_frame, FrameCodec};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{Request, Response, MAX_MESSAGE_SIZE};
