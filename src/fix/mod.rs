pub mod codec;
pub mod message;
pub mod session;
pub mod subscription;

pub use codec::{FrameDecoder, MdEntry, ParsedMessage};
pub use message::{FixMessage, SOH};
pub use session::FixSession;
