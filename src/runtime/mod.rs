pub mod channel;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod protocol;
pub mod worker;

pub use channel::{Duplex, duplex};
pub use envelope::Envelope;
pub use error::Error;
pub use protocol::{Command, Reply};
