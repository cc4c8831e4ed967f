pub mod context;
pub mod poller;

pub use context::{DisplayContext, TickReport};
pub use poller::{display_channel, DisplayConsumer, DisplayFrame, DisplayPoller, DisplayPublisher};
