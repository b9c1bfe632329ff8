mod mailbox;
#[allow(clippy::module_inception)]
mod relay;

pub use {
    mailbox::{ControlAction, ControlMailbox, ControlMailboxEntry, FileMailbox, RouteAction},
    relay::RemoteControlRelay,
};
