//! Transfer request tracking and stream relay

mod relay;
mod table;

pub use relay::{
    PROGRESS_INTERVAL, RELAY_CHANNEL_CAPACITY, RelayParams, StreamEvent, percentage, spawn_relay,
};
pub use table::{RequestState, TransferError, TransferRequest, TransferTable};
