use crate::model::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub enum WsConnectionStatus {
    Connected,
    Disconnected { reason: String },
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Ticks(Vec<Tick>),
    Status(WsConnectionStatus),
}
