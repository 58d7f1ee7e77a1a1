//! Market Data Request construction.
//!
//! One request per pair: snapshot plus updates, full book, bid and ask
//! entry types. Re-subscription only happens through a full session
//! reconnect.

use uuid::Uuid;

use super::message::FixMessage;

/// Build a Market Data Request (`35=V`) for a single symbol.
pub fn market_data_request(symbol: &str) -> FixMessage {
    let mut msg = FixMessage::new("V");
    msg.push(262, format!("MDR_{}", Uuid::new_v4()));
    msg.push(263, "1"); // Snapshot + Updates
    msg.push(264, "0"); // Full Book
    msg.push(267, "2"); // two entry types follow
    msg.push(269, "0"); // BID
    msg.push(269, "1"); // ASK
    msg.push(146, "1"); // one symbol per request
    msg.push(55, symbol);
    msg
}
