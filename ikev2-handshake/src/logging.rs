//! Structured logging for the IKE_SA_INIT exchange.
//!
//! Events go through `tracing`; installing a subscriber is up to the
//! application.
//!
//! # Log Levels
//!
//! - **TRACE**: full packet hex dumps
//! - **DEBUG**: packet sizes, cookie retries
//! - **INFO**: handshake start, state transitions, completion
//! - **WARN**: peer rejections, cookie limit reached
//! - **ERROR**: failed handshakes

use std::net::SocketAddr;
use tracing::{debug, error, info, trace, warn};

/// Log a handshake state transition
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI, zero until the responder answers
/// * `old_state` - Previous state name
/// * `new_state` - New state name
pub fn log_state_transition(spi_i: u64, spi_r: u64, old_state: &str, new_state: &str) {
    info!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        state_from = old_state,
        state_to = new_state,
        "IKE_SA_INIT state transition"
    );
}

pub fn log_handshake_start(peer: SocketAddr, local: SocketAddr) {
    info!(peer = %peer, local = %local, "IKE_SA_INIT started");
}

/// Log an outgoing message
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `packet` - Encoded message
pub fn log_packet_sent(spi_i: u64, packet: &[u8]) {
    debug!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        len = packet.len(),
        "IKE_SA_INIT request sent"
    );
    trace!(packet = %hex::encode(packet), "request bytes");
}

/// Log an incoming datagram before it is decoded
pub fn log_packet_received(spi_i: u64, packet: &[u8]) {
    debug!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        len = packet.len(),
        "IKE_SA_INIT response received"
    );
    trace!(packet = %hex::encode(packet), "response bytes");
}

/// Log a cookie challenge from the responder
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `round` - Cookie round trip about to be made, starting at 1
/// * `cookie_len` - Length of the cookie to echo
pub fn log_cookie_challenge(spi_i: u64, round: u8, cookie_len: usize) {
    debug!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        round = round,
        cookie_len = cookie_len,
        "responder requested a cookie"
    );
}

pub fn log_cookie_limit(spi_i: u64, rounds: u8) {
    warn!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        rounds = rounds,
        "cookie challenge limit reached"
    );
}

/// Log an error notification sent back by the responder
pub fn log_peer_rejection(spi_i: u64, message_type: u16) {
    warn!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        notify_type = message_type,
        "responder rejected IKE_SA_INIT"
    );
}

pub fn log_handshake_complete(spi_i: u64, spi_r: u64, cookie_rounds: u8) {
    info!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        cookie_rounds = cookie_rounds,
        "IKE_SA_INIT completed, keys derived"
    );
}

/// Log a handshake that ended in an error
///
/// # Arguments
///
/// * `peer` - Responder address
/// * `error` - Error message
pub fn log_handshake_failed(peer: SocketAddr, error: &str) {
    error!(peer = %peer, error = error, "IKE_SA_INIT failed");
}
