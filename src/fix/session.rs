//! FIX session engine.
//!
//! Owns the socket, the outbound sequence counter and the logon state.
//! Market data frames are fanned out to the tick pipeline; everything
//! else is session control. On any socket failure the engine tears the
//! connection down and reconnects on a fixed delay, up to the attempt
//! cap — after that the process stays alive without a session.
//!
//! The engine acknowledges inbound heartbeats by logging only; it does
//! not emit its own heartbeats, answer Test Requests, or gap-check the
//! inbound sequence.

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::FixConfig;
use crate::constants::{
    HEARTBEAT_INTERVAL_SECS, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_SECS, SUBSCRIBE_DELAY_SECS,
};
use crate::error::{AppError, Result};
use crate::models::{RawQuote, Side, TickJob};
use crate::services::cache::Cache;
use crate::services::queue::JobSender;

use super::codec::{self, FrameDecoder, ParsedMessage};
use super::message::{self, FixMessage};
use super::subscription;

/// What a handled frame means for the read loop.
enum LoopAction {
    Continue,
    Disconnect,
}

pub struct FixSession {
    config: FixConfig,
    /// Eligible symbols to subscribe after logon
    symbols: Vec<String>,
    tick_jobs: JobSender<TickJob>,
    /// Pinged on each reconnect attempt; the manager reconnects only if
    /// the connection is actually down
    cache: Option<Cache>,
    seq: u64,
    logged_on: bool,
    decoder: FrameDecoder,
}

impl FixSession {
    pub fn new(
        config: FixConfig,
        symbols: Vec<String>,
        tick_jobs: JobSender<TickJob>,
        cache: Option<Cache>,
    ) -> Self {
        Self {
            config,
            symbols,
            tick_jobs,
            cache,
            seq: 0,
            logged_on: false,
            decoder: FrameDecoder::new(),
        }
    }

    /// Connect-and-reconnect loop. Returns when shutdown is signalled or
    /// the reconnect cap is exhausted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let addr = format!("{}:{}", self.config.server, self.config.port);
        let mut attempts: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            info!(addr = %addr, attempt = attempts + 1, "Connecting to FIX server");
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    attempts = 0;
                    match self.drive(stream, &mut shutdown).await {
                        Ok(()) => {
                            info!("Session closed");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Session dropped");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Connect failed");
                }
            }

            attempts += 1;
            if attempts >= MAX_RECONNECT_ATTEMPTS {
                error!(
                    attempts = attempts,
                    "Reconnect limit reached; staying alive without a session"
                );
                break;
            }

            if let Some(cache) = &self.cache {
                if let Err(e) = cache.ping().await {
                    warn!(error = %e, "Cache unavailable during reconnect");
                }
            }

            tokio::select! {
                _ = sleep(Duration::from_secs(RECONNECT_DELAY_SECS)) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    /// Run one connection to completion: logon, frame dispatch,
    /// subscription dispatch, shutdown.
    async fn drive(
        &mut self,
        stream: TcpStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Fresh connection, fresh session state
        self.seq = 0;
        self.logged_on = false;
        self.decoder = FrameDecoder::new();

        let logon = self.stamp_and_encode(self.logon_message());
        writer
            .write_all(&logon)
            .await
            .map_err(|e| AppError::Session(format!("logon write failed: {}", e)))?;
        info!(seq = self.seq, "Logon sent");

        let mut subscribe_at: Option<Instant> = None;
        let mut buf = vec![0u8; 8192];

        loop {
            let deadline = subscribe_at;
            tokio::select! {
                read = reader.read(&mut buf) => {
                    let n = read.map_err(|e| AppError::Session(format!("read failed: {}", e)))?;
                    if n == 0 {
                        return Err(AppError::Session("connection closed by peer".to_string()));
                    }
                    self.decoder.extend(&buf[..n]);
                    while let Some(frame) = self.decoder.next_frame() {
                        match self.handle_frame(&frame, &mut subscribe_at).await? {
                            LoopAction::Continue => {}
                            LoopAction::Disconnect => {
                                return Err(AppError::Session("peer logout".to_string()));
                            }
                        }
                    }
                }
                _ = async { sleep_until(deadline.expect("guarded")).await }, if deadline.is_some() => {
                    subscribe_at = None;
                    self.send_subscriptions(&mut writer).await?;
                }
                _ = shutdown.changed() => {
                    if self.logged_on {
                        let logout = self.stamp_and_encode(FixMessage::new("5"));
                        if let Err(e) = writer.write_all(&logout).await {
                            warn!(error = %e, "Logout write failed");
                        } else {
                            info!(seq = self.seq, "Logout sent");
                        }
                    }
                    let _ = writer.shutdown().await;
                    return Ok(());
                }
            }
        }
    }

    /// Route one decoded frame.
    async fn handle_frame(
        &mut self,
        frame: &[u8],
        subscribe_at: &mut Option<Instant>,
    ) -> Result<LoopAction> {
        let msg = codec::parse(frame);
        let msg_type = msg.msg_type().to_string();
        debug!(
            msg_type = %message::type_label(&msg_type),
            seq = msg.get(34).unwrap_or("-"),
            "Frame received"
        );

        match msg_type.as_str() {
            "W" | "X" => self.enqueue_quotes(&msg).await?,
            "A" => {
                if !self.logged_on {
                    self.logged_on = true;
                    info!(
                        delay_secs = SUBSCRIBE_DELAY_SECS,
                        "Logon confirmed; scheduling subscriptions"
                    );
                    *subscribe_at =
                        Some(Instant::now() + Duration::from_secs(SUBSCRIBE_DELAY_SECS));
                }
            }
            "0" => info!("Heartbeat received"),
            "1" => info!(
                test_req_id = msg.get(112).unwrap_or("-"),
                "Test Request received"
            ),
            "3" => warn!(
                reason = msg.get(58).unwrap_or("unspecified"),
                "Reject received"
            ),
            "5" => {
                info!("Logout received from peer");
                return Ok(LoopAction::Disconnect);
            }
            _ => debug!(msg_type = %message::type_label(&msg_type), "Ignoring message"),
        }

        Ok(LoopAction::Continue)
    }

    /// Turn a market-data frame's repeating-group entries into tick jobs,
    /// in source order. Entries outside bid/ask, or without a price, are
    /// dropped here.
    async fn enqueue_quotes(&mut self, msg: &ParsedMessage) -> Result<()> {
        let symbol = match msg.get(55) {
            Some(symbol) => symbol.to_string(),
            None => {
                debug!("Market data frame without symbol; dropping");
                return Ok(());
            }
        };
        let req_id = msg.get(262).unwrap_or("").to_string();

        for entry in &msg.entries {
            let side = match Side::from_md_entry_type(&entry.entry_type) {
                Some(side) => side,
                None => continue,
            };
            let price = match entry.price.as_deref().and_then(|p| Decimal::from_str(p).ok()) {
                Some(price) => price,
                None => continue,
            };
            let size = entry
                .size
                .as_deref()
                .and_then(|s| Decimal::from_str(s).ok())
                .unwrap_or(Decimal::ZERO);

            let quote = RawQuote {
                symbol: symbol.clone(),
                side,
                price,
                size,
                source_time: entry.time.clone(),
                req_id: req_id.clone(),
            };
            let id = format!(
                "{}_{}_{}",
                symbol,
                side.as_str(),
                Utc::now().timestamp_millis()
            );
            self.tick_jobs.enqueue(id, TickJob { quote }).await?;
        }
        Ok(())
    }

    async fn send_subscriptions(&mut self, writer: &mut OwnedWriteHalf) -> Result<()> {
        info!(pairs = self.symbols.len(), "Dispatching market data subscriptions");
        let symbols = self.symbols.clone();
        for symbol in &symbols {
            let request = subscription::market_data_request(symbol);
            let frame = self.stamp_and_encode(request);
            writer
                .write_all(&frame)
                .await
                .map_err(|e| AppError::Session(format!("subscribe write failed: {}", e)))?;
            debug!(symbol = %symbol, seq = self.seq, "Market data request sent");
        }
        Ok(())
    }

    fn logon_message(&self) -> FixMessage {
        let mut msg = FixMessage::new("A");
        msg.push(98, "0"); // EncryptMethod: none
        msg.push(108, HEARTBEAT_INTERVAL_SECS.to_string());
        msg.push(141, "Y"); // ResetSeqNumFlag
        msg.push(553, self.config.username.as_str());
        msg.push(554, self.config.password.as_str());
        msg
    }

    /// Stamp identities, sequence number and sending time, then frame.
    /// The counter increments before the stamp, so the first message of
    /// a connection carries `34=1`.
    fn stamp_and_encode(&mut self, mut msg: FixMessage) -> Vec<u8> {
        self.seq += 1;
        msg.set(49, self.config.sender_comp_id.as_str());
        msg.set(56, self.config.target_comp_id.as_str());
        msg.set(34, self.seq.to_string());
        msg.set(52, Utc::now().format("%Y%m%d-%H:%M:%S%.3f").to_string());
        codec::encode(&msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::queue::{self, JobQueue, QueueOptions};
    use tokio::net::TcpListener;

    fn test_config(port: u16) -> FixConfig {
        FixConfig {
            server: "127.0.0.1".to_string(),
            port,
            sender_comp_id: "CLIENT".to_string(),
            target_comp_id: "UPSTREAM".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn test_queue() -> (JobSender<TickJob>, JobQueue<TickJob>) {
        queue::channel(QueueOptions {
            name: "tick-test",
            capacity: 64,
            concurrency: 1,
            rate_limit_per_sec: 1_000,
            max_attempts: 1,
            backoff_base: Duration::from_millis(10),
            job_timeout: Duration::from_secs(1),
        })
    }

    async fn read_frame(sock: &mut TcpStream, decoder: &mut FrameDecoder) -> Vec<u8> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(frame) = decoder.next_frame() {
                return frame;
            }
            let n = sock.read(&mut buf).await.unwrap();
            assert!(n > 0, "peer closed before a full frame arrived");
            decoder.extend(&buf[..n]);
        }
    }

    fn upstream_frame(msg_type: &str, seq: u32) -> FixMessage {
        let mut msg = FixMessage::new(msg_type);
        msg.set(49, "UPSTREAM");
        msg.set(56, "CLIENT");
        msg.set(34, seq.to_string());
        msg.set(52, "20260314-12:00:00.000");
        msg
    }

    #[tokio::test]
    async fn test_logon_handshake_subscriptions_and_ticks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (tick_tx, mut tick_queue) = test_queue();
        let session = FixSession::new(
            test_config(port),
            vec!["EURUSD".to_string()],
            tick_tx,
            None,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session_task = tokio::spawn(session.run(shutdown_rx));

        let (mut sock, _) = listener.accept().await.unwrap();
        let mut decoder = FrameDecoder::new();

        // Engine logs on first; sequence starts at 1
        let logon = codec::parse(&read_frame(&mut sock, &mut decoder).await);
        assert_eq!(logon.msg_type(), "A");
        assert_eq!(logon.get(34), Some("1"));
        assert_eq!(logon.get(98), Some("0"));
        assert_eq!(logon.get(108), Some("30"));
        assert_eq!(logon.get(141), Some("Y"));
        assert_eq!(logon.get(553), Some("user"));
        assert_eq!(logon.get(554), Some("pass"));
        assert_eq!(logon.get(49), Some("CLIENT"));
        assert_eq!(logon.get(56), Some("UPSTREAM"));

        // Confirm logon; a subscription per pair follows after the delay
        sock.write_all(&codec::encode(&upstream_frame("A", 1)))
            .await
            .unwrap();

        let request = codec::parse(&read_frame(&mut sock, &mut decoder).await);
        assert_eq!(request.msg_type(), "V");
        assert_eq!(request.get(55), Some("EURUSD"));
        assert_eq!(request.get(34), Some("2")); // strictly monotonic

        // A snapshot entry becomes a tick job
        let mut snapshot = upstream_frame("W", 2);
        snapshot.push(55, "EURUSD");
        snapshot.push(268, "1");
        snapshot.push(269, "0");
        snapshot.push(270, "1.10000");
        snapshot.push(271, "100000");
        snapshot.push(273, "12:00:30");
        sock.write_all(&codec::encode(&snapshot)).await.unwrap();

        let job = tick_queue.recv().await.unwrap();
        assert_eq!(job.payload.quote.symbol, "EURUSD");
        assert_eq!(job.payload.quote.side, Side::Bid);
        assert_eq!(job.payload.quote.price.to_string(), "1.10000");
        assert_eq!(job.payload.quote.source_time.as_deref(), Some("12:00:30"));
        assert!(job.id.starts_with("EURUSD_bid_"));

        // Shutdown sends a Logout before closing
        shutdown_tx.send(true).unwrap();
        let logout = codec::parse(&read_frame(&mut sock, &mut decoder).await);
        assert_eq!(logout.msg_type(), "5");
        assert_eq!(logout.get(34), Some("3"));
        session_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_outside_bid_ask_are_dropped() {
        let (tick_tx, mut tick_queue) = test_queue();
        let mut session = FixSession::new(test_config(0), vec![], tick_tx, None);

        let mut snapshot = FixMessage::new("W");
        snapshot.push(55, "EURUSD");
        snapshot.push(268, "3");
        snapshot.push(269, "2"); // trade entry, not a quote
        snapshot.push(270, "1.09000");
        snapshot.push(269, "0"); // bid without a price
        snapshot.push(269, "1");
        snapshot.push(270, "1.10010");
        snapshot.push(271, "200000");
        let parsed = codec::parse(&codec::encode(&snapshot));

        session.enqueue_quotes(&parsed).await.unwrap();

        let job = tick_queue.try_recv().expect("ask entry enqueued");
        assert_eq!(job.payload.quote.side, Side::Ask);
        assert!(tick_queue.try_recv().is_none(), "only the ask survives");
    }

    #[tokio::test]
    async fn test_market_data_without_symbol_is_dropped() {
        let (tick_tx, mut tick_queue) = test_queue();
        let mut session = FixSession::new(test_config(0), vec![], tick_tx, None);

        let mut snapshot = FixMessage::new("W");
        snapshot.push(268, "1");
        snapshot.push(269, "0");
        snapshot.push(270, "1.10000");
        let parsed = codec::parse(&codec::encode(&snapshot));

        session.enqueue_quotes(&parsed).await.unwrap();
        assert!(tick_queue.try_recv().is_none());
    }
}
