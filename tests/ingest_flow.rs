//! End-to-end flow through the public pieces that need no live
//! services: wire frame -> decoder -> parsed entries -> normalized tick
//! -> bucketed candle updates.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use fixfeed::fix::codec::{self, FrameDecoder};
use fixfeed::fix::FixMessage;
use fixfeed::models::{Candle, RawQuote, Side, Tick, Timeframe};

fn snapshot_frame(price: &str, size: &str, time: &str) -> Vec<u8> {
    let mut msg = FixMessage::new("W");
    msg.set(49, "UPSTREAM");
    msg.set(56, "CLIENT");
    msg.set(34, "10");
    msg.set(52, "20260314-12:00:31.000");
    msg.push(262, "MDR_feed");
    msg.push(55, "EURUSD");
    msg.push(268, "1");
    msg.push(269, "0");
    msg.push(270, price);
    msg.push(271, size);
    msg.push(273, time);
    codec::encode(&msg)
}

fn normalize(frame: &[u8]) -> Tick {
    let parsed = codec::parse(frame);
    let entry = &parsed.entries[0];
    let quote = RawQuote {
        symbol: parsed.get(55).unwrap().to_string(),
        side: Side::from_md_entry_type(&entry.entry_type).unwrap(),
        price: Decimal::from_str(entry.price.as_deref().unwrap()).unwrap(),
        size: Decimal::from_str(entry.size.as_deref().unwrap()).unwrap(),
        source_time: entry.time.clone(),
        req_id: parsed.get(262).unwrap_or("").to_string(),
    };
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 30, 0).unwrap();
    Tick::normalize(&quote, Some(Decimal::from(100_000)), now).unwrap()
}

#[test]
fn test_single_bid_tick_creates_m1_candle() {
    // Snapshot: EURUSD bid 1.10000, size 100000, entry time 12:00:30
    let frame = snapshot_frame("1.10000", "100000", "12:00:30");

    // Arrives split across two reads
    let (head, tail) = frame.split_at(frame.len() / 3);
    let mut decoder = FrameDecoder::new();
    decoder.extend(head);
    assert!(decoder.next_frame().is_none());
    decoder.extend(tail);
    let received = decoder.next_frame().expect("frame completes");

    let tick = normalize(&received);
    assert_eq!(tick.symbol, "EURUSD");
    assert_eq!(tick.side, Side::Bid);
    assert_eq!(tick.lots, 1);
    assert_eq!(
        tick.ticktime,
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 30).unwrap()
    );

    let candletime = Timeframe::M1.bucket(tick.ticktime);
    assert_eq!(
        candletime,
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    );

    let candle = Candle::open_at(tick.symbol.clone(), Timeframe::M1, candletime, tick.price);
    assert_eq!(candle.lots, 1);
    let flat = Decimal::from_str("1.10000").unwrap();
    assert_eq!(
        (candle.open, candle.high, candle.low, candle.close),
        (flat, flat, flat, flat)
    );
}

#[test]
fn test_candle_sequence_within_one_bucket() {
    let open_tick = normalize(&snapshot_frame("1.10000", "100000", "12:00:30"));
    let candletime = Timeframe::M1.bucket(open_tick.ticktime);
    let mut candle = Candle::open_at(
        open_tick.symbol.clone(),
        Timeframe::M1,
        candletime,
        open_tick.price,
    );

    // Second tick in the bucket, higher price
    let higher = normalize(&snapshot_frame("1.10050", "100000", "12:00:45"));
    assert_eq!(Timeframe::M1.bucket(higher.ticktime), candletime);
    candle.apply(higher.price);
    assert_eq!(candle.open, Decimal::from_str("1.10000").unwrap());
    assert_eq!(candle.high, Decimal::from_str("1.10050").unwrap());
    assert_eq!(candle.low, Decimal::from_str("1.10000").unwrap());
    assert_eq!(candle.close, Decimal::from_str("1.10050").unwrap());

    // Third tick in the bucket, lower price
    let lower = normalize(&snapshot_frame("1.09990", "100000", "12:00:55"));
    assert_eq!(Timeframe::M1.bucket(lower.ticktime), candletime);
    candle.apply(lower.price);
    assert_eq!(candle.open, Decimal::from_str("1.10000").unwrap());
    assert_eq!(candle.high, Decimal::from_str("1.10050").unwrap());
    assert_eq!(candle.low, Decimal::from_str("1.09990").unwrap());
    assert_eq!(candle.close, Decimal::from_str("1.09990").unwrap());
    assert!(candle.is_valid());
}

#[test]
fn test_bucket_rollover_opens_new_candle() {
    let first = normalize(&snapshot_frame("1.10000", "100000", "12:00:55"));
    let next = normalize(&snapshot_frame("1.10020", "100000", "12:01:02"));

    let first_bucket = Timeframe::M1.bucket(first.ticktime);
    let next_bucket = Timeframe::M1.bucket(next.ticktime);

    assert_eq!(
        first_bucket,
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    );
    assert_eq!(
        next_bucket,
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 1, 0).unwrap()
    );
    assert_ne!(first_bucket, next_bucket);

    // The rollover tick opens flat at its own price; H1 and D1 keep the
    // same bucket across this boundary
    assert_eq!(
        Timeframe::H1.bucket(first.ticktime),
        Timeframe::H1.bucket(next.ticktime)
    );
    assert_eq!(
        Timeframe::D1.bucket(first.ticktime),
        Timeframe::D1.bucket(next.ticktime)
    );
}

#[test]
fn test_empty_snapshot_produces_no_ticks() {
    let mut msg = FixMessage::new("W");
    msg.push(55, "EURUSD");
    msg.push(268, "0");
    let parsed = codec::parse(&codec::encode(&msg));
    assert!(parsed.entries.is_empty());
}
