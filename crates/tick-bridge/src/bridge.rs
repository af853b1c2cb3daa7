//! The forwarding loop.
//!
//! [`ForwardingBridge`] drives the state machine in [`crate::state`]:
//! acquire the downstream connection, then the upstream subscription, then
//! stream until told to stop or until the single reconnect attempt for a
//! write failure is exhausted.
//!
//! Everything runs on one cooperative task. Suspension happens only while
//! waiting for the next upstream trade and inside the downstream write, so
//! emission order always equals arrival order and a shutdown request can
//! never interrupt a record mid-encode — either the record completes or
//! shutdown preempts before the record is produced.

use tick_core::TradeEvent;
use tick_core::error::BridgeError;
use tick_core::feed::{FeedConnector, TradeFeed};
use tick_core::sink::{RecordSink, SinkConnector};
use tick_core::wire;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::state::{BridgeState, ConnectionState};

/// Owns one bridge run: downstream connection lifecycle, wire encoding,
/// reconnect policy, and counters.
pub struct ForwardingBridge<FC, SC>
where
    FC: FeedConnector,
    SC: SinkConnector,
{
    feed_connector: FC,
    sink_connector: SC,
    progress_every: u64,
    shutdown_rx: watch::Receiver<bool>,
    state: BridgeState,
}

impl<FC, SC> ForwardingBridge<FC, SC>
where
    FC: FeedConnector,
    SC: SinkConnector,
{
    /// Create a bridge in `Idle`. `shutdown_rx` flips to `true` when the
    /// operator requests a stop.
    pub fn new(
        feed_connector: FC,
        sink_connector: SC,
        progress_every: u64,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            feed_connector,
            sink_connector,
            progress_every: progress_every.max(1),
            shutdown_rx,
            state: BridgeState::Idle,
        }
    }

    /// Current state of the run.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Drive the state machine from `Idle` to a terminal state.
    ///
    /// Returns `Ok(())` on cooperative shutdown; any error is terminal and
    /// reported after both owned resources have been released (downstream
    /// socket first, then upstream subscription).
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        self.transition(BridgeState::ConnectingDownstream);
        let sink = match self.sink_connector.connect().await {
            Ok(sink) => sink,
            Err(e) => {
                error!("downstream connect failed: {e}");
                self.transition(BridgeState::Failed);
                return Err(e);
            }
        };
        let mut conn = ConnectionState::new(sink);

        self.transition(BridgeState::ConnectingUpstream);
        let mut feed = match self.feed_connector.open().await {
            Ok(feed) => feed,
            Err(e) => {
                error!("upstream open failed: {e}");
                release_sink(&mut conn).await;
                self.transition(BridgeState::Failed);
                return Err(e);
            }
        };

        self.transition(BridgeState::Streaming);
        let outcome = self.stream_loop(&mut feed, &mut conn).await;

        // Scoped release on every exit path, exactly once per resource:
        // downstream socket first, then upstream subscription.
        if outcome.is_ok() {
            self.transition(BridgeState::ShuttingDown);
        }
        release_sink(&mut conn).await;
        feed.close().await;

        info!(
            forwarded = conn.forwarded,
            reconnects = conn.reconnects,
            "bridge run finished"
        );

        match outcome {
            Ok(()) => {
                self.transition(BridgeState::Stopped);
                Ok(())
            }
            Err(e) => {
                self.transition(BridgeState::Failed);
                Err(e)
            }
        }
    }

    /// The one-in-one-out pipeline: wait for a trade, forward it, repeat.
    ///
    /// The shutdown request is observed at the suspension point between
    /// records; `forward` itself is always awaited to completion.
    async fn stream_loop(
        &mut self,
        feed: &mut FC::Feed,
        conn: &mut ConnectionState<SC::Sink>,
    ) -> Result<(), BridgeError> {
        loop {
            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    // A closed channel means the controller is gone; treat it
                    // the same as an explicit stop request.
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("shutdown requested");
                        return Ok(());
                    }
                }
                event = feed.next() => match event {
                    Some(event) => self.forward(conn, event).await?,
                    None => {
                        return Err(BridgeError::UpstreamUnavailable(
                            "trade sequence ended; a fresh subscription is required".into(),
                        ));
                    }
                }
            }
        }
    }

    /// Encode and write one record; apply the reconnect policy on failure.
    async fn forward(
        &mut self,
        conn: &mut ConnectionState<SC::Sink>,
        event: TradeEvent,
    ) -> Result<(), BridgeError> {
        let line = wire::encode_record(&event);

        let Some(sink) = conn.sink.as_mut() else {
            return Err(BridgeError::DownstreamWriteFailed("no downstream connection".into()));
        };

        match sink.send_record(&line).await {
            Ok(()) => {
                conn.forwarded += 1;
                if conn.forwarded % self.progress_every == 0 {
                    info!(
                        forwarded = conn.forwarded,
                        trade_id = event.trade_id,
                        price = event.price,
                        "forwarding progress"
                    );
                }
                Ok(())
            }
            Err(e) => {
                // At-most-once delivery: the in-flight record is dropped,
                // never re-sent against the fresh connection.
                warn!("downstream write failed, dropping trade_id={}: {e}", event.trade_id);
                self.reconnect_once(conn).await
            }
        }
    }

    /// Exactly one reconnect attempt per write failure. A second consecutive
    /// failure is fatal to the run — no backoff, no retry loop.
    async fn reconnect_once(
        &mut self,
        conn: &mut ConnectionState<SC::Sink>,
    ) -> Result<(), BridgeError> {
        self.transition(BridgeState::ReconnectingDownstream);

        if let Some(mut failed) = conn.sink.take() {
            failed.shutdown().await;
        }
        conn.reconnects += 1;

        match self.sink_connector.connect().await {
            Ok(sink) => {
                info!("downstream reconnected");
                conn.sink = Some(sink);
                self.transition(BridgeState::Streaming);
                Ok(())
            }
            Err(e) => {
                error!("reconnect failed, terminating run: {e}");
                Err(BridgeError::DownstreamWriteFailed(format!(
                    "single reconnect attempt failed: {e}"
                )))
            }
        }
    }

    fn transition(&mut self, next: BridgeState) {
        debug!("state {} -> {}", self.state, next);
        self.state = next;
    }
}

async fn release_sink<S: RecordSink>(conn: &mut ConnectionState<S>) {
    if let Some(mut sink) = conn.sink.take() {
        sink.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn ev(time: u64, id: u64, price: f64, qty: f64) -> TradeEvent {
        TradeEvent {
            exchange_time_ms: time,
            symbol: "BTCUSDT".into(),
            trade_id: id,
            price,
            quantity: qty,
            local_time_us: 0,
        }
    }

    fn spec_trades() -> Vec<TradeEvent> {
        vec![
            ev(1000, 1, 50000.0, 0.01),
            ev(1001, 2, 50001.5, 0.02),
            ev(1002, 3, 50000.75, 0.03),
        ]
    }

    // --- scripted upstream -------------------------------------------------

    enum DrainBehavior {
        /// When the script runs out, signal shutdown and suspend forever —
        /// models an infinite feed interrupted by the operator.
        SignalShutdown(watch::Sender<bool>),
        /// When the script runs out, report end-of-stream — models a dropped
        /// subscription.
        EndStream,
    }

    struct ScriptedFeed {
        events: VecDeque<TradeEvent>,
        on_drained: DrainBehavior,
        closed: Arc<Mutex<u32>>,
    }

    #[async_trait::async_trait]
    impl TradeFeed for ScriptedFeed {
        async fn next(&mut self) -> Option<TradeEvent> {
            match self.events.pop_front() {
                Some(event) => Some(event),
                None => match &self.on_drained {
                    DrainBehavior::SignalShutdown(tx) => {
                        let _ = tx.send(true);
                        std::future::pending().await
                    }
                    DrainBehavior::EndStream => None,
                },
            }
        }

        async fn close(&mut self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    struct ScriptedFeedConnector {
        feed: Mutex<Option<ScriptedFeed>>,
        fail_open: bool,
        opens: Arc<Mutex<u32>>,
    }

    #[async_trait::async_trait]
    impl FeedConnector for ScriptedFeedConnector {
        type Feed = ScriptedFeed;

        async fn open(&self) -> Result<ScriptedFeed, BridgeError> {
            *self.opens.lock().unwrap() += 1;
            if self.fail_open {
                return Err(BridgeError::UpstreamUnavailable("scripted open failure".into()));
            }
            Ok(self.feed.lock().unwrap().take().expect("feed opened more than once"))
        }
    }

    fn feed_connector(
        events: Vec<TradeEvent>,
        on_drained: DrainBehavior,
    ) -> (ScriptedFeedConnector, Arc<Mutex<u32>>) {
        let closed = Arc::new(Mutex::new(0));
        let feed =
            ScriptedFeed { events: events.into(), on_drained, closed: Arc::clone(&closed) };
        let connector = ScriptedFeedConnector {
            feed: Mutex::new(Some(feed)),
            fail_open: false,
            opens: Arc::new(Mutex::new(0)),
        };
        (connector, closed)
    }

    // --- scripted downstream -----------------------------------------------

    #[derive(Clone, Copy)]
    enum WriteOutcome {
        /// The record reaches the peer.
        Deliver,
        /// The record reaches the peer but the write still errors locally —
        /// the failure is detected after the bytes left.
        DeliverThenFail,
        /// The record is lost and the write errors.
        FailLost,
    }

    #[derive(Clone, Default)]
    struct SinkScript {
        written: Arc<Mutex<Vec<String>>>,
        write_plan: Arc<Mutex<VecDeque<WriteOutcome>>>,
        /// Outcome per `connect()` call; empty means succeed.
        connect_plan: Arc<Mutex<VecDeque<bool>>>,
        connects: Arc<Mutex<u32>>,
        shutdowns: Arc<Mutex<u32>>,
    }

    struct ScriptedSink {
        script: SinkScript,
    }

    #[async_trait::async_trait]
    impl RecordSink for ScriptedSink {
        async fn send_record(&mut self, line: &str) -> Result<(), BridgeError> {
            let outcome = self
                .script
                .write_plan
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(WriteOutcome::Deliver);
            match outcome {
                WriteOutcome::Deliver => {
                    self.script.written.lock().unwrap().push(line.to_string());
                    Ok(())
                }
                WriteOutcome::DeliverThenFail => {
                    self.script.written.lock().unwrap().push(line.to_string());
                    Err(BridgeError::DownstreamWriteFailed("scripted write failure".into()))
                }
                WriteOutcome::FailLost => {
                    Err(BridgeError::DownstreamWriteFailed("scripted write failure".into()))
                }
            }
        }

        async fn shutdown(&mut self) {
            *self.script.shutdowns.lock().unwrap() += 1;
        }
    }

    struct ScriptedConnector {
        script: SinkScript,
    }

    #[async_trait::async_trait]
    impl SinkConnector for ScriptedConnector {
        type Sink = ScriptedSink;

        async fn connect(&self) -> Result<ScriptedSink, BridgeError> {
            *self.script.connects.lock().unwrap() += 1;
            let ok = self.script.connect_plan.lock().unwrap().pop_front().unwrap_or(true);
            if ok {
                Ok(ScriptedSink { script: self.script.clone() })
            } else {
                Err(BridgeError::DownstreamUnavailable("scripted refusal".into()))
            }
        }
    }

    // --- tests -------------------------------------------------------------

    #[tokio::test]
    async fn healthy_link_forwards_three_records_in_order() {
        let (tx, rx) = watch::channel(false);
        let (fc, closed) = feed_connector(spec_trades(), DrainBehavior::SignalShutdown(tx));
        let script = SinkScript::default();
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        bridge.run().await.unwrap();

        let written = script.written.lock().unwrap().clone();
        assert_eq!(written.len(), 3);
        assert!(written[0].starts_with("1000,BTCUSDT,1,50000.00000000,"));
        assert!(written[1].starts_with("1001,BTCUSDT,2,50001.50000000,"));
        assert!(written[2].starts_with("1002,BTCUSDT,3,50000.75000000,"));

        // Each record is a well-formed wire line with OHLC collapsed.
        for line in &written {
            let rec = wire::decode_record(line).unwrap();
            assert_eq!(rec.symbol, "BTCUSDT");
            assert_eq!(wire::encode_record(&rec), *line);
        }

        assert_eq!(bridge.state(), BridgeState::Stopped);
        assert_eq!(*closed.lock().unwrap(), 1);
        assert_eq!(*script.shutdowns.lock().unwrap(), 1);
        assert_eq!(*script.connects.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn ordering_and_monotonic_ids_preserved() {
        let events: Vec<_> =
            (1..=20u64).map(|i| ev(1000 + i, i, 100.0 + i as f64, 0.5)).collect();
        let (tx, rx) = watch::channel(false);
        let (fc, _closed) = feed_connector(events, DrainBehavior::SignalShutdown(tx));
        let script = SinkScript::default();
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 7, rx);
        bridge.run().await.unwrap();

        let ids: Vec<u64> = script
            .written
            .lock()
            .unwrap()
            .iter()
            .map(|l| wire::decode_record(l).unwrap().trade_id)
            .collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failed_write_drops_in_flight_record_and_resumes() {
        let (tx, rx) = watch::channel(false);
        let (fc, closed) = feed_connector(spec_trades(), DrainBehavior::SignalShutdown(tx));
        let script = SinkScript::default();
        script.write_plan.lock().unwrap().extend([
            WriteOutcome::Deliver,  // record 1
            WriteOutcome::FailLost, // record 2 — dropped, triggers reconnect
        ]);
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        bridge.run().await.unwrap();

        let written = script.written.lock().unwrap().clone();
        assert_eq!(written.len(), 2);
        assert!(written[0].starts_with("1000,BTCUSDT,1,"));
        assert!(written[1].starts_with("1002,BTCUSDT,3,"), "record 2 must not be re-sent");

        assert_eq!(*script.connects.lock().unwrap(), 2);
        // Failed sink plus the final release.
        assert_eq!(*script.shutdowns.lock().unwrap(), 2);
        assert_eq!(*closed.lock().unwrap(), 1);
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }

    #[tokio::test]
    async fn reconnect_after_delivered_failure_keeps_all_records() {
        // The write error surfaces after record 1's bytes already left:
        // downstream sees 1, 2, 3 with no duplicate and no gap.
        let (tx, rx) = watch::channel(false);
        let (fc, _closed) = feed_connector(spec_trades(), DrainBehavior::SignalShutdown(tx));
        let script = SinkScript::default();
        script.write_plan.lock().unwrap().push_back(WriteOutcome::DeliverThenFail);
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        bridge.run().await.unwrap();

        let written = script.written.lock().unwrap().clone();
        assert_eq!(written.len(), 3);
        assert!(written[0].starts_with("1000,BTCUSDT,1,"));
        assert!(written[1].starts_with("1001,BTCUSDT,2,"));
        assert!(written[2].starts_with("1002,BTCUSDT,3,"));
        assert_eq!(*script.connects.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn second_consecutive_failure_is_fatal_with_single_cleanup() {
        let (_tx, rx) = watch::channel(false);
        let (fc, closed) = feed_connector(spec_trades(), DrainBehavior::EndStream);
        let script = SinkScript::default();
        script.write_plan.lock().unwrap().push_back(WriteOutcome::FailLost);
        script.connect_plan.lock().unwrap().extend([true, false]);
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        let err = bridge.run().await.unwrap_err();
        assert!(matches!(err, BridgeError::DownstreamWriteFailed(_)));

        assert!(script.written.lock().unwrap().is_empty());
        assert_eq!(*script.connects.lock().unwrap(), 2);
        // Only the failed sink existed; it was released exactly once.
        assert_eq!(*script.shutdowns.lock().unwrap(), 1);
        assert_eq!(*closed.lock().unwrap(), 1);
        assert_eq!(bridge.state(), BridgeState::Failed);
    }

    #[tokio::test]
    async fn downstream_refusal_never_opens_upstream() {
        let (_tx, rx) = watch::channel(false);
        let (fc, closed) = feed_connector(spec_trades(), DrainBehavior::EndStream);
        let opens = Arc::clone(&fc.opens);
        let script = SinkScript::default();
        script.connect_plan.lock().unwrap().push_back(false);
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        let err = bridge.run().await.unwrap_err();
        assert!(matches!(err, BridgeError::DownstreamUnavailable(_)));

        assert_eq!(*opens.lock().unwrap(), 0);
        assert_eq!(*closed.lock().unwrap(), 0);
        assert_eq!(*script.shutdowns.lock().unwrap(), 0);
        assert_eq!(bridge.state(), BridgeState::Failed);
    }

    #[tokio::test]
    async fn upstream_open_failure_releases_downstream() {
        let (_tx, rx) = watch::channel(false);
        let (mut fc, _closed) = feed_connector(Vec::new(), DrainBehavior::EndStream);
        fc.fail_open = true;
        let script = SinkScript::default();
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        let err = bridge.run().await.unwrap_err();
        assert!(matches!(err, BridgeError::UpstreamUnavailable(_)));

        assert_eq!(*script.shutdowns.lock().unwrap(), 1);
        assert_eq!(bridge.state(), BridgeState::Failed);
    }

    #[tokio::test]
    async fn upstream_end_of_stream_is_fatal_after_cleanup() {
        let (_tx, rx) = watch::channel(false);
        let (fc, closed) =
            feed_connector(vec![ev(1000, 1, 50000.0, 0.01)], DrainBehavior::EndStream);
        let script = SinkScript::default();
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        let err = bridge.run().await.unwrap_err();
        assert!(matches!(err, BridgeError::UpstreamUnavailable(_)));

        assert_eq!(script.written.lock().unwrap().len(), 1);
        assert_eq!(*closed.lock().unwrap(), 1);
        assert_eq!(*script.shutdowns.lock().unwrap(), 1);
        assert_eq!(bridge.state(), BridgeState::Failed);
    }

    #[tokio::test]
    async fn shutdown_before_first_trade_stops_cleanly() {
        let (tx, rx) = watch::channel(false);
        let (fc, closed) = feed_connector(Vec::new(), DrainBehavior::SignalShutdown(tx));
        let script = SinkScript::default();
        let sc = ScriptedConnector { script: script.clone() };

        let mut bridge = ForwardingBridge::new(fc, sc, 50, rx);
        bridge.run().await.unwrap();

        assert!(script.written.lock().unwrap().is_empty());
        assert_eq!(*closed.lock().unwrap(), 1);
        assert_eq!(*script.shutdowns.lock().unwrap(), 1);
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }
}
