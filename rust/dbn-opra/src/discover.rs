//! Discovery of optionable roots and their option contracts from an
//! intra-day replay of the OPRA.PILLAR definition schema.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use dbn_live::{
    ErrorSink, InstrumentDefMsg, RecordRef, RecordRefEnum, RecordSink, Result, SType, Schema,
    Session, ALL_SYMBOLS,
};

use crate::osi::OsiSymbol;

/// The dataset whose definition replay covers all OPRA option contracts.
pub const OPRA_DATASET: &str = "OPRA.PILLAR";

/// The system message the gateway sends once the intra-day definition replay
/// has been fully delivered.
const FINISHED_REPLAY: &str = "Finished definition replay";

/// The number of buckets in the instrument ID to security definition map.
///
/// There are approx. 7000 optionable roots as of this writing. Some have as
/// few as 100 options available, and others have many thousands. Anything
/// from 25000 to 100000 is a decent choice.
pub(crate) const SDEF_BUCKET_COUNT: usize = 50_000;

/// Initial capacity of a definition bucket on first insertion.
const INITIAL_BUCKET_CAPACITY: usize = 4;
/// Initial capacity of a root's option list on first insertion.
const INITIAL_OPTIONS_CAPACITY: usize = 64;

/// The phase a discovery client is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Initialized but not connected yet.
    NotStarted,
    /// Connected and subscribing.
    Connected,
    /// Subscribed and receiving security definitions.
    Subscribed,
    /// Cross-referencing security definitions to option symbols.
    CrossReferencing,
    /// Finished and ready to disconnect.
    Done,
    /// Errored out; see [`OpraDiscovery::error`].
    Error,
}

/// An option contract discovered under a root.
#[derive(Debug, Clone)]
pub struct OptionContract {
    /// The instrument ID the gateway mapped this contract to, reliable only
    /// within the same trading day.
    pub instrument_id: u32,
    /// The decoded OSI symbol of the contract.
    pub symbol: OsiSymbol,
    /// The slot of the matching security definition within its bucket,
    /// linked during the cross-reference pass.
    sdef_slot: Option<usize>,
}

/// An optionable root and the contracts discovered under it.
#[derive(Debug, Clone)]
pub struct OptionRoot {
    /// The root symbol, e.g. `MSFT`, `SPY`.
    pub root: String,
    /// The contracts discovered for this root.
    pub options: Vec<OptionContract>,
}

/// Everything a discovery run accumulates. Shared between the worker's sinks
/// and the public accessors.
#[derive(Debug)]
pub(crate) struct Accumulator {
    pub(crate) state: DiscoveryState,
    /// Discovered roots, strictly ascending by root string under byte-wise
    /// comparison, without duplicates.
    pub(crate) roots: Vec<OptionRoot>,
    /// Maps `instrument_id % SDEF_BUCKET_COUNT` to the definitions received
    /// for instruments in that residue class.
    buckets: Vec<Vec<InstrumentDefMsg>>,
    pub(crate) error: Option<String>,
    num_options: usize,
    num_sdefs: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            state: DiscoveryState::NotStarted,
            roots: Vec::new(),
            buckets: vec![Vec::new(); SDEF_BUCKET_COUNT],
            error: None,
            num_options: 0,
            num_sdefs: 0,
        }
    }
}

impl Accumulator {
    /// Routes one record from the definition replay.
    pub(crate) fn on_record(&mut self, rec: RecordRef) {
        match rec.as_enum() {
            RecordRefEnum::SymbolMapping(mapping) => {
                // Mappings whose output symbol isn't an option contract are
                // expected in the replay and carry nothing to discover.
                let Ok(symbol) = mapping.stype_out_symbol() else {
                    return;
                };
                let Ok(osi) = symbol.parse::<OsiSymbol>() else {
                    return;
                };
                self.add_option(mapping.hd.instrument_id, osi);
            }
            RecordRefEnum::InstrumentDef(sdef) => {
                let bucket =
                    &mut self.buckets[sdef.hd.instrument_id as usize % SDEF_BUCKET_COUNT];
                if bucket.is_empty() {
                    bucket.reserve(INITIAL_BUCKET_CAPACITY);
                }
                bucket.push(sdef.clone());
                self.num_sdefs += 1;
            }
            RecordRefEnum::System(msg) => {
                if msg.msg().is_ok_and(|text| text == FINISHED_REPLAY) {
                    debug!(
                        num_options = self.num_options,
                        num_sdefs = self.num_sdefs,
                        "definition replay finished"
                    );
                    self.state = DiscoveryState::CrossReferencing;
                }
            }
            RecordRefEnum::Error(msg) => {
                self.fail(msg.err().unwrap_or("malformed error record from gateway"));
            }
            _ => {}
        }
    }

    /// Records a fatal error and halts discovery.
    pub(crate) fn fail(&mut self, msg: &str) {
        warn!(error = msg, "discovery failed");
        self.error = Some(msg.to_owned());
        self.state = DiscoveryState::Error;
    }

    /// Files one option contract under its root, inserting the root at its
    /// sorted position if this is the first contract seen for it.
    fn add_option(&mut self, instrument_id: u32, osi: OsiSymbol) {
        let index = match self
            .roots
            .binary_search_by(|root| root.root.as_str().cmp(&osi.root))
        {
            Ok(index) => index,
            Err(index) => {
                self.roots.insert(
                    index,
                    OptionRoot {
                        root: osi.root.clone(),
                        options: Vec::new(),
                    },
                );
                index
            }
        };
        let root = &mut self.roots[index];
        if root.options.is_empty() {
            root.options.reserve(INITIAL_OPTIONS_CAPACITY);
        }
        root.options.push(OptionContract {
            instrument_id,
            symbol: osi,
            sdef_slot: None,
        });
        self.num_options += 1;
    }

    /// Links every option contract to the slot of its security definition
    /// within the bucket for its instrument ID. Runs once, after the replay
    /// has been fully received, when bucket contents are final.
    pub(crate) fn cross_reference(&mut self) {
        for root in &mut self.roots {
            for option in &mut root.options {
                let bucket = &self.buckets[option.instrument_id as usize % SDEF_BUCKET_COUNT];
                option.sdef_slot = bucket
                    .iter()
                    .position(|sdef| sdef.hd.instrument_id == option.instrument_id);
            }
        }
    }

    /// Looks up the security definition linked to `option`.
    fn definition(&self, option: &OptionContract) -> Option<&InstrumentDefMsg> {
        let bucket = &self.buckets[option.instrument_id as usize % SDEF_BUCKET_COUNT];
        option.sdef_slot.map(|slot| &bucket[slot])
    }
}

/// The results of a completed discovery run.
#[derive(Debug)]
pub struct DiscoveryResults {
    inner: Accumulator,
}

impl DiscoveryResults {
    /// Returns the state the run finished in. [`DiscoveryState::Done`] means
    /// the roots and cross-references are complete.
    pub fn state(&self) -> DiscoveryState {
        self.inner.state
    }

    /// Returns the error message if the run failed.
    pub fn error(&self) -> Option<&str> {
        self.inner.error.as_deref()
    }

    /// Returns the discovered roots, strictly ascending by root string.
    pub fn roots(&self) -> &[OptionRoot] {
        &self.inner.roots
    }

    /// Returns the security definition cross-referenced to `option`, if one
    /// was received during the replay.
    pub fn definition(&self, option: &OptionContract) -> Option<&InstrumentDefMsg> {
        self.inner.definition(option)
    }

    /// Returns the total number of option contracts discovered.
    pub fn num_options(&self) -> usize {
        self.inner.num_options
    }

    /// Returns the total number of security definitions received.
    pub fn num_sdefs(&self) -> usize {
        self.inner.num_sdefs
    }
}

/// A client wrapper that connects to [`OPRA_DATASET`], replays the day's
/// security definitions, and builds a catalog of optionable roots, their
/// option contracts, and the matching definitions.
///
/// Construction does not connect. [`start`](Self::start) authenticates on the
/// calling thread, then a worker subscribes to the `definition` schema under
/// `parent` symbology with replay enabled and consumes records until the
/// gateway reports the replay finished. [`finish`](Self::finish) joins the
/// worker and hands the catalog back.
#[derive(Default)]
pub struct OpraDiscovery {
    shared: Arc<Mutex<Accumulator>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl OpraDiscovery {
    /// Creates a new discovery client, not yet connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to the OPRA gateway with `api_key` and starts the discovery
    /// worker.
    ///
    /// # Errors
    /// This function returns an error if connecting or authenticating fails,
    /// or if the worker thread cannot be spawned. Subscription failures after
    /// this returns surface through [`state`](Self::state) and
    /// [`error`](Self::error).
    pub fn start(&mut self, api_key: &str) -> Result<()> {
        let on_error: ErrorSink = {
            let shared = Arc::clone(&self.shared);
            Arc::new(move |fatal, msg: &str| {
                if fatal {
                    shared.lock().fail(msg);
                }
            })
        };
        let on_record: RecordSink = {
            let shared = Arc::clone(&self.shared);
            Arc::new(move |rec| shared.lock().on_record(rec))
        };

        let mut session = Session::new(on_error, on_record);
        // ts_out stays off: discovery has no use for gateway send times.
        session.connect(api_key, OPRA_DATASET, false)?;
        self.shared.lock().state = DiscoveryState::Connected;

        let shared = Arc::clone(&self.shared);
        let stop = Arc::clone(&self.stop);
        let worker = std::thread::Builder::new()
            .name("dbn-opra-discover".to_owned())
            .spawn(move || run_worker(session, shared, stop))
            .map_err(|e| dbn_live::Error::io(e, "spawning discovery worker"))?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Returns the phase the discovery is currently in.
    pub fn state(&self) -> DiscoveryState {
        self.shared.lock().state
    }

    /// Returns the error message if discovery has failed.
    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    /// Returns `true` once discovery has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state(),
            DiscoveryState::Done | DiscoveryState::Error
        )
    }

    /// Stops the worker, disconnects, and returns everything discovered.
    /// Callers should poll [`is_finished`](Self::is_finished) first if they
    /// want a complete catalog; finishing early returns whatever has been
    /// accumulated so far.
    pub fn finish(mut self) -> DiscoveryResults {
        self.stop_worker();
        DiscoveryResults {
            inner: std::mem::take(&mut *self.shared.lock()),
        }
    }

    fn stop_worker(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for OpraDiscovery {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// The worker: subscribe, drain the replay, cross-reference, done. The
/// session is closed on every exit path.
fn run_worker(mut session: Session, shared: Arc<Mutex<Accumulator>>, stop: Arc<AtomicBool>) {
    if session
        .start(
            Schema::Definition,
            SType::Parent,
            &[ALL_SYMBOLS],
            "",
            true,
        )
        .is_err()
    {
        // The error sink has already recorded the failure.
        session.close();
        return;
    }
    {
        let mut acc = shared.lock();
        if acc.state == DiscoveryState::Connected {
            acc.state = DiscoveryState::Subscribed;
        }
    }

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        // The guard must drop before `get` runs: the record sink takes the
        // same lock.
        if shared.lock().state != DiscoveryState::Subscribed {
            break;
        }
        if session.get().is_err() {
            break;
        }
    }

    let mut acc = shared.lock();
    if acc.state == DiscoveryState::CrossReferencing {
        acc.cross_reference();
        acc.state = DiscoveryState::Done;
        info!(
            num_roots = acc.roots.len(),
            num_options = acc.num_options,
            num_sdefs = acc.num_sdefs,
            "discovery complete"
        );
    }
    drop(acc);
    session.close();
}

#[cfg(test)]
mod tests {
    use dbn_live::{str_to_c_chars, ErrorMsg, SymbolMappingMsg, SystemMsg};
    use rstest::rstest;

    use super::*;

    fn mapping(instrument_id: u32, symbol: &str) -> SymbolMappingMsg {
        let mut rec = SymbolMappingMsg::default();
        rec.hd.instrument_id = instrument_id;
        rec.stype_out_symbol = str_to_c_chars(symbol).unwrap();
        rec
    }

    fn definition(instrument_id: u32) -> InstrumentDefMsg {
        let mut rec = InstrumentDefMsg::default();
        rec.hd.instrument_id = instrument_id;
        rec
    }

    fn finished() -> SystemMsg {
        let mut rec = SystemMsg::default();
        rec.msg = str_to_c_chars(FINISHED_REPLAY).unwrap();
        rec
    }

    fn subscribed() -> Accumulator {
        let mut acc = Accumulator::default();
        acc.state = DiscoveryState::Subscribed;
        acc
    }

    #[test]
    fn test_replay_to_done() {
        let mut acc = subscribed();
        acc.on_record(RecordRef::from(&mapping(10, "SPY   250815C00500000")));
        acc.on_record(RecordRef::from(&mapping(11, "AAPL  250815C00200000")));
        acc.on_record(RecordRef::from(&mapping(12, "SPY   250815P00500000")));
        acc.on_record(RecordRef::from(&definition(10)));
        acc.on_record(RecordRef::from(&definition(12)));
        assert_eq!(acc.state, DiscoveryState::Subscribed);
        acc.on_record(RecordRef::from(&finished()));
        assert_eq!(acc.state, DiscoveryState::CrossReferencing);
        acc.cross_reference();
        acc.state = DiscoveryState::Done;

        let results = DiscoveryResults { inner: acc };
        let roots: Vec<&str> = results.roots().iter().map(|r| r.root.as_str()).collect();
        assert_eq!(roots, ["AAPL", "SPY"]);
        assert_eq!(results.roots()[1].options.len(), 2);
        assert_eq!(results.roots()[0].options.len(), 1);
        assert_eq!(results.num_options(), 3);
        assert_eq!(results.num_sdefs(), 2);

        // Options with a received definition are linked; the rest are not.
        let spy = &results.roots()[1];
        assert_eq!(
            results.definition(&spy.options[0]).unwrap().hd.instrument_id,
            10
        );
        let aapl = &results.roots()[0];
        assert!(results.definition(&aapl.options[0]).is_none());
    }

    #[rstest]
    #[case::sorted(&["AAPL", "MSFT", "SPY"])]
    #[case::reverse(&["SPY", "MSFT", "AAPL"])]
    #[case::interleaved_with_duplicates(&["MSFT", "AAPL", "SPY", "AAPL", "MSFT"])]
    fn test_roots_sorted_and_unique(#[case] order: &[&str]) {
        let mut acc = subscribed();
        for (i, root) in order.iter().enumerate() {
            let symbol = format!("{root:<6}250815C00100000");
            acc.on_record(RecordRef::from(&mapping(i as u32, &symbol)));
        }
        let roots: Vec<&str> = acc.roots.iter().map(|r| r.root.as_str()).collect();
        assert_eq!(roots, ["AAPL", "MSFT", "SPY"]);
        assert!(roots.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_non_option_mappings_ignored() {
        let mut acc = subscribed();
        acc.on_record(RecordRef::from(&mapping(1, "MSFT")));
        acc.on_record(RecordRef::from(&mapping(2, "NOT AN OSI SYMBOL")));
        assert!(acc.roots.is_empty());
        assert_eq!(acc.num_options, 0);
    }

    #[test]
    fn test_error_record_fails_discovery() {
        let mut acc = subscribed();
        acc.on_record(RecordRef::from(&ErrorMsg::new(0, "Subscription rejected")));
        assert_eq!(acc.state, DiscoveryState::Error);
        assert_eq!(acc.error.as_deref(), Some("Subscription rejected"));
    }

    #[test]
    fn test_bucket_collisions_resolve_by_instrument_id() {
        let mut acc = subscribed();
        let low = 7;
        let high = 7 + SDEF_BUCKET_COUNT as u32;
        acc.on_record(RecordRef::from(&mapping(high, "SPY   250815C00500000")));
        acc.on_record(RecordRef::from(&definition(low)));
        acc.on_record(RecordRef::from(&definition(high)));
        acc.cross_reference();
        let results = DiscoveryResults { inner: acc };
        let option = &results.roots()[0].options[0];
        assert_eq!(
            results.definition(option).unwrap().hd.instrument_id,
            high
        );
    }

    #[test]
    fn test_heartbeats_do_not_finish_replay() {
        let mut acc = subscribed();
        let mut heartbeat = SystemMsg::default();
        heartbeat.msg = str_to_c_chars("Heartbeat").unwrap();
        acc.on_record(RecordRef::from(&heartbeat));
        assert_eq!(acc.state, DiscoveryState::Subscribed);
    }
}
