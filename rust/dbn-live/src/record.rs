//! Market data types for the records delivered by the live gateway, and
//! conversion functions. All structs are laid out exactly as they appear on
//! the wire: `#[repr(C)]`, densely packed, with little-endian integer fields.

pub(crate) mod conv;
mod impl_default;
mod methods;

use std::{mem, os::raw::c_char};

use crate::{
    enums::rtype,
    macros::impl_record,
    FlagSet, RType, SecurityUpdateAction, UserDefinedInstrument, SYMBOL_CSTR_LEN,
};
pub(crate) use conv::as_u8_slice;
pub use conv::{c_chars_to_str, str_to_c_chars, ts_to_dt};

/// Common data for all Databento records. Always found at the beginning of a
/// record struct.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHeader {
    /// The length of the record in 32-bit words.
    pub(crate) length: u8,
    /// The record type; the set of possible values is defined in [`rtype`].
    /// Record types implement the trait [`HasRType`], and the
    /// [`has_rtype`][HasRType::has_rtype] function can be used to check if
    /// that type can be used to decode a message with a given rtype.
    pub rtype: u8,
    /// The publisher ID assigned by Databento, which denotes the dataset and
    /// venue.
    pub publisher_id: u16,
    /// The numeric ID assigned to the instrument, reliable only within the
    /// same trading day.
    pub instrument_id: u32,
    /// The matching-engine-received timestamp expressed as the number of
    /// nanoseconds since the UNIX epoch.
    pub ts_event: u64,
}

/// A symbol mapping resolved by the gateway for one symbol of the
/// subscription. The record of rtype [`SYMBOL_MAPPING`](rtype::SYMBOL_MAPPING).
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolMappingMsg {
    /// The common header.
    pub hd: RecordHeader,
    /// The input symbol.
    pub stype_in_symbol: [c_char; SYMBOL_CSTR_LEN],
    /// The output symbol.
    pub stype_out_symbol: [c_char; SYMBOL_CSTR_LEN],
    // Filler for alignment.
    #[doc(hidden)]
    pub _dummy: [u8; 4],
    /// The start of the mapping interval expressed as the number of
    /// nanoseconds since the UNIX epoch.
    pub start_ts: u64,
    /// The end of the mapping interval expressed as the number of nanoseconds
    /// since the UNIX epoch.
    pub end_ts: u64,
}

/// Definition of an instrument. The record of the
/// [`Definition`](crate::enums::Schema::Definition) schema.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstrumentDefMsg {
    /// The common header.
    pub hd: RecordHeader,
    /// The capture-server-received timestamp expressed as the number of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// The minimum constant tick for the instrument in units of 1e-9, i.e.
    /// 1/1,000,000,000 or 0.000000001.
    pub min_price_increment: i64,
    /// The multiplier to convert the venue's display price to the
    /// conventional price.
    pub display_factor: i64,
    /// The last eligible trade time expressed as a number of nanoseconds
    /// since the UNIX epoch. Will be [`crate::UNDEF_TIMESTAMP`] when null,
    /// such as for equities.
    pub expiration: u64,
    /// The time of instrument activation expressed as a number of nanoseconds
    /// since the UNIX epoch. Will be [`crate::UNDEF_TIMESTAMP`] when null,
    /// such as for equities.
    pub activation: u64,
    /// The allowable high limit price for the trading day in units of 1e-9,
    /// i.e. 1/1,000,000,000 or 0.000000001.
    pub high_limit_price: i64,
    /// The allowable low limit price for the trading day in units of 1e-9,
    /// i.e. 1/1,000,000,000 or 0.000000001.
    pub low_limit_price: i64,
    /// The differential value for price banding in units of 1e-9, i.e.
    /// 1/1,000,000,000 or 0.000000001.
    pub max_price_variation: i64,
    /// The trading session settlement price on `trading_reference_date`.
    pub trading_reference_price: i64,
    /// The contract size for each instrument, in combination with
    /// `unit_of_measure`.
    pub unit_of_measure_qty: i64,
    /// The value currently under development by the venue. Converted to units
    /// of 1e-9, i.e. 1/1,000,000,000 or 0.000000001.
    pub min_price_increment_amount: i64,
    /// The value used for price calculation in spread and leg pricing in
    /// units of 1e-9, i.e. 1/1,000,000,000 or 0.000000001.
    pub price_ratio: i64,
    /// A bitmap of instrument eligibility attributes.
    pub inst_attrib_value: i32,
    /// The `instrument_id` of the first underlying instrument.
    pub underlying_id: u32,
    /// The instrument ID assigned by the publisher. May be the same as
    /// `instrument_id`.
    pub raw_instrument_id: u32,
    /// The implied book depth on the price level data feed.
    pub market_depth_implied: i32,
    /// The (outright) book depth on the price level data feed.
    pub market_depth: i32,
    /// The market segment of the instrument.
    pub market_segment_id: u32,
    /// The maximum trading volume for the instrument.
    pub max_trade_vol: u32,
    /// The minimum order entry quantity for the instrument.
    pub min_lot_size: i32,
    /// The minimum quantity required for a block trade of the instrument.
    pub min_lot_size_block: i32,
    /// The minimum quantity required for a round lot of the instrument.
    /// Multiples of this quantity are also round lots.
    pub min_lot_size_round_lot: i32,
    /// The minimum trading volume for the instrument.
    pub min_trade_vol: u32,
    #[doc(hidden)]
    pub _reserved2: [u8; 4],
    /// The number of deliverables per instrument, i.e. peak days.
    pub contract_multiplier: i32,
    /// The quantity that a contract will decay daily, after
    /// `decay_start_date` has been reached.
    pub decay_quantity: i32,
    /// The fixed contract value assigned to each instrument.
    pub original_contract_size: i32,
    #[doc(hidden)]
    pub _reserved3: [u8; 4],
    /// The trading session date corresponding to the settlement price in
    /// `trading_reference_price`, in number of days since the UNIX epoch.
    pub trading_reference_date: u16,
    /// The channel ID assigned at the venue.
    pub appl_id: i16,
    /// The calendar year reflected in the instrument symbol.
    pub maturity_year: u16,
    /// The date at which a contract will begin to decay.
    pub decay_start_date: u16,
    /// The channel ID assigned by Databento as an incrementing integer
    /// starting at zero.
    pub channel_id: u16,
    /// The currency used for price fields.
    pub currency: [c_char; 4],
    /// The currency used for settlement, if different from `currency`.
    pub settl_currency: [c_char; 4],
    /// The strategy type of the spread.
    pub secsubtype: [c_char; 6],
    /// The instrument raw symbol assigned by the publisher.
    pub raw_symbol: [c_char; SYMBOL_CSTR_LEN],
    /// The security group code of the instrument.
    pub group: [c_char; 21],
    /// The exchange used to identify the instrument.
    pub exchange: [c_char; 5],
    /// The underlying asset code (product code) of the instrument.
    pub asset: [c_char; 7],
    /// The ISO standard instrument categorization code.
    pub cfi: [c_char; 7],
    /// The type of the instrument, e.g. FUT for future or future spread.
    pub security_type: [c_char; 7],
    /// The unit of measure for the instrument's original contract size, e.g.
    /// USD or LBS.
    pub unit_of_measure: [c_char; 31],
    /// The symbol of the first underlying instrument.
    pub underlying: [c_char; 21],
    /// The currency of [`strike_price`](Self::strike_price).
    pub strike_price_currency: [c_char; 4],
    /// The classification of the instrument.
    pub instrument_class: c_char,
    #[doc(hidden)]
    pub _reserved4: [u8; 2],
    /// The strike price of the option. Converted to units of 1e-9, i.e.
    /// 1/1,000,000,000 or 0.000000001.
    pub strike_price: i64,
    #[doc(hidden)]
    pub _reserved5: [u8; 6],
    /// The matching algorithm used for the instrument, typically **F**IFO.
    pub match_algorithm: c_char,
    /// The current trading state of the instrument.
    pub md_security_trading_status: u8,
    /// The price denominator of the main fraction.
    pub main_fraction: u8,
    /// The number of digits to the right of the tick mark, to display
    /// fractional prices.
    pub price_display_format: u8,
    /// The type indicators for the settlement price, as a bitmap.
    pub settl_price_type: u8,
    /// The price denominator of the sub fraction.
    pub sub_fraction: u8,
    /// The product complex of the instrument.
    pub underlying_product: u8,
    /// Indicates if the instrument definition has been added, modified, or
    /// deleted.
    pub security_update_action: SecurityUpdateAction,
    /// The calendar month reflected in the instrument symbol.
    pub maturity_month: u8,
    /// The calendar day reflected in the instrument symbol, or 0.
    pub maturity_day: u8,
    /// The calendar week reflected in the instrument symbol, or 0.
    pub maturity_week: u8,
    /// Indicates if the instrument is user defined: **Y**es or **N**o.
    pub user_defined_instrument: UserDefinedInstrument,
    /// The type of `contract_multiplier`. Either `1` for hours, or `2` for
    /// days.
    pub contract_multiplier_unit: i8,
    /// The schedule for delivering electricity.
    pub flow_schedule_type: i8,
    /// The tick rule of the spread.
    pub tick_rule: u8,
    // Filler for alignment.
    #[doc(hidden)]
    pub _dummy: [u8; 3],
}

/// An error message from the live subscription gateway. The record of rtype
/// [`ERROR`](rtype::ERROR).
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorMsg {
    /// The common header.
    pub hd: RecordHeader,
    /// The error message.
    pub err: [c_char; 64],
}

/// A non-error message from the live subscription gateway. Also used for
/// heartbeats. The record of rtype [`SYSTEM`](rtype::SYSTEM).
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemMsg {
    /// The common header.
    pub hd: RecordHeader,
    /// The message from the gateway.
    pub msg: [c_char; 64],
}

/// A level.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct BidAskPair {
    /// The bid price.
    pub bid_px: i64,
    /// The ask price.
    pub ask_px: i64,
    /// The bid size.
    pub bid_sz: u32,
    /// The ask size.
    pub ask_sz: u32,
    /// The bid order count.
    pub bid_ct: u32,
    /// The ask order count.
    pub ask_ct: u32,
}

/// A price level consolidated from multiple venues.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ConsolidatedBidAskPair {
    /// The bid price.
    pub bid_px: i64,
    /// The ask price.
    pub ask_px: i64,
    /// The bid size.
    pub bid_sz: u32,
    /// The ask size.
    pub ask_sz: u32,
    /// The bid publisher ID assigned by Databento, which denotes the dataset
    /// and venue.
    pub bid_pb: u16,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved1: [u8; 2],
    /// The ask publisher ID assigned by Databento, which denotes the dataset
    /// and venue.
    pub ask_pb: u16,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved2: [u8; 2],
}

/// A consolidated market-by-price message with a book depth of 1. The record
/// of the [`Cmbp1`](crate::enums::Schema::Cmbp1) schema, and under its
/// [`CbboMsg`] alias, of the consolidated BBO schemas.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cmbp1Msg {
    /// The common header.
    pub hd: RecordHeader,
    /// The order price expressed as a signed integer where every 1 unit
    /// corresponds to 1e-9, i.e. 1/1,000,000,000 or 0.000000001.
    pub price: i64,
    /// The order quantity.
    pub size: u32,
    /// The event action. Can be **A**dd, **C**ancel, **M**odify, clea**R**,
    /// or **T**rade.
    pub action: c_char,
    /// The side that initiates the event. Can be **A**sk for a sell order
    /// (or sell aggressor in a trade), **B**id for a buy order (or buy
    /// aggressor in a trade), or **N**one where no side is specified.
    pub side: c_char,
    /// A bit field indicating event end, message characteristics, and data
    /// quality.
    pub flags: FlagSet,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved1: u8,
    /// The capture-server-received timestamp expressed as the number of
    /// nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    /// The delta of `ts_recv - ts_exchange_send`, max 2 seconds.
    pub ts_in_delta: i32,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved2: [u8; 4],
    /// The top of the consolidated order book.
    pub levels: [ConsolidatedBidAskPair; 1],
}

/// A consolidated best-bid-and-offer message. The record of the
/// [`Cbbo1S`](crate::enums::Schema::Cbbo1S),
/// [`Cbbo1M`](crate::enums::Schema::Cbbo1M), and
/// [`Tcbbo`](crate::enums::Schema::Tcbbo) schemas, which share the CMBP-1
/// layout.
pub use self::Cmbp1Msg as CbboMsg;

/// A subsampled market-by-price message with a known book depth of 1. The
/// record of the [`Bbo1S`](crate::enums::Schema::Bbo1S) and
/// [`Bbo1M`](crate::enums::Schema::Bbo1M) schemas.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BboMsg {
    /// The common header.
    pub hd: RecordHeader,
    /// The price of the last trade expressed as a signed integer where every
    /// 1 unit corresponds to 1e-9, i.e. 1/1,000,000,000 or 0.000000001.
    pub price: i64,
    /// The quantity of the last trade.
    pub size: u32,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved1: u8,
    /// The side that initiated the last trade. Can be **A**sk for a sell
    /// aggressor, **B**id for a buy aggressor, or **N**one where no side is
    /// specified.
    pub side: c_char,
    /// A bit field indicating event end, message characteristics, and data
    /// quality.
    pub flags: FlagSet,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved2: u8,
    /// The end timestamp of the interval, clamped to the second/minute
    /// boundary, expressed as the number of nanoseconds since the UNIX epoch.
    pub ts_recv: u64,
    // Reserved for later usage.
    #[doc(hidden)]
    pub _reserved3: [u8; 4],
    /// The message sequence number assigned at the venue of the last update.
    pub sequence: u32,
    /// The top of the order book.
    pub levels: [BidAskPair; 1],
}

/// A DBN record of type `T` with its live gateway send timestamp appended.
/// The gateway only appends `ts_out` when it was requested during
/// authentication.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WithTsOut<T: HasRType> {
    /// The inner record.
    pub rec: T,
    /// The live gateway send timestamp expressed as the number of nanoseconds
    /// since the UNIX epoch.
    pub ts_out: u64,
}

/// Used for polymorphism around types all beginning with a [`RecordHeader`]
/// where `rtype` is the discriminant used for indicating the type of record.
pub trait Record {
    /// Returns a reference to the `RecordHeader` that comes at the beginning
    /// of all record types.
    fn header(&self) -> &RecordHeader;

    /// Returns the size of the record in bytes.
    fn record_size(&self) -> usize {
        self.header().record_size()
    }

    /// Tries to convert the raw record type into an enum which is useful for
    /// exhaustive pattern matching.
    ///
    /// # Errors
    /// This function returns an error if the `rtype` field does not contain a
    /// valid, known [`RType`].
    fn rtype(&self) -> crate::Result<RType> {
        self.header().rtype()
    }

    /// Returns the raw primary timestamp for the record.
    ///
    /// This timestamp should be used for sorting records as well as indexing
    /// into any symbology data structure.
    fn raw_index_ts(&self) -> u64 {
        self.header().ts_event
    }

    /// Returns the primary timestamp for the record. Returns `None` if the
    /// primary timestamp contains the sentinel value for a null timestamp.
    ///
    /// This timestamp should be used for sorting records as well as indexing
    /// into any symbology data structure.
    fn index_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.raw_index_ts())
    }
}

/// Used for polymorphism around mutable types beginning with a
/// [`RecordHeader`].
pub trait RecordMut {
    /// Returns a mutable reference to the `RecordHeader` that comes at the
    /// beginning of all record types.
    fn header_mut(&mut self) -> &mut RecordHeader;
}

/// An extension of the [`Record`] trait for types with a static [`RType`].
/// Used for determining if a [`RecordRef`](crate::RecordRef) references the
/// given type.
pub trait HasRType: Record + RecordMut {
    /// Returns `true` if `rtype` matches the value associated with the
    /// implementing type.
    fn has_rtype(rtype: u8) -> bool;
}

impl_record!(SymbolMappingMsg: rtype::SYMBOL_MAPPING);
impl_record!(InstrumentDefMsg: rtype::INSTRUMENT_DEF; index_ts = ts_recv);
impl_record!(ErrorMsg: rtype::ERROR);
impl_record!(SystemMsg: rtype::SYSTEM);
impl_record!(
    Cmbp1Msg: rtype::CMBP_1,
    rtype::CBBO_1S,
    rtype::CBBO_1M,
    rtype::TCBBO; index_ts = ts_recv
);
impl_record!(BboMsg: rtype::BBO_1S, rtype::BBO_1M; index_ts = ts_recv);

impl<T: HasRType> Record for WithTsOut<T> {
    fn header(&self) -> &RecordHeader {
        self.rec.header()
    }

    fn raw_index_ts(&self) -> u64 {
        self.rec.raw_index_ts()
    }
}

impl<T: HasRType> RecordMut for WithTsOut<T> {
    fn header_mut(&mut self) -> &mut RecordHeader {
        self.rec.header_mut()
    }
}

impl<T: HasRType> HasRType for WithTsOut<T> {
    fn has_rtype(rtype: u8) -> bool {
        T::has_rtype(rtype)
    }
}

impl<T: HasRType> AsRef<[u8]> for WithTsOut<T> {
    fn as_ref(&self) -> &[u8] {
        // Safety: all record structs are plain old data.
        unsafe { as_u8_slice(self) }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(mem::size_of::<RecordHeader>(), 16);
    }

    #[rstest]
    #[case::symbol_mapping(mem::size_of::<SymbolMappingMsg>(), 80)]
    #[case::instrument_def(mem::size_of::<InstrumentDefMsg>(), 360)]
    #[case::error(mem::size_of::<ErrorMsg>(), 80)]
    #[case::system(mem::size_of::<SystemMsg>(), 80)]
    #[case::cmbp1(mem::size_of::<Cmbp1Msg>(), 80)]
    #[case::bbo(mem::size_of::<BboMsg>(), 80)]
    fn test_sizes(#[case] actual: usize, #[case] expected: usize) {
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::symbol_mapping(SymbolMappingMsg::default())]
    #[case::instrument_def(InstrumentDefMsg::default())]
    #[case::error(ErrorMsg::default())]
    #[case::system(SystemMsg::default())]
    #[case::cmbp1(Cmbp1Msg::default())]
    #[case::bbo(BboMsg::default())]
    fn test_encoded_length_matches_size<R: HasRType>(#[case] rec: R) {
        assert_eq!(rec.record_size(), mem::size_of::<R>());
    }

    #[test]
    fn test_has_rtype_dispatch() {
        assert!(SymbolMappingMsg::has_rtype(rtype::SYMBOL_MAPPING));
        assert!(!SymbolMappingMsg::has_rtype(rtype::SYSTEM));
        assert!(Cmbp1Msg::has_rtype(rtype::CMBP_1));
        assert!(Cmbp1Msg::has_rtype(rtype::CBBO_1S));
        assert!(Cmbp1Msg::has_rtype(rtype::TCBBO));
        assert!(!Cmbp1Msg::has_rtype(rtype::BBO_1S));
        assert!(BboMsg::has_rtype(rtype::BBO_1M));
    }

    #[test]
    fn test_with_ts_out_size() {
        assert_eq!(mem::size_of::<WithTsOut<SystemMsg>>(), 88);
        let rec = WithTsOut::new(SystemMsg::default(), 1);
        assert_eq!(rec.record_size(), 88);
        assert!(WithTsOut::<SystemMsg>::has_rtype(rtype::SYSTEM));
    }

    #[test]
    fn test_index_ts_override() {
        let mut rec = Cmbp1Msg::default();
        rec.hd.ts_event = 1;
        rec.ts_recv = 2;
        assert_eq!(rec.raw_index_ts(), 2);
        let mut sys = SystemMsg::default();
        sys.hd.ts_event = 3;
        assert_eq!(sys.raw_index_ts(), 3);
    }
}
