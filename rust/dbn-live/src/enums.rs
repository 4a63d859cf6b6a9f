//! Enums used in the live gateway protocol and in DBN records.

use std::fmt::{self, Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Error;

/// A side of the market. The side of the market for resting orders, or the side
/// of the aggressor for trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Side {
    /// A sell order or sell aggressor in a trade.
    Ask = b'A',
    /// A buy order or a buy aggressor in a trade.
    Bid = b'B',
    /// No side specified by the original source.
    None = b'N',
}

impl From<Side> for char {
    fn from(side: Side) -> Self {
        u8::from(side) as char
    }
}

/// An order event or order book operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Action {
    /// An existing order was modified: price and/or size.
    Modify = b'M',
    /// An aggressing order traded. Does not affect the book.
    Trade = b'T',
    /// An existing order was filled. Does not affect the book.
    Fill = b'F',
    /// An order was fully or partially cancelled.
    Cancel = b'C',
    /// A new order was added to the book.
    Add = b'A',
    /// Reset the book; clear all orders for an instrument.
    Clear = b'R',
    /// Has no effect on the book, but may carry `flags` or other information.
    None = b'N',
}

impl From<Action> for char {
    fn from(action: Action) -> Self {
        u8::from(action) as char
    }
}

/// The class of instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum InstrumentClass {
    /// A bond.
    Bond = b'B',
    /// A call option.
    Call = b'C',
    /// A future.
    Future = b'F',
    /// A stock.
    Stock = b'K',
    /// A spread composed of multiple instrument classes.
    MixedSpread = b'M',
    /// A put option.
    Put = b'P',
    /// A spread composed of futures.
    FutureSpread = b'S',
    /// A spread composed of options.
    OptionSpread = b'T',
    /// A foreign exchange spot.
    FxSpot = b'X',
}

impl From<InstrumentClass> for char {
    fn from(class: InstrumentClass) -> Self {
        u8::from(class) as char
    }
}

impl InstrumentClass {
    /// Returns `true` if the instrument class is a call or put option.
    pub fn is_option(&self) -> bool {
        matches!(self, Self::Call | Self::Put)
    }
}

/// Whether an instrument definition has been added, modified, or deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Default,
)]
#[repr(u8)]
pub enum SecurityUpdateAction {
    /// A new instrument definition.
    #[default]
    Add = b'A',
    /// A modified instrument definition of an existing one.
    Modify = b'M',
    /// Removal of an instrument definition.
    Delete = b'D',
}

/// Whether the instrument is user-defined.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Default,
)]
#[repr(u8)]
pub enum UserDefinedInstrument {
    /// The instrument is not user-defined.
    #[default]
    No = b'N',
    /// The instrument is user-defined.
    Yes = b'Y',
}

/// Record types for the different Databento record types.
pub mod rtype {
    use num_enum::TryFromPrimitive;

    /// A type of record, i.e. a struct implementing
    /// [`HasRType`](crate::record::HasRType).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
    #[repr(u8)]
    pub enum RType {
        /// Market by price with a book depth of 0 (used for trades).
        Mbp0 = 0,
        /// Market by price with a book depth of 1 (also used for TBBO).
        Mbp1 = 0x01,
        /// Market by price with a book depth of 10.
        Mbp10 = 0x0A,
        /// Exchange status.
        Status = 0x12,
        /// Instrument definition.
        InstrumentDef = 0x13,
        /// Order imbalance.
        Imbalance = 0x14,
        /// Error from the gateway.
        Error = 0x15,
        /// Symbol mapping resolved by the gateway.
        SymbolMapping = 0x16,
        /// A non-error message from the gateway. Also used for heartbeats.
        System = 0x17,
        /// Statistics from the publisher (not calculated by Databento).
        Statistics = 0x18,
        /// Open, high, low, close, and volume at a 1-second cadence.
        Ohlcv1S = 0x20,
        /// Open, high, low, close, and volume at a 1-minute cadence.
        Ohlcv1M = 0x21,
        /// Open, high, low, close, and volume at an hourly cadence.
        Ohlcv1H = 0x22,
        /// Open, high, low, close, and volume at a daily cadence.
        Ohlcv1D = 0x23,
        /// Market by order.
        Mbo = 0xA0,
        /// Consolidated market by price with a book depth of 1.
        Cmbp1 = 0xB1,
        /// Consolidated best bid and offer subsampled at 1-second intervals.
        Cbbo1S = 0xC0,
        /// Consolidated best bid and offer subsampled at 1-minute intervals.
        Cbbo1M = 0xC1,
        /// All trade events with the consolidated best bid and offer
        /// immediately before the effect of the trade.
        Tcbbo = 0xC2,
        /// Best bid and offer subsampled at 1-second intervals.
        Bbo1S = 0xC3,
        /// Best bid and offer subsampled at 1-minute intervals.
        Bbo1M = 0xC4,
    }

    /// Market by price with a book depth of 0 (used for trades).
    pub const MBP_0: u8 = RType::Mbp0 as u8;
    /// Market by price with a book depth of 1 (also used for TBBO).
    pub const MBP_1: u8 = RType::Mbp1 as u8;
    /// Market by price with a book depth of 10.
    pub const MBP_10: u8 = RType::Mbp10 as u8;
    /// Exchange status.
    pub const STATUS: u8 = RType::Status as u8;
    /// Instrument definition.
    pub const INSTRUMENT_DEF: u8 = RType::InstrumentDef as u8;
    /// Order imbalance.
    pub const IMBALANCE: u8 = RType::Imbalance as u8;
    /// Error from the gateway.
    pub const ERROR: u8 = RType::Error as u8;
    /// Symbol mapping resolved by the gateway.
    pub const SYMBOL_MAPPING: u8 = RType::SymbolMapping as u8;
    /// A non-error message from the gateway. Also used for heartbeats.
    pub const SYSTEM: u8 = RType::System as u8;
    /// Statistics from the publisher (not calculated by Databento).
    pub const STATISTICS: u8 = RType::Statistics as u8;
    /// Open, high, low, close, and volume at a 1-second cadence.
    pub const OHLCV_1S: u8 = RType::Ohlcv1S as u8;
    /// Open, high, low, close, and volume at a 1-minute cadence.
    pub const OHLCV_1M: u8 = RType::Ohlcv1M as u8;
    /// Open, high, low, close, and volume at an hourly cadence.
    pub const OHLCV_1H: u8 = RType::Ohlcv1H as u8;
    /// Open, high, low, close, and volume at a daily cadence.
    pub const OHLCV_1D: u8 = RType::Ohlcv1D as u8;
    /// Market by order.
    pub const MBO: u8 = RType::Mbo as u8;
    /// Consolidated market by price with a book depth of 1.
    pub const CMBP_1: u8 = RType::Cmbp1 as u8;
    /// Consolidated best bid and offer subsampled at 1-second intervals.
    pub const CBBO_1S: u8 = RType::Cbbo1S as u8;
    /// Consolidated best bid and offer subsampled at 1-minute intervals.
    pub const CBBO_1M: u8 = RType::Cbbo1M as u8;
    /// All trade events with the consolidated best bid and offer immediately
    /// before the effect of the trade.
    pub const TCBBO: u8 = RType::Tcbbo as u8;
    /// Best bid and offer subsampled at 1-second intervals.
    pub const BBO_1S: u8 = RType::Bbo1S as u8;
    /// Best bid and offer subsampled at 1-minute intervals.
    pub const BBO_1M: u8 = RType::Bbo1M as u8;
}

pub use rtype::RType;

/// A data record schema that can be subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Schema {
    /// Market by order.
    Mbo = 0,
    /// Market by price with a book depth of 1.
    Mbp1 = 1,
    /// Market by price with a book depth of 10.
    Mbp10 = 2,
    /// All trade events with the best bid and offer (BBO) immediately
    /// **before** the effect of the trade.
    Tbbo = 3,
    /// All trade events.
    Trades = 4,
    /// Open, high, low, close, and volume at a one-second interval.
    Ohlcv1S = 5,
    /// Open, high, low, close, and volume at a one-minute interval.
    Ohlcv1M = 6,
    /// Open, high, low, close, and volume at an hourly interval.
    Ohlcv1H = 7,
    /// Open, high, low, close, and volume at a daily interval.
    Ohlcv1D = 8,
    /// Instrument definitions.
    Definition = 9,
    /// Additional data disseminated by publishers.
    Statistics = 10,
    /// Exchange status.
    Status = 11,
    /// Auction imbalance events.
    Imbalance = 12,
    /// Consolidated market by price with a book depth of 1.
    Cmbp1 = 13,
    /// Consolidated best bid and offer subsampled at 1-second intervals.
    Cbbo1S = 14,
    /// Consolidated best bid and offer subsampled at 1-minute intervals.
    Cbbo1M = 15,
    /// All trade events with the consolidated best bid and offer immediately
    /// before the effect of the trade.
    Tcbbo = 16,
    /// Best bid and offer subsampled at 1-second intervals.
    Bbo1S = 17,
    /// Best bid and offer subsampled at 1-minute intervals.
    Bbo1M = 18,
}

impl std::str::FromStr for Schema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mbo" => Ok(Schema::Mbo),
            "mbp-1" => Ok(Schema::Mbp1),
            "mbp-10" => Ok(Schema::Mbp10),
            "tbbo" => Ok(Schema::Tbbo),
            "trades" => Ok(Schema::Trades),
            "ohlcv-1s" => Ok(Schema::Ohlcv1S),
            "ohlcv-1m" => Ok(Schema::Ohlcv1M),
            "ohlcv-1h" => Ok(Schema::Ohlcv1H),
            "ohlcv-1d" => Ok(Schema::Ohlcv1D),
            "definition" => Ok(Schema::Definition),
            "statistics" => Ok(Schema::Statistics),
            "status" => Ok(Schema::Status),
            "imbalance" => Ok(Schema::Imbalance),
            "cmbp-1" => Ok(Schema::Cmbp1),
            "cbbo-1s" => Ok(Schema::Cbbo1S),
            "cbbo-1m" => Ok(Schema::Cbbo1M),
            "tcbbo" => Ok(Schema::Tcbbo),
            "bbo-1s" => Ok(Schema::Bbo1S),
            "bbo-1m" => Ok(Schema::Bbo1M),
            _ => Err(Error::conversion::<Schema>(s)),
        }
    }
}

impl Schema {
    /// Converts the schema to its `str` representation, the form the gateway
    /// expects in a subscription request.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Schema::Mbo => "mbo",
            Schema::Mbp1 => "mbp-1",
            Schema::Mbp10 => "mbp-10",
            Schema::Tbbo => "tbbo",
            Schema::Trades => "trades",
            Schema::Ohlcv1S => "ohlcv-1s",
            Schema::Ohlcv1M => "ohlcv-1m",
            Schema::Ohlcv1H => "ohlcv-1h",
            Schema::Ohlcv1D => "ohlcv-1d",
            Schema::Definition => "definition",
            Schema::Statistics => "statistics",
            Schema::Status => "status",
            Schema::Imbalance => "imbalance",
            Schema::Cmbp1 => "cmbp-1",
            Schema::Cbbo1S => "cbbo-1s",
            Schema::Cbbo1M => "cbbo-1m",
            Schema::Tcbbo => "tcbbo",
            Schema::Bbo1S => "bbo-1s",
            Schema::Bbo1M => "bbo-1m",
        }
    }
}

impl AsRef<str> for Schema {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbology type for identifying instruments in a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SType {
    /// Symbology using a unique numeric ID.
    InstrumentId = 0,
    /// Symbology using the original symbols provided by the publisher.
    RawSymbol = 1,
    /// A Databento-specific symbology where one symbol may point to different
    /// instruments at different points of time, e.g. to always refer to the
    /// front month future.
    Continuous = 3,
    /// A Databento-specific symbology for referring to a group of symbols by
    /// one "parent" symbol, e.g. ES.FUT to refer to all ES futures.
    Parent = 4,
}

impl std::str::FromStr for SType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instrument_id" | "product_id" => Ok(SType::InstrumentId),
            "raw_symbol" | "native" => Ok(SType::RawSymbol),
            "continuous" => Ok(SType::Continuous),
            "parent" => Ok(SType::Parent),
            _ => Err(Error::conversion::<SType>(s)),
        }
    }
}

impl SType {
    /// Converts the symbology type to its `str` representation, the form the
    /// gateway expects in a subscription request.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SType::InstrumentId => "instrument_id",
            SType::RawSymbol => "raw_symbol",
            SType::Continuous => "continuous",
            SType::Parent => "parent",
        }
    }
}

impl AsRef<str> for SType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for SType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
