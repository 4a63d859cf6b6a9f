use std::fmt::Debug;

use super::{conv::px_to_f64, *};
use crate::{error::Error, Action, InstrumentClass, Side};

impl RecordHeader {
    /// The multiplier for converting the `length` field to the number of
    /// bytes.
    pub const LENGTH_MULTIPLIER: usize = 4;

    /// Creates a new `RecordHeader`. `R` and `rtype` should be compatible.
    pub const fn new<R: HasRType>(
        rtype: u8,
        publisher_id: u16,
        instrument_id: u32,
        ts_event: u64,
    ) -> Self {
        Self {
            length: (mem::size_of::<R>() / Self::LENGTH_MULTIPLIER) as u8,
            rtype,
            publisher_id,
            instrument_id,
            ts_event,
        }
    }

    /// Returns the size of the **entire** record in bytes. The size of a
    /// `RecordHeader` is constant.
    pub const fn record_size(&self) -> usize {
        self.length as usize * Self::LENGTH_MULTIPLIER
    }

    /// Tries to convert the raw record type into an enum.
    ///
    /// # Errors
    /// This function returns an error if the `rtype` field does not contain a
    /// valid, known [`RType`].
    pub fn rtype(&self) -> crate::Result<RType> {
        RType::try_from(self.rtype)
            .map_err(|_| Error::conversion::<RType>(format!("{:#04X}", self.rtype)))
    }

    /// Parses the raw matching-engine-received timestamp into a datetime.
    /// Returns `None` if `ts_event` contains the sentinel for a null
    /// timestamp.
    pub fn ts_event(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_event)
    }
}

impl Debug for RecordHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug_struct = f.debug_struct("RecordHeader");
        debug_struct.field("length", &self.length);
        match self.rtype() {
            Ok(rtype) => debug_struct.field("rtype", &format_args!("{rtype:?}")),
            Err(_) => debug_struct.field("rtype", &format_args!("{:#04X}", &self.rtype)),
        };
        debug_struct
            .field("publisher_id", &self.publisher_id)
            .field("instrument_id", &self.instrument_id)
            .field("ts_event", &self.ts_event)
            .finish()
    }
}

impl SymbolMappingMsg {
    /// Returns the input symbol as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `stype_in_symbol` contains invalid
    /// UTF-8.
    pub fn stype_in_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.stype_in_symbol)
    }

    /// Returns the output symbol as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `stype_out_symbol` contains invalid
    /// UTF-8.
    pub fn stype_out_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.stype_out_symbol)
    }

    /// Parses the start of the mapping interval into a datetime. Returns
    /// `None` if `start_ts` contains the sentinel for a null timestamp.
    pub fn start_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.start_ts)
    }

    /// Parses the end of the mapping interval into a datetime. Returns `None`
    /// if `end_ts` contains the sentinel for a null timestamp.
    pub fn end_ts(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.end_ts)
    }
}

impl InstrumentDefMsg {
    /// Returns the raw symbol assigned by the publisher as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `raw_symbol` contains invalid UTF-8.
    pub fn raw_symbol(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.raw_symbol)
    }

    /// Returns the exchange used to identify the instrument as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `exchange` contains invalid UTF-8.
    pub fn exchange(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.exchange)
    }

    /// Returns the underlying asset code (product code) as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `asset` contains invalid UTF-8.
    pub fn asset(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.asset)
    }

    /// Parses the classification of the instrument into an enum.
    ///
    /// # Errors
    /// This function returns an error if the `instrument_class` field does
    /// not contain a valid [`InstrumentClass`].
    pub fn instrument_class(&self) -> crate::Result<InstrumentClass> {
        InstrumentClass::try_from(self.instrument_class as u8).map_err(|_| {
            Error::conversion::<InstrumentClass>(format!("{:#04X}", self.instrument_class as u8))
        })
    }

    /// Converts the strike price to a floating point.
    ///
    /// `UNDEF_PRICE` will be converted to NaN.
    pub fn strike_price_f64(&self) -> f64 {
        px_to_f64(self.strike_price)
    }

    /// Parses the last eligible trade time into a datetime. Returns `None` if
    /// `expiration` contains the sentinel for a null timestamp.
    pub fn expiration(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.expiration)
    }

    /// Parses the capture-server-received timestamp into a datetime. Returns
    /// `None` if `ts_recv` contains the sentinel for a null timestamp.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl ErrorMsg {
    /// Creates a new `ErrorMsg` with `ts_event` and the given message,
    /// truncated to fit if necessary.
    pub fn new(ts_event: u64, msg: &str) -> Self {
        let mut error = Self {
            hd: RecordHeader::new::<Self>(rtype::ERROR, 0, 0, ts_event),
            ..Default::default()
        };
        // Leave at least one null byte.
        for (i, byte) in msg.as_bytes().iter().take(error.err.len() - 1).enumerate() {
            error.err[i] = *byte as c_char;
        }
        error
    }

    /// Returns the message from the gateway as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `err` contains invalid UTF-8.
    pub fn err(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.err)
    }
}

impl SystemMsg {
    /// The message the gateway uses for heartbeat records.
    pub const HEARTBEAT: &'static str = "Heartbeat";

    /// Returns the message from the gateway as a `&str`.
    ///
    /// # Errors
    /// This function returns an error if `msg` contains invalid UTF-8.
    pub fn msg(&self) -> crate::Result<&str> {
        c_chars_to_str(&self.msg)
    }

    /// Checks whether the message is a heartbeat from the gateway.
    pub fn is_heartbeat(&self) -> bool {
        self.msg()
            .map(|msg| msg.starts_with(Self::HEARTBEAT))
            .unwrap_or_default()
    }
}

impl Cmbp1Msg {
    /// Converts the order price to a floating point.
    ///
    /// `UNDEF_PRICE` will be converted to NaN.
    pub fn price_f64(&self) -> f64 {
        px_to_f64(self.price)
    }

    /// Parses the event action into an enum.
    ///
    /// # Errors
    /// This function returns an error if the `action` field does not contain
    /// a valid [`Action`].
    pub fn action(&self) -> crate::Result<Action> {
        Action::try_from(self.action as u8)
            .map_err(|_| Error::conversion::<Action>(format!("{:#04X}", self.action as u8)))
    }

    /// Parses the side that initiates the event into an enum.
    ///
    /// # Errors
    /// This function returns an error if the `side` field does not contain a
    /// valid [`Side`].
    pub fn side(&self) -> crate::Result<Side> {
        Side::try_from(self.side as u8)
            .map_err(|_| Error::conversion::<Side>(format!("{:#04X}", self.side as u8)))
    }

    /// Parses the capture-server-received timestamp into a datetime. Returns
    /// `None` if `ts_recv` contains the sentinel for a null timestamp.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl BboMsg {
    /// Converts the price of the last trade to a floating point.
    ///
    /// `UNDEF_PRICE` will be converted to NaN.
    pub fn price_f64(&self) -> f64 {
        px_to_f64(self.price)
    }

    /// Parses the side that initiated the last trade into an enum.
    ///
    /// # Errors
    /// This function returns an error if the `side` field does not contain a
    /// valid [`Side`].
    pub fn side(&self) -> crate::Result<Side> {
        Side::try_from(self.side as u8)
            .map_err(|_| Error::conversion::<Side>(format!("{:#04X}", self.side as u8)))
    }

    /// Parses the interval end timestamp into a datetime. Returns `None` if
    /// `ts_recv` contains the sentinel for a null timestamp.
    pub fn ts_recv(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_recv)
    }
}

impl<T: HasRType> WithTsOut<T> {
    /// Creates a new record with `ts_out`. Updates the `length` property in
    /// the header to ensure the additional timestamp is accounted for.
    pub fn new(rec: T, ts_out: u64) -> Self {
        let mut res = Self { rec, ts_out };
        res.header_mut().length = (mem::size_of::<Self>() / RecordHeader::LENGTH_MULTIPLIER) as u8;
        res
    }

    /// Parses the gateway send timestamp into a datetime.
    pub fn ts_out(&self) -> Option<time::OffsetDateTime> {
        ts_to_dt(self.ts_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_msg_new_truncates() {
        let msg = ErrorMsg::new(0, &"x".repeat(100));
        assert_eq!(msg.err().unwrap().len(), 63);
    }

    #[test]
    fn test_system_msg_heartbeat() {
        let mut msg = SystemMsg::default();
        msg.msg = str_to_c_chars("Heartbeat").unwrap();
        assert!(msg.is_heartbeat());
        msg.msg = str_to_c_chars("Finished definition replay").unwrap();
        assert!(!msg.is_heartbeat());
    }

    #[test]
    fn test_header_debug_unknown_rtype() {
        let header = RecordHeader {
            length: 4,
            rtype: 0xFF,
            publisher_id: 1,
            instrument_id: 2,
            ts_event: 3,
        };
        let out = format!("{header:?}");
        assert!(out.contains("rtype: 0xFF"));
    }
}
