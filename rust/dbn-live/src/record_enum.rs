//! Enum for the known DBN record types, with a catch-all for the rest.

use crate::{
    enums::rtype, BboMsg, Cmbp1Msg, ErrorMsg, InstrumentDefMsg, Record, RecordRef,
    SymbolMappingMsg, SystemMsg,
};

/// An enum with a variant for each record type the live client models,
/// wrapping a reference to that record, plus [`Other`](Self::Other) for every
/// record type it does not. Records of unknown or unmodeled rtype are still
/// delivered so callers can skip or inspect them; the framing layer always
/// advances by the encoded record length.
#[derive(Debug, Clone, Copy)]
pub enum RecordRefEnum<'a> {
    /// A reference to a symbol mapping resolved by the gateway.
    SymbolMapping(&'a SymbolMappingMsg),
    /// A reference to an instrument definition.
    InstrumentDef(&'a InstrumentDefMsg),
    /// A reference to an error message from the gateway.
    Error(&'a ErrorMsg),
    /// A reference to a non-error message from the gateway.
    System(&'a SystemMsg),
    /// A reference to a consolidated market-by-price record with a book depth
    /// of 1, including the consolidated BBO subsampled records that share its
    /// layout.
    Cmbp1(&'a Cmbp1Msg),
    /// A reference to a subsampled best-bid-and-offer record.
    Bbo(&'a BboMsg),
    /// A reference to a record of any other type. Also used as the fallback
    /// for records of a known type whose encoded length is shorter than the
    /// modeled struct.
    Other(RecordRef<'a>),
}

impl<'a> From<RecordRef<'a>> for RecordRefEnum<'a> {
    fn from(rec_ref: RecordRef<'a>) -> Self {
        match rec_ref.header().rtype {
            rtype::SYMBOL_MAPPING => rec_ref
                .try_get::<SymbolMappingMsg>()
                .map(Self::SymbolMapping),
            rtype::INSTRUMENT_DEF => rec_ref.try_get::<InstrumentDefMsg>().map(Self::InstrumentDef),
            rtype::ERROR => rec_ref.try_get::<ErrorMsg>().map(Self::Error),
            rtype::SYSTEM => rec_ref.try_get::<SystemMsg>().map(Self::System),
            rtype::CMBP_1 | rtype::CBBO_1S | rtype::CBBO_1M | rtype::TCBBO => {
                rec_ref.try_get::<Cmbp1Msg>().map(Self::Cmbp1)
            }
            rtype::BBO_1S | rtype::BBO_1M => rec_ref.try_get::<BboMsg>().map(Self::Bbo),
            _ => Ok(Self::Other(rec_ref)),
        }
        .unwrap_or(Self::Other(rec_ref))
    }
}

impl<'a> From<&RecordRefEnum<'a>> for RecordRef<'a> {
    fn from(rec_enum: &RecordRefEnum<'a>) -> Self {
        match rec_enum {
            RecordRefEnum::SymbolMapping(rec) => Self::from(*rec),
            RecordRefEnum::InstrumentDef(rec) => Self::from(*rec),
            RecordRefEnum::Error(rec) => Self::from(*rec),
            RecordRefEnum::System(rec) => Self::from(*rec),
            RecordRefEnum::Cmbp1(rec) => Self::from(*rec),
            RecordRefEnum::Bbo(rec) => Self::from(*rec),
            RecordRefEnum::Other(rec) => *rec,
        }
    }
}

impl<'a> RecordRefEnum<'a> {
    /// Returns the common header of the record.
    pub fn header(&self) -> &'a crate::RecordHeader {
        match self {
            Self::SymbolMapping(rec) => rec.header(),
            Self::InstrumentDef(rec) => rec.header(),
            Self::Error(rec) => rec.header(),
            Self::System(rec) => rec.header(),
            Self::Cmbp1(rec) => rec.header(),
            Self::Bbo(rec) => rec.header(),
            Self::Other(rec) => rec.header_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{record::str_to_c_chars, RecordHeader};

    use super::*;

    #[test]
    fn test_known_variant() {
        let mut rec = SystemMsg::default();
        rec.msg = str_to_c_chars("Heartbeat").unwrap();
        let rec_ref = RecordRef::from(&rec);
        assert!(matches!(
            rec_ref.as_enum(),
            RecordRefEnum::System(msg) if msg.is_heartbeat()
        ));
    }

    #[test]
    fn test_unmodeled_rtype_falls_back_to_other() {
        // An MBO record isn't modeled by the live client.
        let mut rec = SystemMsg::default();
        rec.hd.rtype = rtype::MBO;
        let rec_ref = RecordRef::from(&rec);
        assert!(matches!(rec_ref.as_enum(), RecordRefEnum::Other(_)));
    }

    #[test]
    fn test_short_known_rtype_falls_back_to_other() {
        let hd = RecordHeader {
            length: 4,
            rtype: rtype::SYMBOL_MAPPING,
            publisher_id: 0,
            instrument_id: 0,
            ts_event: 0,
        };
        // Only a bare header, much shorter than a `SymbolMappingMsg`.
        let rec_ref = unsafe { RecordRef::unchecked_from_header(&hd) };
        assert!(matches!(rec_ref.as_enum(), RecordRefEnum::Other(_)));
    }

    #[test]
    fn test_cbbo_shares_cmbp1_layout() {
        let mut rec = Cmbp1Msg::default();
        rec.hd.rtype = rtype::CBBO_1S;
        let rec_ref = RecordRef::from(&rec);
        assert!(matches!(rec_ref.as_enum(), RecordRefEnum::Cmbp1(_)));
    }
}
