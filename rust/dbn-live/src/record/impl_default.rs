use super::*;
use crate::{UNDEF_PRICE, UNDEF_TIMESTAMP};

impl Default for RecordHeader {
    fn default() -> Self {
        Self {
            // Length is set by the `Default` implementation of the record
            // that contains the header.
            length: (mem::size_of::<Self>() / Self::LENGTH_MULTIPLIER) as u8,
            rtype: 0,
            publisher_id: 0,
            instrument_id: 0,
            ts_event: UNDEF_TIMESTAMP,
        }
    }
}

impl Default for SymbolMappingMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::SYMBOL_MAPPING, 0, 0, UNDEF_TIMESTAMP),
            stype_in_symbol: [0; SYMBOL_CSTR_LEN],
            stype_out_symbol: [0; SYMBOL_CSTR_LEN],
            _dummy: [0; 4],
            start_ts: UNDEF_TIMESTAMP,
            end_ts: UNDEF_TIMESTAMP,
        }
    }
}

impl Default for InstrumentDefMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::INSTRUMENT_DEF, 0, 0, UNDEF_TIMESTAMP),
            ts_recv: UNDEF_TIMESTAMP,
            min_price_increment: UNDEF_PRICE,
            display_factor: UNDEF_PRICE,
            expiration: UNDEF_TIMESTAMP,
            activation: UNDEF_TIMESTAMP,
            high_limit_price: UNDEF_PRICE,
            low_limit_price: UNDEF_PRICE,
            max_price_variation: UNDEF_PRICE,
            trading_reference_price: UNDEF_PRICE,
            unit_of_measure_qty: UNDEF_PRICE,
            min_price_increment_amount: UNDEF_PRICE,
            price_ratio: UNDEF_PRICE,
            inst_attrib_value: 0,
            underlying_id: 0,
            raw_instrument_id: 0,
            market_depth_implied: 0,
            market_depth: 0,
            market_segment_id: 0,
            max_trade_vol: 0,
            min_lot_size: 0,
            min_lot_size_block: 0,
            min_lot_size_round_lot: 0,
            min_trade_vol: 0,
            _reserved2: [0; 4],
            contract_multiplier: 0,
            decay_quantity: 0,
            original_contract_size: 0,
            _reserved3: [0; 4],
            trading_reference_date: 0,
            appl_id: 0,
            maturity_year: 0,
            decay_start_date: 0,
            channel_id: 0,
            currency: [0; 4],
            settl_currency: [0; 4],
            secsubtype: [0; 6],
            raw_symbol: [0; SYMBOL_CSTR_LEN],
            group: [0; 21],
            exchange: [0; 5],
            asset: [0; 7],
            cfi: [0; 7],
            security_type: [0; 7],
            unit_of_measure: [0; 31],
            underlying: [0; 21],
            strike_price_currency: [0; 4],
            instrument_class: 0,
            _reserved4: [0; 2],
            strike_price: UNDEF_PRICE,
            _reserved5: [0; 6],
            match_algorithm: b'F' as c_char,
            md_security_trading_status: 0,
            main_fraction: 0,
            price_display_format: 0,
            settl_price_type: 0,
            sub_fraction: 0,
            underlying_product: 0,
            security_update_action: SecurityUpdateAction::Add,
            maturity_month: 0,
            maturity_day: 0,
            maturity_week: 0,
            user_defined_instrument: UserDefinedInstrument::No,
            contract_multiplier_unit: 0,
            flow_schedule_type: 0,
            tick_rule: 0,
            _dummy: [0; 3],
        }
    }
}

impl Default for ErrorMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::ERROR, 0, 0, UNDEF_TIMESTAMP),
            err: [0; 64],
        }
    }
}

impl Default for SystemMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::SYSTEM, 0, 0, UNDEF_TIMESTAMP),
            msg: [0; 64],
        }
    }
}

impl Default for Cmbp1Msg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::CMBP_1, 0, 0, UNDEF_TIMESTAMP),
            price: UNDEF_PRICE,
            size: 0,
            action: b'N' as c_char,
            side: b'N' as c_char,
            flags: FlagSet::empty(),
            _reserved1: 0,
            ts_recv: UNDEF_TIMESTAMP,
            ts_in_delta: 0,
            _reserved2: [0; 4],
            levels: Default::default(),
        }
    }
}

impl Default for BboMsg {
    fn default() -> Self {
        Self {
            hd: RecordHeader::new::<Self>(rtype::BBO_1S, 0, 0, UNDEF_TIMESTAMP),
            price: UNDEF_PRICE,
            size: 0,
            _reserved1: 0,
            side: b'N' as c_char,
            flags: FlagSet::empty(),
            _reserved2: 0,
            ts_recv: UNDEF_TIMESTAMP,
            _reserved3: [0; 4],
            sequence: 0,
            levels: Default::default(),
        }
    }
}
