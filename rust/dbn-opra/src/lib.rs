//! Discovery of optionable roots and option contracts from Databento's OPRA
//! feed.
//!
//! [`OpraDiscovery`] drives a [`dbn_live::Session`] through an intra-day
//! replay of the [`OPRA_DATASET`] definition schema, decoding each mapped
//! symbol as an OCC (OSI) option symbol, filing contracts under a sorted
//! catalog of roots, and cross-referencing each contract to its security
//! definition once the replay finishes.

pub mod discover;
pub mod osi;

pub use crate::{
    discover::{
        DiscoveryResults, DiscoveryState, OpraDiscovery, OptionContract, OptionRoot,
        OPRA_DATASET,
    },
    osi::{OsiSymbol, OSI_LEN},
};
