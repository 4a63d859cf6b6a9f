//! Helper macros for implementing the record traits on concrete record types.

/// Implements [`Record`](crate::record::Record),
/// [`RecordMut`](crate::record::RecordMut),
/// [`HasRType`](crate::record::HasRType), and `AsRef<[u8]>` for a record
/// struct whose first field is the common header `hd`, dispatching on the
/// given rtypes. An optional `index_ts` field overrides the raw primary
/// timestamp used for sorting and symbology lookups.
macro_rules! impl_record {
    ($ty:ident : $($rtype:path),+) => {
        impl crate::record::Record for $ty {
            fn header(&self) -> &crate::record::RecordHeader {
                &self.hd
            }
        }

        crate::macros::impl_record!(@common $ty : $($rtype),+);
    };
    ($ty:ident : $($rtype:path),+ ; index_ts = $index_ts:ident) => {
        impl crate::record::Record for $ty {
            fn header(&self) -> &crate::record::RecordHeader {
                &self.hd
            }

            fn raw_index_ts(&self) -> u64 {
                self.$index_ts
            }
        }

        crate::macros::impl_record!(@common $ty : $($rtype),+);
    };
    (@common $ty:ident : $($rtype:path),+) => {
        impl crate::record::RecordMut for $ty {
            fn header_mut(&mut self) -> &mut crate::record::RecordHeader {
                &mut self.hd
            }
        }

        impl crate::record::HasRType for $ty {
            fn has_rtype(rtype: u8) -> bool {
                matches!(rtype, $($rtype)|+)
            }
        }

        impl AsRef<[u8]> for $ty {
            fn as_ref(&self) -> &[u8] {
                // Safety: all record structs are plain old data.
                unsafe { crate::record::as_u8_slice(self) }
            }
        }
    };
}

pub(crate) use impl_record;
