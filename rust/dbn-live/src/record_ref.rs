//! The [`RecordRef`] struct for non-owning dynamically-typed references to
//! DBN records.

use std::{fmt::Debug, marker::PhantomData, mem, ptr::NonNull};

use crate::{
    record::{HasRType, Record, RecordHeader},
    RecordRefEnum,
};

/// A wrapper around a non-owning immutable reference to a DBN record. This
/// wrapper allows for mixing of record types and schemas, and runtime record
/// polymorphism.
///
/// It has the [`has()`](Self::has) method for testing if the contained value
/// is of a particular type, and the inner value can be downcasted to specific
/// record types via the [`get()`](Self::get) method.
///
/// The common record header is directly accessible through the
/// [`header()`](Self::header) method.
#[derive(Copy, Clone)]
pub struct RecordRef<'a> {
    ptr: NonNull<RecordHeader>,
    /// Associates the object with the lifetime of the memory pointed to by
    /// `ptr`.
    _marker: PhantomData<&'a RecordHeader>,
}

// Safety: RecordRef exhibits immutable reference semantics similar to &T.
// It should be safe to both send it across threads or access it simultaneously
// (since the data is immutable).
unsafe impl Send for RecordRef<'_> {}
unsafe impl Sync for RecordRef<'_> {}

impl<'a> RecordRef<'a> {
    /// Constructs a new reference to the DBN record in `buffer`.
    ///
    /// # Safety
    /// `buffer` should begin with a [`RecordHeader`] and contain a complete
    /// record of a type implementing [`HasRType`].
    pub unsafe fn new(buffer: &'a [u8]) -> Self {
        debug_assert!(
            buffer.len() >= mem::size_of::<RecordHeader>(),
            "buffer of length {} is too short",
            buffer.len()
        );

        // Safety: casting to `*mut` to use `NonNull`, but `ptr` is still
        // treated internally as an immutable reference
        let raw_ptr = buffer.as_ptr() as *mut RecordHeader;

        // Check if alignment of pointer matches that of header (and all
        // records)
        debug_assert_eq!(
            raw_ptr.align_offset(std::mem::align_of::<RecordHeader>()),
            0,
            "unaligned buffer passed to `RecordRef::new`"
        );
        let ptr = NonNull::new_unchecked(raw_ptr.cast::<RecordHeader>());
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Constructs a new reference to the DBN record.
    ///
    /// # Safety
    /// `header` must point to a valid DBN record.
    pub unsafe fn unchecked_from_header(header: *const RecordHeader) -> Self {
        Self {
            // `NonNull` requires `mut` but it is never mutated
            ptr: NonNull::new_unchecked(header.cast_mut()),
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the object points to a record of type `T`.
    pub fn has<T: HasRType>(&self) -> bool {
        T::has_rtype(self.header().rtype)
    }

    /// Returns a reference to the underlying record of type `T` or `None` if
    /// it points to another record type.
    ///
    /// Note: for safety, this method calls [`has::<T>()`](Self::has). To
    /// avoid a duplicate check, use [`get_unchecked()`](Self::get_unchecked).
    ///
    /// # Panics
    /// This function will panic if the rtype indicates it's of type `T` but
    /// the encoded length of the record is less than the size of `T`.
    pub fn get<T: HasRType>(&self) -> Option<&'a T> {
        if self.has::<T>() {
            assert!(
                self.record_size() >= mem::size_of::<T>(),
                "malformed `{}` record: expected length of at least {} bytes, found {} bytes",
                std::any::type_name::<T>(),
                mem::size_of::<T>(),
                self.record_size()
            );
            // Safety: checked `rtype` in call to `has()`. Assumes the initial
            // data passed to `RecordRef` is indeed a record.
            Some(unsafe { self.ptr.cast::<T>().as_ref() })
        } else {
            None
        }
    }

    /// Like [`get()`](Self::get), but returns an error if the inner record is
    /// not a `T` or has the correct `rtype` for `T`, but insufficient
    /// `length`. Never panics.
    ///
    /// # Errors
    /// This function returns an error if it does not hold a `T` or if its
    /// `rtype` matches `T`, but its `length` is too short.
    pub fn try_get<T: HasRType>(&self) -> crate::Result<&'a T> {
        if self.has::<T>() {
            if self.record_size() >= mem::size_of::<T>() {
                // Safety: checked `rtype` in call to `has()` and size
                Ok(unsafe { self.ptr.cast::<T>().as_ref() })
            } else {
                Err(crate::Error::conversion::<T>(format!(
                    "{self:?} has insufficient length"
                )))
            }
        } else {
            Err(crate::Error::conversion::<T>(format!(
                "{self:?} has incorrect rtype"
            )))
        }
    }

    /// Returns a native Rust enum with a variant for each known record type
    /// and an [`Other`](RecordRefEnum::Other) variant for the rest. This
    /// allows for pattern `match`ing.
    pub fn as_enum(&self) -> RecordRefEnum<'a> {
        RecordRefEnum::from(*self)
    }

    /// Returns a reference to the underlying record of type `T` without
    /// checking if this object references a record of type `T`.
    ///
    /// For a safe alternative, see [`get()`](Self::get).
    ///
    /// # Safety
    /// The caller needs to validate this object points to a `T`.
    pub unsafe fn get_unchecked<T: HasRType>(&self) -> &'a T {
        debug_assert!(self.has::<T>());
        debug_assert!(self.record_size() >= mem::size_of::<T>());
        self.ptr.cast::<T>().as_ref()
    }

    /// Returns the common header of the record, borrowed for the lifetime of
    /// the referenced record rather than of `&self`.
    pub(crate) fn header_ref(&self) -> &'a RecordHeader {
        // Safety: assumes `ptr` points to a `RecordHeader`.
        unsafe { self.ptr.as_ref() }
    }
}

impl<'a, R> From<&'a R> for RecordRef<'a>
where
    R: HasRType,
{
    /// Constructs a new reference to a DBN record.
    fn from(rec: &'a R) -> Self {
        Self {
            // Safety: `R` must be a record because it implements `HasRType`.
            // Casting to `mut` is required for `NonNull`, but it is never
            // mutated.
            ptr: unsafe {
                NonNull::new_unchecked((rec.header() as *const RecordHeader).cast_mut())
            },
            _marker: PhantomData,
        }
    }
}

impl<'a> AsRef<[u8]> for RecordRef<'a> {
    fn as_ref(&self) -> &'a [u8] {
        // Safety: Assumes the encoded record length is correct.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const u8, self.record_size()) }
    }
}

impl<'a> Record for RecordRef<'a> {
    fn header(&self) -> &'a RecordHeader {
        // Safety: assumes `ptr` points to a `RecordHeader`.
        unsafe { self.ptr.as_ref() }
    }
}

impl Debug for RecordRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRef")
            .field(
                "ptr",
                &format_args!("{:?} --> {:?}", self.ptr, self.header()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        enums::rtype, record::str_to_c_chars, ErrorMsg, InstrumentDefMsg, SymbolMappingMsg,
        SystemMsg,
    };

    use super::*;

    fn source_record() -> SystemMsg {
        let mut rec = SystemMsg {
            hd: RecordHeader::new::<SystemMsg>(rtype::SYSTEM, 1, 1, 0),
            ..Default::default()
        };
        rec.msg = str_to_c_chars("Heartbeat").unwrap();
        rec
    }

    #[test]
    fn test_header() {
        let source = source_record();
        let target = RecordRef::from(&source);
        assert_eq!(*target.header(), source.hd);
    }

    #[test]
    fn test_has_and_get() {
        let source = source_record();
        let target = RecordRef::from(&source);
        assert!(!target.has::<ErrorMsg>());
        assert!(!target.has::<SymbolMappingMsg>());
        assert!(!target.has::<InstrumentDefMsg>());
        assert!(target.has::<SystemMsg>());
        assert_eq!(*target.get::<SystemMsg>().unwrap(), source);
    }

    #[test]
    fn test_as_ref() {
        let source = source_record();
        let target = RecordRef::from(&source);
        let byte_slice = target.as_ref();
        assert_eq!(source.record_size(), byte_slice.len());
        assert_eq!(target.record_size(), byte_slice.len());
    }

    #[should_panic]
    #[test]
    fn test_get_too_short() {
        let mut src = source_record();
        src.hd.length -= 1;
        let target = RecordRef::from(&src);
        // panic due to unexpected length
        target.get::<SystemMsg>();
    }

    #[test]
    fn test_try_get_too_short() {
        let mut src = source_record();
        src.hd.length -= 1;
        let target = RecordRef::from(&src);
        assert!(
            matches!(target.try_get::<SystemMsg>(), Err(e) if e.to_string().contains("insufficient length"))
        );
    }

    #[test]
    fn niche() {
        assert_eq!(
            std::mem::size_of::<RecordRef>(),
            std::mem::size_of::<Option<RecordRef>>()
        );
        assert_eq!(
            std::mem::size_of::<RecordRef>(),
            std::mem::size_of::<usize>()
        );
    }
}
