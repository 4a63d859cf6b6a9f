use std::{ffi::CStr, mem, os::raw::c_char, slice};

use crate::Error;

/// Aliases `data` as a slice of raw bytes.
///
/// # Safety
/// `data` must be sized and plain old data (POD), i.e. no pointers.
pub(crate) unsafe fn as_u8_slice<T: Sized>(data: &T) -> &[u8] {
    slice::from_raw_parts((data as *const T).cast(), mem::size_of::<T>())
}

/// Tries to convert a fixed-length null-terminated C char array to a `str`
/// slice.
///
/// # Errors
/// This function returns an error if `chars` contains no null byte or the
/// string before the null byte is not valid UTF-8.
pub fn c_chars_to_str<const N: usize>(chars: &[c_char; N]) -> crate::Result<&str> {
    // Safety: a `[c_char; N]` has the same layout as a `[u8; N]`.
    let bytes = unsafe { slice::from_raw_parts(chars.as_ptr().cast::<u8>(), N) };
    let cstr = CStr::from_bytes_until_nul(bytes)
        .map_err(|_| Error::conversion::<&str>(format!("{bytes:?}")))?;
    cstr.to_str()
        .map_err(|_| Error::conversion::<&str>(format!("{bytes:?}")))
}

/// Tries to convert a str slice to a fixed-length null-terminated C char
/// array.
///
/// # Errors
/// This function returns an error if `s` contains more than `N - 1`
/// characters.
pub fn str_to_c_chars<const N: usize>(s: &str) -> crate::Result<[c_char; N]> {
    if s.len() > N - 1 {
        return Err(Error::conversion::<[c_char; N]>(s));
    }
    let mut res = [0; N];
    for (i, byte) in s.as_bytes().iter().enumerate() {
        res[i] = *byte as c_char;
    }
    Ok(res)
}

/// Parses a raw nanosecond-precision UNIX timestamp into a datetime. Returns
/// `None` if `ts` contains the sentinel for a null timestamp.
pub fn ts_to_dt(ts: u64) -> Option<time::OffsetDateTime> {
    if ts == crate::UNDEF_TIMESTAMP {
        None
    } else {
        // u64::MAX is within the maximum allowable range
        Some(time::OffsetDateTime::from_unix_timestamp_nanos(ts as i128).unwrap())
    }
}

/// Converts a fixed-precision price to a floating point. [`crate::UNDEF_PRICE`]
/// is converted to NaN.
pub(crate) fn px_to_f64(px: i64) -> f64 {
    if px == crate::UNDEF_PRICE {
        f64::NAN
    } else {
        px as f64 / 1e9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_chars_round_trip() {
        let chars = str_to_c_chars::<22>("ALL_SYMBOLS").unwrap();
        assert_eq!(c_chars_to_str(&chars).unwrap(), "ALL_SYMBOLS");
    }

    #[test]
    fn test_str_to_c_chars_too_long() {
        assert!(str_to_c_chars::<4>("TOO LONG").is_err());
    }

    #[test]
    fn test_px_to_f64_undef() {
        assert!(px_to_f64(crate::UNDEF_PRICE).is_nan());
        assert_eq!(px_to_f64(1_500_000_000), 1.5);
    }
}
