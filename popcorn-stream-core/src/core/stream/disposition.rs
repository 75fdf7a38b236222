use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// The characters which are left unescaped within an RFC 5987 `ext-value`.
const RFC5987_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'|')
    .remove(b'`')
    .remove(b'^');

/// Encode the given value as an RFC 5987 `value-chars` string.
pub fn encode_rfc5987(value: &str) -> String {
    utf8_percent_encode(value, RFC5987_ENCODE_SET).to_string()
}

/// Returns the inline `Content-Disposition` header value for the given filename.
///
/// ```rust
/// use popcorn_stream_core::core::stream::content_disposition;
///
/// assert_eq!(
///     "inline; filename*=UTF-8''My%20Movie.mp4",
///     content_disposition("My Movie.mp4")
/// );
/// ```
pub fn content_disposition(filename: &str) -> String {
    format!("inline; filename*=UTF-8''{}", encode_rfc5987(filename))
}
