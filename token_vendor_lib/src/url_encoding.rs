use percent_encoding::{percent_encode, NON_ALPHANUMERIC, AsciiSet}; 
pub use percent_encoding::percent_decode; 

/// Custom encode set for application/x-www-form-urlencoded allowing unreserved characters including hyphens
const FORM_URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes a string for URL safety and returns an owned `String`
/// 
/// # Example
/// ```
/// use token_vendor_lib::url_encoding::encode_url_owned; 
/// let encoded = encode_url_owned("Hello World!");
/// assert_eq!(encoded, "Hello%20World%21");
/// ```
pub fn encode_url_owned(input: &str) -> String {
    percent_encode(input.as_bytes(), FORM_URLENCODE_SET).to_string()
}

/// Decodes a URL-encoded string and returns an owned `String`.
///
/// A `+` is read as a space, as form bodies and query strings produced by
/// most servers encode spaces that way.
///
/// # Example
/// ```
/// use token_vendor_lib::url_encoding::decode_url_owned; 
/// assert_eq!(decode_url_owned("a+b%2Fc"), "a b/c");
/// ```
pub fn decode_url_owned(input: &str) -> String {
    let spaced = input.replace('+', " "); 
    percent_decode(spaced.as_bytes())
        .decode_utf8_lossy()
        .into_owned() 
}

/// Joins key/value pairs into an `application/x-www-form-urlencoded` string.
///
/// Pair order is preserved. The same encoding is used for query strings.
///
/// # Example
/// ```
/// use token_vendor_lib::url_encoding::encode_form; 
/// let body = encode_form(&[("grant_type", "authorization_code"), ("code", "a b")]);
/// assert_eq!(body, "grant_type=authorization_code&code=a%20b");
/// ```
pub fn encode_form<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_url_owned(k.as_ref()), encode_url_owned(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
} 

/// Splits an `application/x-www-form-urlencoded` string (or a query string,
/// with or without its leading `?`) into decoded key/value pairs.
///
/// Empty segments are skipped; a segment without `=` yields an empty value.
pub fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .strip_prefix('?')
        .unwrap_or(input)
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (decode_url_owned(k), decode_url_owned(v)),
            None => (decode_url_owned(segment), String::new()),
        })
        .collect()
} 
