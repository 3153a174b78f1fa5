#[cfg(feature = "url_encoding")]
pub mod url_encoding; 

#[cfg(feature = "url_encoding")]
pub use url_encoding::{decode_url_owned, encode_form, encode_url_owned, parse_form}; 
