use base64::{
    alphabet::{STANDARD as STANDARD_ALPHABET, URL_SAFE as URL_SAFE_ALPHABET},
    engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig},
    engine::DecodePaddingMode,
    Engine as _,
};

const NO_PAD: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_NO_PAD: GeneralPurpose = GeneralPurpose::new(&STANDARD_ALPHABET, NO_PAD);
const URL_SAFE_NO_PAD: GeneralPurpose = GeneralPurpose::new(&URL_SAFE_ALPHABET, NO_PAD);

/// Encodes a string to Base64 format. Auto detect if the input is URL-safe.
///
/// # Arguments
/// * `input` - The string to encode.
///
/// # Returns
/// The Base64 encoded string.
pub fn base64_encode(input: &str) -> String {
    let accept_urlsafe = input.contains("+") || input.contains("/") || input.contains("=");

    let encoded = match accept_urlsafe {
        true => URL_SAFE_NO_PAD.encode(input),
        false => STANDARD_NO_PAD.encode(input),
    };
    encoded
}

/// Decodes a Base64 string to its original form.
///
/// # Arguments
/// * `input` - The Base64 encoded string.
/// * `accept_urlsafe` - A boolean indicating whether to accept URL-safe Base64 encoding.
///
/// # Returns
/// The decoded string, or an empty string if the input is invalid.
pub fn base64_decode(input: &str, accept_urlsafe: bool) -> String {
    let decoded = match accept_urlsafe {
        true => URL_SAFE_NO_PAD.decode(input).unwrap_or_default(),
        false => STANDARD_NO_PAD.decode(input).unwrap_or_default(),
    };
    String::from_utf8_lossy(&decoded).to_string()
}

/// Decodes a URL-safe Base64 string to its original form.
pub fn url_safe_base64_decode(input: &str) -> String {
    base64_decode(input, true)
}

/// Encodes a string to URL-safe Base64 format.
pub fn url_safe_base64_encode(input: &str) -> String {
    base64_encode(input)
}
