//! SOAP 1.2 envelopes with WS-Security UsernameToken authentication.

use crate::error::AuthError;
use crate::types::Credentials;
use crate::xml::Element;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::escape;
use rand::Rng;
use sha1::{Digest, Sha1};

pub const DEVICE_NS: &str = "http://www.onvif.org/ver10/device/wsdl";
pub const MEDIA_NS: &str = "http://www.onvif.org/ver10/media/wsdl";
pub const PTZ_NS: &str = "http://www.onvif.org/ver20/ptz/wsdl";
pub const SCHEMA_NS: &str = "http://www.onvif.org/ver10/schema";

const ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const PASSWORD_DIGEST: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const BASE64_BINARY: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// `Base64(SHA1(nonce + created + password))`.
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// `wsse:Security` header with a fresh nonce and the current time.
pub fn security_header(credentials: &Credentials) -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    security_header_with(credentials, &nonce, &created)
}

fn security_header_with(credentials: &Credentials, nonce: &[u8], created: &str) -> String {
    format!(
        concat!(
            r#"<wsse:Security xmlns:wsse="{wsse}" xmlns:wsu="{wsu}">"#,
            "<wsse:UsernameToken>",
            "<wsse:Username>{username}</wsse:Username>",
            r#"<wsse:Password Type="{digest_type}">{digest}</wsse:Password>"#,
            r#"<wsse:Nonce EncodingType="{nonce_type}">{nonce}</wsse:Nonce>"#,
            "<wsu:Created>{created}</wsu:Created>",
            "</wsse:UsernameToken>",
            "</wsse:Security>",
        ),
        wsse = WSSE_NS,
        wsu = WSU_NS,
        username = escape(credentials.username.as_str()),
        digest_type = PASSWORD_DIGEST,
        digest = password_digest(nonce, created, &credentials.password),
        nonce_type = BASE64_BINARY,
        nonce = STANDARD.encode(nonce),
        created = created,
    )
}

/// Wrap a body in an envelope carrying `header`.
pub fn envelope(header: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><s:Envelope xmlns:s="{ns}"><s:Header>{header}</s:Header><s:Body>{body}</s:Body></s:Envelope>"#,
        ns = ENVELOPE_NS,
    )
}

/// The error carried by a SOAP `Fault`, if the document holds one.
///
/// `NotAuthorized` subcodes map to a rejection; everything else is a
/// protocol error.
pub fn fault(doc: &Element) -> Option<AuthError> {
    let fault = doc.find("Fault")?;

    let codes: Vec<&str> = fault.find_all("Value").map(Element::text).collect();
    let reason = fault
        .find_text("Text")
        .or_else(|| codes.last().map(|c| c.to_string()))
        .unwrap_or_else(|| "SOAP fault".to_string());

    if codes.iter().any(|c| c.contains("NotAuthorized")) || reason.contains("NotAuthorized") {
        Some(AuthError::Rejected(reason))
    } else {
        Some(AuthError::Protocol(reason))
    }
}

/// Body text with XML special characters escaped.
pub fn text(value: &str) -> std::borrow::Cow<'_, str> {
    escape(value)
}
