//! HTML image reference rewriting.
//!
//! Uses lol_html, which tokenizes like a browser and recovers from broken
//! markup, so only a byte stream that is not valid UTF-8 fails to parse.
//! Everything except the rewritten attribute values passes through unchanged.
//!
//! lol_html hands out attribute values as written in the source, so character
//! references are decoded before the value is used as an object key.

use html_escape::decode_html_entities;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use tracing::{debug, warn};

use crate::error::{PageError, PageResult};
use crate::signer::UrlSigner;

/// Image attributes that hold object keys, in the order they are processed.
pub const IMAGE_ATTRIBUTES: [&str; 2] = ["data-src", "src"];

/// Counters describing one rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// `img` elements seen.
    pub images: usize,
    /// Attribute values replaced by a signed URL.
    pub signed: usize,
    /// Attribute values left as-is because signing failed.
    pub unsigned: usize,
}

/// A rewritten document.
#[derive(Debug, Clone)]
pub struct Rewritten {
    /// The serialized HTML.
    pub html: String,
    /// What happened to the image references.
    pub stats: RewriteStats,
}

/// Replace every `img` `data-src`/`src` value in `html` with a signed URL.
///
/// Both attributes are handled independently on the same element. A signing
/// failure leaves that one value untouched and is logged; it never fails the
/// document.
///
/// # Errors
///
/// Returns [`PageError::ParseFailed`] if `html` is not valid UTF-8 or the
/// rewriter itself gives up.
pub fn rewrite(html: &[u8], signer: &dyn UrlSigner) -> PageResult<Rewritten> {
    let html = std::str::from_utf8(html).map_err(|e| PageError::ParseFailed {
        reason: e.to_string(),
    })?;

    let mut stats = RewriteStats::default();

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                stats.images += 1;
                for attr in IMAGE_ATTRIBUTES {
                    let Some(raw) = el.get_attribute(attr) else {
                        continue;
                    };
                    let object_key = decode_html_entities(&raw);
                    match signer.sign(&object_key) {
                        Ok(url) => {
                            el.set_attribute(attr, &url)?;
                            stats.signed += 1;
                        }
                        Err(err) => {
                            warn!(
                                attribute = attr,
                                object_key = %object_key,
                                error = %err,
                                "failed to sign image reference, leaving it unchanged"
                            );
                            stats.unsigned += 1;
                        }
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| PageError::ParseFailed {
        reason: e.to_string(),
    })?;

    debug!(
        images = stats.images,
        signed = stats.signed,
        unsigned = stats.unsigned,
        "rewrote image references"
    );

    Ok(Rewritten {
        html: output,
        stats,
    })
}
