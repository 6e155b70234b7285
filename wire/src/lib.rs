//! Wire codec for figsync values.
//!
//! This crate converts figure values to and from what the transport can
//! carry. It knows about numeric buffers and absence, not about commands or
//! figures.
//!
//! # Wire format
//!
//! - Bulk numeric arrays: `{dtype, shape: [len], value: bytes}` with
//!   little-endian elements. Decoding also accepts the legacy `buffer` key.
//! - Absent values: the string [`UNDEFINED_SENTINEL`].
//! - Everything else maps one-to-one onto [`WireValue`].
//!
//! # Design Principles
//!
//! - **Isolated failures** - A bad buffer fails only itself and stays opaque.
//! - **Bounded decoding** - Depth and buffer sizes are checked against limits.

mod codec;
mod error;
mod limits;
mod value;

pub use codec::{decode, decode_buffer, encode, encode_buffer, is_buffer_object, UNDEFINED_SENTINEL};
pub use error::{LimitKind, WireError, WireResult};
pub use limits::Limits;
pub use value::WireValue;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        // Verify all expected items are exported
        let _ = UNDEFINED_SENTINEL;
        let _ = Limits::default();
        let _ = WireValue::Null;
        let _ = LimitKind::Depth;

        // Error types
        let _: WireResult<()> = Ok(());
    }

    #[test]
    fn limits_default_is_reasonable() {
        let limits = Limits::default();
        assert!(limits.max_depth >= 16, "should allow realistic nesting");
        assert!(
            limits.max_buffer_bytes >= 1024 * 1024,
            "should allow megabyte buffers"
        );
    }
}
