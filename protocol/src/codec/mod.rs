mod client_codec;
mod line_codec;
mod server_codec;

pub use client_codec::ClientCodec;
pub use line_codec::{Line, LineCodec, TOO_LONG_EXCERPT};
pub use server_codec::ServerCodec;
