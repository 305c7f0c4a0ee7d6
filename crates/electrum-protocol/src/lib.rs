pub mod codec;
pub mod frame;

pub use codec::LineCodec;
pub use frame::Frame;
