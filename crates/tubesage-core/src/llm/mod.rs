//! Provider abstraction and the multi-provider fallback chain.

pub mod box_provider;
pub mod fallback;
pub mod provider;

pub use box_provider::BoxChatProvider;
pub use fallback::FallbackChain;
pub use provider::ChatProvider;
