//! Transport collaborator: moves request bytes to the bank and returns the response.

use crate::error::EbicsResult;

/// Blocking request/response exchange with the bank server.
///
/// Implementations surface connection failures as `EbicsError::Transport`.
/// Timeouts and retries belong to the implementation, not to this core.
pub trait Transport {
    fn send(&self, request: &[u8]) -> EbicsResult<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &[u8]) -> EbicsResult<Vec<u8>> {
        (**self).send(request)
    }
}
