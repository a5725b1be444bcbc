use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::protocol::canonical::ResponsePart;

/// Destination for decoded parts.
///
/// A failing sink never aborts the stream: the decoder logs the error,
/// counts it, and keeps going with the next part.
pub trait PartSink {
    fn emit(&mut self, part: ResponsePart) -> Result<(), SinkError>;
}

impl PartSink for Vec<ResponsePart> {
    fn emit(&mut self, part: ResponsePart) -> Result<(), SinkError> {
        self.push(part);
        Ok(())
    }
}

impl PartSink for mpsc::UnboundedSender<ResponsePart> {
    fn emit(&mut self, part: ResponsePart) -> Result<(), SinkError> {
        self.send(part).map_err(|_| SinkError::Closed)
    }
}

impl<S: PartSink + ?Sized> PartSink for &mut S {
    fn emit(&mut self, part: ResponsePart) -> Result<(), SinkError> {
        (**self).emit(part)
    }
}

impl<S: PartSink + ?Sized> PartSink for Box<S> {
    fn emit(&mut self, part: ResponsePart) -> Result<(), SinkError> {
        (**self).emit(part)
    }
}

/// Adapts a closure into a [`PartSink`].
pub struct FnSink<F>(pub F);

impl<F> PartSink for FnSink<F>
where
    F: FnMut(ResponsePart) -> Result<(), SinkError>,
{
    fn emit(&mut self, part: ResponsePart) -> Result<(), SinkError> {
        (self.0)(part)
    }
}
