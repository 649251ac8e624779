//! The terminal payload layer: whatever bytes remain, undecoded.

use crate::error::LayerError;
use crate::layer::LayerFields;
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    ctx.push_terminal(LayerFields::Payload);
    Ok(NextLayer::Done)
}
