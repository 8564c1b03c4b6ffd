use std::sync::Arc;

use gridbeat_shared::{AccentInterval, ChannelId, Markers, Pattern};

use crate::sample::SampleInfo;

/// Control-path messages drained by the audio callback between buffers.
/// Anything that changes what a tick would play triggers a dispatcher
/// rebuild on the audio side.
pub enum EngineCommand {
    Play,
    Stop,
    SetBpm(f32),
    SetSwing(f32),
    SetAccent(AccentInterval),
    /// Replace the pattern snapshot.
    SetPattern(Arc<Pattern>),
    /// Replace the marker snapshot.
    SetMarkers(Arc<Markers>),
    /// A sample finished loading and is ready to slice.
    SampleReady(Arc<SampleInfo>),
    /// The sample slot was invalidated (file changed or cleared).
    SampleCleared,
    SetChannelLevel { channel: ChannelId, db: f32 },
}
