//! Local audio: microphone capture, push-to-talk, level meter, playback and
//! the session that ties them to a turn

mod capture;
mod controller;
mod gesture;
mod level;
mod playback;
mod session;

pub use capture::{AudioInput, MicInput, SAMPLE_RATE, SampleTap, samples_to_wav};
pub use controller::{CaptureController, ClipHints};
pub use gesture::{PushToTalk, ReleaseOutcome};
pub use level::{LEVEL_WINDOW, LevelSampler, normalized_level};
pub use playback::{AudioPlayback, DecodedAudio, Player, decode_mp3};
pub use session::{Release, TalkSession};
