//! Composition rendering: instruments, synthesis, placement and mixdown

pub mod composition;
pub mod instrument;
pub mod mix;
pub mod source;
pub mod synth;

pub use composition::{Composition, RenderInstruction};
pub use instrument::{note_to_frequency, Instrument};
pub use mix::{mix, pan_gains, Placement};
pub use source::CompositionSource;
pub use synth::{InstrumentRenderer, RenderRequest, SynthRenderer};
