use tracing::{debug, instrument};

use crate::{
    mastering::{RenderOutput, master},
    model::SfxDef,
    oscillator::NoiseSource,
    time::seconds_to_samples,
    voice::{Voice, render_voice},
};

/// Renders every voice over the effect's duration, sums them, applies the master volume
/// and runs the safety chain. A definition without voices yields a silent buffer.
#[instrument(skip(definition, noise), fields(duration = definition.duration, voices = definition.voices.len()))]
pub fn render_sfx(definition: &SfxDef, sample_rate: u32, noise: &mut NoiseSource) -> RenderOutput {
    let mut mix = vec![0.0; seconds_to_samples(definition.duration, sample_rate)];

    for voice_def in &definition.voices {
        let mut voice = Voice::from_sfx_voice(voice_def, sample_rate);
        let rendered = render_voice(&mut voice, definition.duration, sample_rate, noise);
        for (slot, sample) in mix.iter_mut().zip(rendered) {
            *slot += sample;
        }
    }

    let volume = definition.effective_volume();
    for sample in &mut mix {
        *sample *= volume;
    }

    let output = master(mix, sample_rate);
    debug!(
        samples = output.samples.len(),
        warnings = output.warnings.len(),
        "sfx render completed"
    );
    output
}
