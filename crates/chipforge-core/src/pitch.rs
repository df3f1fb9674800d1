/// Semitone offset of a note name from C within one octave. Unknown names resolve to C.
#[must_use]
pub fn note_semitone(name: &str) -> i32 {
    match name.trim() {
        "C" | "B#" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" | "Fb" => 4,
        "F" | "E#" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" | "Cb" => 11,
        _ => 0,
    }
}

/// MIDI note number for a name and octave, where C4 is 60. Saturates for extreme octaves.
#[must_use]
pub fn note_to_midi(name: &str, octave: i32) -> i32 {
    octave
        .saturating_add(1)
        .saturating_mul(12)
        .saturating_add(note_semitone(name))
}

/// Equal-tempered frequency with A4 (MIDI 69) at 440 Hz.
#[must_use]
pub fn midi_to_frequency(note: f64) -> f64 {
    440.0 * 2_f64.powf((note - 69.0) / 12.0)
}

#[must_use]
pub fn note_frequency(name: &str, octave: i32) -> f64 {
    midi_to_frequency(f64::from(note_to_midi(name, octave)))
}

/// Frequency ratio of `semitones` (fractional allowed).
#[must_use]
pub fn semitone_ratio(semitones: f64) -> f64 {
    2_f64.powf(semitones / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_concert_pitch() {
        assert!((midi_to_frequency(69.0) - 440.0).abs() < 0.01);
        assert!((note_frequency("A", 4) - 440.0).abs() < 0.01);
    }

    #[test]
    fn middle_c_is_midi_sixty() {
        assert_eq!(note_to_midi("C", 4), 60);
        assert!((midi_to_frequency(60.0) - 261.63).abs() < 0.1);
    }

    #[test]
    fn enharmonic_names_share_a_semitone() {
        assert_eq!(note_semitone("C#"), note_semitone("Db"));
        assert_eq!(note_semitone("A#"), note_semitone("Bb"));
    }

    #[test]
    fn unknown_names_fall_back_to_c() {
        assert_eq!(note_semitone("H"), 0);
        assert_eq!(note_to_midi("X", 4), 60);
    }

    #[test]
    fn extreme_octaves_saturate() {
        assert_eq!(note_to_midi("B", i32::MAX), i32::MAX);
        assert_eq!(note_to_midi("C", i32::MIN), i32::MIN);
    }

    #[test]
    fn octave_doubles_frequency() {
        assert!((semitone_ratio(12.0) - 2.0).abs() < 1e-12);
        let ratio = note_frequency("E", 5) / note_frequency("E", 4);
        assert!((ratio - 2.0).abs() < 1e-9);
    }
}
