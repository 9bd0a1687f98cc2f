use std::path::Path;

use ndarray::ArrayView2;
use tracing::instrument;

use crate::{orientation::argmax, OcrError, TextLine};

/// Class index the recognizer uses for "no character".
pub const BLANK_INDEX: usize = 0;

/// Recognizer character set. Class `i` (for `i >= 1`) maps to entry `i - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterVocabulary {
    entries: Vec<String>,
}

impl CharacterVocabulary {
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads a PaddleOCR style dictionary, one entry per line. With `use_space_char` a
    /// trailing `" "` entry is appended, as space-aware models expect.
    pub fn load(path: impl AsRef<Path>, use_space_char: bool) -> Result<Self, OcrError> {
        let path = path.as_ref();
        let keys = std::fs::read_to_string(path).map_err(|source| OcrError::Vocabulary {
            path: path.to_path_buf(),
            source,
        })?;
        let mut vocabulary = Self::new(keys.lines());
        if use_space_char {
            vocabulary.entries.push(" ".to_string());
        }
        log::debug!(
            "Loaded {} vocabulary entries from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a recognizer class index, `None` for blank or out of range classes.
    pub fn get(&self, class: usize) -> Option<&str> {
        class
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }
}

/// Greedy CTC decoding of a `[timesteps, classes]` score matrix.
///
/// Per timestep the best class wins (lowest index on ties). Blanks and immediate repeats
/// emit nothing; a blank between two equal classes lets the second one through. The
/// confidence is the mean winning score of the emitted characters, or 0 when none were.
/// Classes beyond the vocabulary are skipped.
#[instrument(level = "trace", skip(scores, vocabulary), fields(shape = ?scores.dim()))]
pub fn decode(scores: ArrayView2<f32>, vocabulary: &CharacterVocabulary) -> TextLine {
    if scores.is_empty() || vocabulary.is_empty() {
        return TextLine::default();
    }

    let mut text = String::new();
    let mut character_scores = Vec::new();
    let mut last_index = None;

    for timestep in scores.outer_iter() {
        let Some((index, score)) = argmax(timestep.iter().copied()) else {
            continue;
        };

        if index != BLANK_INDEX && last_index != Some(index) {
            if let Some(character) = vocabulary.get(index) {
                text.push_str(character);
                character_scores.push(score);
            }
        }
        last_index = Some(index);
    }

    let confidence = if character_scores.is_empty() {
        0.0
    } else {
        character_scores.iter().sum::<f32>() / character_scores.len() as f32
    };

    TextLine {
        text,
        confidence,
        character_scores,
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    /// One-hot-ish score rows where `winners[t]` scores `score` and everything else 0.01.
    fn scores_for(winners: &[usize], classes: usize, score: f32) -> Array2<f32> {
        let mut scores = Array2::from_elem((winners.len(), classes), 0.01);
        for (t, &w) in winners.iter().enumerate() {
            scores[[t, w]] = score;
        }
        scores
    }

    fn ab() -> CharacterVocabulary {
        CharacterVocabulary::new(["A", "B"])
    }

    #[test]
    fn blank_separates_and_repeats_collapse() {
        let line = decode(scores_for(&[1, 1, 0, 2], 3, 0.9).view(), &ab());
        assert_eq!(line.text, "AB");
        assert_eq!(line.character_scores.len(), 2);
        assert!((line.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn blank_allows_repeated_character() {
        let line = decode(scores_for(&[1, 0, 1], 3, 0.8).view(), &ab());
        assert_eq!(line.text, "AA");
    }

    #[test]
    fn long_run_emits_once() {
        let line = decode(scores_for(&[2, 2, 2, 2, 2], 3, 0.7).view(), &ab());
        assert_eq!(line.text, "B");
        assert!((line.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn confidence_is_mean_of_emitted_scores() {
        let mut scores = scores_for(&[1, 0, 2], 3, 0.9);
        scores[[2, 2]] = 0.5;
        let line = decode(scores.view(), &ab());
        assert_eq!(line.text, "AB");
        assert!((line.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn ties_go_to_lowest_class() {
        let scores = Array2::from_shape_vec((1, 3), vec![0.1, 0.6, 0.6]).unwrap();
        assert_eq!(decode(scores.view(), &ab()).text, "A");
    }

    #[test]
    fn all_blank_has_zero_confidence() {
        let line = decode(scores_for(&[0, 0, 0], 3, 0.99).view(), &ab());
        assert_eq!(line.text, "");
        assert_eq!(line.confidence, 0.0);
    }

    #[test]
    fn empty_inputs_decode_to_nothing() {
        let empty = Array2::<f32>::zeros((0, 3));
        assert_eq!(decode(empty.view(), &ab()), TextLine::default());

        let scores = scores_for(&[1, 2], 3, 0.9);
        assert_eq!(
            decode(scores.view(), &CharacterVocabulary::default()),
            TextLine::default()
        );
    }

    #[test]
    fn nan_scores_never_win() {
        let scores = Array2::from_shape_vec(
            (3, 3),
            vec![0.1, 0.9, f32::NAN, f32::NAN, 0.2, 0.7, 0.9, 0.02, 0.01],
        )
        .unwrap();
        let line = decode(scores.view(), &ab());
        assert_eq!(line.text, "AB");
        assert!((line.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn all_nan_rows_emit_nothing() {
        let scores = Array2::from_elem((2, 3), f32::NAN);
        let line = decode(scores.view(), &ab());
        assert_eq!(line.text, "");
        assert_eq!(line.confidence, 0.0);
    }

    #[test]
    fn out_of_vocabulary_classes_are_skipped() {
        let line = decode(scores_for(&[1, 3, 2], 4, 0.9).view(), &ab());
        assert_eq!(line.text, "AB");
        assert_eq!(line.character_scores.len(), 2);
    }

    #[test]
    fn transposed_views_decode_the_same() {
        let column_major = scores_for(&[1, 0, 2], 3, 0.9).reversed_axes();
        let line = decode(column_major.t(), &ab());
        assert_eq!(line.text, "AB");
    }

    #[test]
    fn vocabulary_lookup_is_shifted() {
        let vocabulary = ab();
        assert_eq!(vocabulary.get(0), None);
        assert_eq!(vocabulary.get(1), Some("A"));
        assert_eq!(vocabulary.get(2), Some("B"));
        assert_eq!(vocabulary.get(3), None);
    }

    #[test]
    fn loads_keys_file() {
        let path = std::env::temp_dir().join(format!("textspot-keys-{}.txt", std::process::id()));
        std::fs::write(&path, "a\nb\n \nc\n").unwrap();

        let plain = CharacterVocabulary::load(&path, false).unwrap();
        let spaced = CharacterVocabulary::load(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(plain.len(), 4);
        assert_eq!(plain.get(3), Some(" "));
        assert_eq!(plain.get(4), Some("c"));
        assert_eq!(spaced.len(), 5);
        assert_eq!(spaced.get(5), Some(" "));
    }

    #[test]
    fn missing_keys_file_names_the_path() {
        let err = CharacterVocabulary::load("does/not/exist.txt", false).unwrap_err();
        assert!(matches!(err, OcrError::Vocabulary { .. }));
        assert!(err.to_string().contains("does/not/exist.txt"));
    }
}
