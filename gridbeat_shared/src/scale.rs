use serde::{Deserialize, Serialize};

use crate::ROLL_NOTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    Major,
    Minor,
    Pentatonic,
    Blues,
}

impl Default for ScaleType {
    fn default() -> Self {
        Self::Major
    }
}

impl ScaleType {
    const ALL: [ScaleType; 4] = [
        ScaleType::Major,
        ScaleType::Minor,
        ScaleType::Pentatonic,
        ScaleType::Blues,
    ];

    /// Lookup by index, wrapping out-of-range values into the valid set.
    pub fn from_index(idx: usize) -> ScaleType {
        Self::ALL[idx % Self::ALL.len()]
    }

    /// Semitone offsets from the root.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
            ScaleType::Pentatonic => "Pentatonic",
            ScaleType::Blues => "Blues",
        }
    }

    pub fn iter() -> impl Iterator<Item = ScaleType> {
        Self::ALL.into_iter()
    }
}

/// Indices into `ROLL_NOTES` whose pitch class lies in the scale transposed
/// to `root` (a pitch class, 0-11). Order follows the roll: top row first.
pub fn allowed_rows(root: u8, scale: ScaleType) -> Vec<usize> {
    let root = root % 12;
    let intervals = scale.intervals();
    ROLL_NOTES
        .iter()
        .enumerate()
        .filter(|(_, &note)| {
            let rel = (note % 12 + 12 - root) % 12;
            intervals.contains(&rel)
        })
        .map(|(i, _)| i)
        .collect()
}

/// True if `row` holds the root's pitch class.
pub fn row_is_root(row: usize, root: u8) -> bool {
    ROLL_NOTES
        .get(row)
        .map(|&note| note % 12 == root % 12)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_rows_c_major() {
        // ROLL_NOTES descends B4..C4; C major keeps B A G F E D C
        let rows = allowed_rows(0, ScaleType::Major);
        let notes: Vec<u8> = rows.iter().map(|&r| ROLL_NOTES[r]).collect();
        assert_eq!(notes, vec![71, 69, 67, 65, 64, 62, 60]);
    }

    #[test]
    fn test_allowed_rows_transposed() {
        // Every scale keeps its root's pitch class
        for root in 0..12u8 {
            for scale in ScaleType::iter() {
                let rows = allowed_rows(root, scale);
                assert!(!rows.is_empty());
                assert!(rows.iter().any(|&r| row_is_root(r, root)));
                assert_eq!(rows.len(), scale.intervals().len());
            }
        }
    }

    #[test]
    fn test_from_index_wraps() {
        assert_eq!(ScaleType::from_index(0), ScaleType::Major);
        assert_eq!(ScaleType::from_index(3), ScaleType::Blues);
        assert_eq!(ScaleType::from_index(4), ScaleType::Major);
        assert_eq!(ScaleType::from_index(7), ScaleType::Blues);
    }
}
