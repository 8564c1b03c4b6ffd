use gridbeat_shared::scale::{self, ScaleType};
use gridbeat_shared::STEPS;

use crate::rhythm::StepMask;

/// Chance that the second of two identical adjacent notes gets nudged to a
/// neighboring scale row.
pub const DEREPEAT_PROB: f32 = 0.55;
/// Chance that a note in the final two steps snaps to the root.
pub const CADENCE_PROB: f32 = 0.45;
/// Chance that the final step is cleared to a rest.
pub const REST_PROB: f32 = 0.15;
/// Chance that a motif repetition mutates one of its rows.
const MOTIF_MUTATE_PROB: f32 = 0.3;

pub type NoteRoll = [Option<u8>; STEPS];

#[derive(Debug, Clone, Copy)]
pub struct MelodyParams {
    /// Root pitch class, 0-11.
    pub root: u8,
    pub scale: ScaleType,
    /// 0..1 chance of leaping instead of stepping.
    pub jump_prob: f32,
}

/// Placement engines. All share the allowed-rows/mask inputs and the same
/// post-processing pass; they only differ in how rows land on active steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MelodyEngine {
    Walk,
    ArpUp,
    ArpDown,
    ArpBounce,
    Motif,
    Bass,
}

impl MelodyEngine {
    const ALL: [MelodyEngine; 6] = [
        MelodyEngine::Walk,
        MelodyEngine::ArpUp,
        MelodyEngine::ArpDown,
        MelodyEngine::ArpBounce,
        MelodyEngine::Motif,
        MelodyEngine::Bass,
    ];

    /// Lookup by index, wrapping out-of-range values into the valid set.
    pub fn from_index(idx: usize) -> MelodyEngine {
        Self::ALL[idx % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MelodyEngine::Walk => "Walk",
            MelodyEngine::ArpUp => "Arp Up",
            MelodyEngine::ArpDown => "Arp Down",
            MelodyEngine::ArpBounce => "Arp Bounce",
            MelodyEngine::Motif => "Motif",
            MelodyEngine::Bass => "Bass",
        }
    }
}

/// Produce a full note-roll replacement: rows for every masked step, `None`
/// everywhere else. A degenerate scale/root combination (no allowed rows)
/// yields an all-rest roll.
pub fn generate(
    params: MelodyParams,
    mask: &StepMask,
    engine: MelodyEngine,
    rng: &mut fastrand::Rng,
) -> NoteRoll {
    let allowed = scale::allowed_rows(params.root, params.scale);
    let mut roll = [None; STEPS];
    if allowed.is_empty() {
        return roll;
    }
    let active: Vec<usize> = (0..STEPS).filter(|&i| mask[i]).collect();
    if active.is_empty() {
        return roll;
    }

    // Positions into `allowed`, one per active step
    let picks = match engine {
        MelodyEngine::Walk => walk(allowed.len(), active.len(), params.jump_prob, mid_center(allowed.len()), rng),
        MelodyEngine::ArpUp | MelodyEngine::ArpDown | MelodyEngine::ArpBounce => {
            arp(allowed.len(), active.len(), engine, rng)
        }
        MelodyEngine::Motif => motif(allowed.len(), &active, params.jump_prob, rng),
        MelodyEngine::Bass => bass(allowed.len(), active.len(), rng),
    };

    for (k, &step) in active.iter().enumerate() {
        roll[step] = Some(allowed[picks[k]] as u8);
    }
    post_process(&mut roll, &allowed, params.root, rng);
    roll
}

fn mid_center(len: usize) -> f32 {
    (len - 1) as f32 / 2.0
}

/// Bell-shaped draw over positions, weighted exp(-0.5 d^2) around `center`.
fn bell_pick(len: usize, center: f32, rng: &mut fastrand::Rng) -> usize {
    let weights: Vec<f32> = (0..len)
        .map(|k| (-0.5 * (k as f32 - center).powi(2)).exp())
        .collect();
    weighted_choice(&weights, rng)
}

fn weighted_choice(weights: &[f32], rng: &mut fastrand::Rng) -> usize {
    let total: f32 = weights.iter().sum();
    let mut target = rng.f32() * total;
    for (k, &w) in weights.iter().enumerate() {
        if target < w {
            return k;
        }
        target -= w;
    }
    weights.len() - 1
}

fn clamp_pos(pos: isize, len: usize) -> usize {
    pos.clamp(0, len as isize - 1) as usize
}

/// The default walk: bell-weighted start, then small steps with occasional
/// 3-5 position leaps.
fn walk(len: usize, count: usize, jump_prob: f32, center: f32, rng: &mut fastrand::Rng) -> Vec<usize> {
    let mut pos = bell_pick(len, center, rng);
    let mut out = Vec::with_capacity(count);
    out.push(pos);
    for _ in 1..count {
        pos = if rng.f32() < jump_prob {
            leap(pos, len, rng)
        } else {
            step_nearby(pos, len, rng)
        };
        out.push(pos);
    }
    out
}

fn leap(pos: usize, len: usize, rng: &mut fastrand::Rng) -> usize {
    let offset = rng.usize(3..=5) as isize;
    let target = if rng.bool() {
        pos as isize + offset
    } else {
        pos as isize - offset
    };
    clamp_pos(target, len)
}

/// Uniform draw among the rows within two positions of `pos` (the row
/// itself excluded); stays put when nothing is in range.
fn step_nearby(pos: usize, len: usize, rng: &mut fastrand::Rng) -> usize {
    let candidates: Vec<usize> = [-2isize, -1, 1, 2]
        .iter()
        .map(|d| pos as isize + d)
        .filter(|&t| t >= 0 && t < len as isize)
        .map(|t| t as usize)
        .collect();
    if candidates.is_empty() {
        pos
    } else {
        candidates[rng.usize(0..candidates.len())]
    }
}

/// Cycle a 3-5 row chord subset (every other allowed row) across the active
/// steps, rising, falling or ping-ponging.
fn arp(len: usize, count: usize, engine: MelodyEngine, rng: &mut fastrand::Rng) -> Vec<usize> {
    let span = rng.usize(3..=5).min(len);
    let stride = if (span - 1) * 2 < len { 2 } else { 1 };
    let reach = (span - 1) * stride;
    let base = rng.usize(0..len - reach);
    let chord: Vec<usize> = (0..span).map(|k| base + k * stride).collect();

    (0..count)
        .map(|k| {
            let idx = match engine {
                // Positions ascend as pitch falls, so "up" runs the chord backwards
                MelodyEngine::ArpUp => span - 1 - (k % span),
                MelodyEngine::ArpDown => k % span,
                _ => {
                    let period = (2 * span).saturating_sub(2).max(1);
                    let p = k % period;
                    if p < span { p } else { period - p }
                }
            };
            chord[idx]
        })
        .collect()
}

/// A four-step motif repeated across the pattern, each repetition mutating
/// at most one of its rows by a single position.
fn motif(len: usize, active: &[usize], jump_prob: f32, rng: &mut fastrand::Rng) -> Vec<usize> {
    let seed = walk(len, 4, jump_prob, mid_center(len), rng);
    let mut reps: Vec<Vec<usize>> = Vec::with_capacity(STEPS / 4);
    reps.push(seed);
    for r in 1..STEPS / 4 {
        let mut next = reps[r - 1].clone();
        if rng.f32() < MOTIF_MUTATE_PROB {
            let slot = rng.usize(0..next.len());
            next[slot] = nudge(next[slot], len, rng);
        }
        reps.push(next);
    }
    active.iter().map(|&step| reps[step / 4][step % 4]).collect()
}

/// Low-register walk favouring stepwise motion with rare leaps.
fn bass(len: usize, count: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    // Bottom rows sit at the high positions of the (descending) roll
    let center = (len - 1) as f32 * 0.75;
    let mut pos = bell_pick(len, center, rng);
    let mut out = Vec::with_capacity(count);
    out.push(pos);
    for _ in 1..count {
        let roll = rng.f32();
        let magnitude: isize = if roll < 0.7 {
            1
        } else if roll < 0.9 {
            2
        } else {
            rng.usize(3..=5) as isize
        };
        let target = if rng.bool() {
            pos as isize + magnitude
        } else {
            pos as isize - magnitude
        };
        pos = clamp_pos(target, len);
        out.push(pos);
    }
    out
}

/// Move one position up or down within the allowed rows.
fn nudge(pos: usize, len: usize, rng: &mut fastrand::Rng) -> usize {
    if len < 2 {
        return pos;
    }
    if pos == 0 {
        1
    } else if pos + 1 >= len {
        pos - 1
    } else if rng.bool() {
        pos + 1
    } else {
        pos - 1
    }
}

/// Shared finishing pass: break up immediate repeats, pull the ending
/// toward the root, and occasionally rest the last step.
fn post_process(roll: &mut NoteRoll, allowed: &[usize], root: u8, rng: &mut fastrand::Rng) {
    let active: Vec<usize> = (0..STEPS).filter(|&i| roll[i].is_some()).collect();

    // De-repeat
    for pair in active.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if roll[a] == roll[b] && rng.f32() < DEREPEAT_PROB {
            if let Some(pos) = allowed.iter().position(|&row| Some(row as u8) == roll[b]) {
                let next = nudge(pos, allowed.len(), rng);
                roll[b] = Some(allowed[next] as u8);
            }
        }
    }

    // Cadence: land the final two steps on the root
    for step in [STEPS - 2, STEPS - 1] {
        if let Some(row) = roll[step] {
            if rng.f32() < CADENCE_PROB {
                if let Some(target) = nearest_root_row(row as usize, allowed, root) {
                    roll[step] = Some(target as u8);
                }
            }
        }
    }

    // Phrasing rest
    if roll[STEPS - 1].is_some() && rng.f32() < REST_PROB {
        roll[STEPS - 1] = None;
    }
}

fn nearest_root_row(from: usize, allowed: &[usize], root: u8) -> Option<usize> {
    allowed
        .iter()
        .copied()
        .filter(|&row| scale::row_is_root(row, root))
        .min_by_key(|&row| row.abs_diff(from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhythm::{self, RhythmStyle};
    use gridbeat_shared::ROLL_NOTES;

    fn params(scale: ScaleType) -> MelodyParams {
        MelodyParams {
            root: 0,
            scale,
            jump_prob: 0.25,
        }
    }

    #[test]
    fn test_rows_always_in_table_bounds() {
        for seed in 0..200 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let mask = rhythm::generate(RhythmStyle::Euclid, 1 + (seed as usize % STEPS), &mut rng);
            let engine = MelodyEngine::from_index(seed as usize);
            let roll = generate(params(ScaleType::from_index(seed as usize)), &mask, engine, &mut rng);
            for (step, entry) in roll.iter().enumerate() {
                if let Some(row) = entry {
                    assert!(
                        (*row as usize) < ROLL_NOTES.len(),
                        "seed={seed} step={step} row={row}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_rows_stay_in_scale_before_phrasing() {
        // Cadence/rest only move notes within the scale, so every emitted
        // row must carry an allowed pitch class.
        for seed in 0..100 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let mask = rhythm::generate(RhythmStyle::Scatter, 8, &mut rng);
            let p = params(ScaleType::Minor);
            let allowed = scale::allowed_rows(p.root, p.scale);
            let roll = generate(p, &mask, MelodyEngine::Walk, &mut rng);
            for entry in roll.iter().flatten() {
                assert!(allowed.contains(&(*entry as usize)), "seed={seed}");
            }
        }
    }

    #[test]
    fn test_active_steps_get_notes_inactive_stay_silent() {
        let mut rng = fastrand::Rng::with_seed(11);
        let mask = rhythm::euclidean_mask(6);
        let roll = generate(params(ScaleType::Major), &mask, MelodyEngine::Walk, &mut rng);
        for i in 0..STEPS {
            if !mask[i] {
                assert_eq!(roll[i], None, "inactive step {i} got a note");
            } else if i < STEPS - 1 {
                // The final step may have been cleared by the phrasing rest
                assert!(roll[i].is_some(), "active step {i} is silent");
            }
        }
    }

    #[test]
    fn test_empty_mask_is_all_rests() {
        let mut rng = fastrand::Rng::with_seed(3);
        let roll = generate(params(ScaleType::Major), &[false; STEPS], MelodyEngine::Walk, &mut rng);
        assert_eq!(roll, [None; STEPS]);
    }

    #[test]
    fn test_derepeat_changes_the_second_note() {
        // Force adjacent repeats through the post pass and check that every
        // rewrite lands on a different row. Property-based over seeds; at
        // least one seed must take the change branch.
        let allowed = scale::allowed_rows(0, ScaleType::Major);
        let mut changed = 0;
        for seed in 0..64 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let mut roll: NoteRoll = [None; STEPS];
            let row = allowed[3] as u8;
            roll[0] = Some(row);
            roll[1] = Some(row);
            post_process(&mut roll, &allowed, 0, &mut rng);
            assert!(roll[0] == Some(row));
            if let Some(second) = roll[1] {
                if second != row {
                    changed += 1;
                    assert!(allowed.contains(&(second as usize)));
                }
            }
        }
        assert!(changed > 0, "de-repeat never fired across 64 seeds");
    }

    #[test]
    fn test_arp_cycles_within_chord() {
        for seed in 0..32 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let mask = [true; STEPS];
            let roll = generate(params(ScaleType::Pentatonic), &mask, MelodyEngine::ArpBounce, &mut rng);
            let distinct: std::collections::HashSet<u8> = roll.iter().flatten().copied().collect();
            assert!(
                (1..=5).contains(&distinct.len()),
                "seed={seed} chord of {} rows",
                distinct.len()
            );
        }
    }

    #[test]
    fn test_motif_repeats_with_small_variation() {
        for seed in 0..32 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let active: Vec<usize> = (0..STEPS).collect();
            let picks = motif(7, &active, 0.2, &mut rng);
            // Consecutive repetitions differ in at most one slot
            for r in 1..4 {
                let diff = (0..4)
                    .filter(|&s| picks[r * 4 + s] != picks[(r - 1) * 4 + s])
                    .count();
                assert!(diff <= 1, "seed={seed} rep={r} diff={diff}");
            }
        }
    }

    #[test]
    fn test_generator_is_deterministic_per_seed() {
        let mask = rhythm::euclidean_mask(5);
        let a = generate(params(ScaleType::Blues), &mask, MelodyEngine::Bass, &mut fastrand::Rng::with_seed(9));
        let b = generate(params(ScaleType::Blues), &mask, MelodyEngine::Bass, &mut fastrand::Rng::with_seed(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_engine_index_wraps() {
        assert_eq!(MelodyEngine::from_index(0), MelodyEngine::Walk);
        assert_eq!(MelodyEngine::from_index(5), MelodyEngine::Bass);
        assert_eq!(MelodyEngine::from_index(6), MelodyEngine::Walk);
    }
}
