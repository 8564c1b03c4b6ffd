use gridbeat_shared::STEPS;

pub type StepMask = [bool; STEPS];

/// Bucket (Bjorklund) spread of `hits` onsets over the 16 steps.
/// `hits = 0` is all-false, `hits = STEPS` all-true.
pub fn euclidean_mask(hits: usize) -> StepMask {
    let hits = hits.min(STEPS);
    let mut mask = [false; STEPS];
    let mut bucket = 0;
    for slot in mask.iter_mut() {
        bucket += hits;
        if bucket >= STEPS {
            bucket -= STEPS;
            *slot = true;
        }
    }
    mask
}

/// Rotate right by `amount` steps. Preserves the onset count.
pub fn rotate(mask: StepMask, amount: usize) -> StepMask {
    let mut out = [false; STEPS];
    for (i, &on) in mask.iter().enumerate() {
        out[(i + amount) % STEPS] = on;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmStyle {
    /// Euclidean spread with a uniformly random rotation.
    Euclid,
    /// Fixed offbeat 8ths, remaining steps filled probabilistically.
    OffbeatFill,
    /// One of a few fixed syncopated index sets, lightly rotated.
    Syncopated,
    /// `hits` steps drawn uniformly at random.
    Scatter,
}

impl RhythmStyle {
    const ALL: [RhythmStyle; 4] = [
        RhythmStyle::Euclid,
        RhythmStyle::OffbeatFill,
        RhythmStyle::Syncopated,
        RhythmStyle::Scatter,
    ];

    /// Lookup by index, wrapping out-of-range values into the valid set.
    pub fn from_index(idx: usize) -> RhythmStyle {
        Self::ALL[idx % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RhythmStyle::Euclid => "Euclid",
            RhythmStyle::OffbeatFill => "Offbeat",
            RhythmStyle::Syncopated => "Syncopated",
            RhythmStyle::Scatter => "Scatter",
        }
    }
}

const OFFBEATS: [usize; 4] = [2, 6, 10, 14];

const SYNCOPATED_SETS: [&[usize]; 3] = [
    &[0, 3, 6, 10, 12],
    &[0, 4, 7, 10, 14],
    &[2, 5, 8, 11, 14],
];

pub fn generate(style: RhythmStyle, hits: usize, rng: &mut fastrand::Rng) -> StepMask {
    let hits = hits.min(STEPS);
    match style {
        RhythmStyle::Euclid => rotate(euclidean_mask(hits), rng.usize(0..STEPS)),
        RhythmStyle::OffbeatFill => offbeat_fill(hits, rng),
        RhythmStyle::Syncopated => syncopated(rng),
        RhythmStyle::Scatter => scatter(hits, rng),
    }
}

fn offbeat_fill(hits: usize, rng: &mut fastrand::Rng) -> StepMask {
    let mut mask = [false; STEPS];
    for i in OFFBEATS {
        mask[i] = true;
    }
    let fill = hits as f32 / STEPS as f32;
    for (i, slot) in mask.iter_mut().enumerate() {
        if !OFFBEATS.contains(&i) && rng.f32() < fill {
            *slot = true;
        }
    }
    mask
}

fn syncopated(rng: &mut fastrand::Rng) -> StepMask {
    let set = SYNCOPATED_SETS[rng.usize(0..SYNCOPATED_SETS.len())];
    let mut mask = [false; STEPS];
    for &i in set {
        mask[i] = true;
    }
    rotate(mask, rng.usize(0..3))
}

fn scatter(hits: usize, rng: &mut fastrand::Rng) -> StepMask {
    let mut indices: Vec<usize> = (0..STEPS).collect();
    rng.shuffle(&mut indices);
    let mut mask = [false; STEPS];
    for &i in indices.iter().take(hits) {
        mask[i] = true;
    }
    mask
}
