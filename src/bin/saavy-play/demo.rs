use saavy_engine::sequencing::Timeline;

const PPQ: u32 = 480;
const EIGHTH: u64 = PPQ as u64 / 2;

const LEAD: u8 = 0;
const BASS: u8 = 1;

/// Two bars in C minor: an eighth-note lead over a root/fifth bass.
pub fn timeline(bpm: f64) -> Timeline {
    let melody = [60, 63, 65, 63, 65, 67, 65, 63];
    let bass = [36, 43];

    let mut timeline = Timeline::new(bpm, PPQ)
        .with_bars(2, 4)
        .program(0, LEAD, 81)
        .program(0, BASS, 38)
        .control(0, LEAD, 7, 100);

    for bar in 0..2u64 {
        let bar_start = bar * 4 * PPQ as u64;

        for (step, &key) in melody.iter().enumerate() {
            let tick = bar_start + step as u64 * EIGHTH;
            timeline = timeline.note(tick, EIGHTH * 3 / 4, LEAD, key + bar as u8 * 2, 96);
        }

        for (half, &key) in bass.iter().enumerate() {
            let tick = bar_start + half as u64 * 2 * PPQ as u64;
            timeline = timeline.note(tick, 2 * PPQ as u64, BASS, key, 110);
        }
    }

    // Bend the last lead note up a whole tone and back
    let last = 2 * 4 * PPQ as u64 - EIGHTH;
    timeline
        .pitch_bend(last, LEAD, 8191)
        .pitch_bend(last + EIGHTH - 1, LEAD, 0)
}
