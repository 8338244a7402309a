/// Linear equal-gain crossfade: blends `tail` (end of the previous
/// sentence) into the head of `incoming` over the shorter of the two, and
/// returns the joined signal. Empty `tail` passes `incoming` through.
pub fn linear_crossfade(tail: &[f32], incoming: &[f32]) -> Vec<f32> {
    if tail.is_empty() {
        return incoming.to_vec();
    }
    if incoming.is_empty() {
        return tail.to_vec();
    }

    let overlap = tail.len().min(incoming.len());
    let mut out = Vec::with_capacity(tail.len().max(incoming.len()));

    // Samples of the tail before the overlap region play unmodified.
    out.extend_from_slice(&tail[..tail.len() - overlap]);

    let fade_tail = &tail[tail.len() - overlap..];
    for i in 0..overlap {
        let t = (i + 1) as f32 / (overlap + 1) as f32;
        out.push(fade_tail[i] * (1.0 - t) + incoming[i] * t);
    }
    out.extend_from_slice(&incoming[overlap..]);
    out
}
