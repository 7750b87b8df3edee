use super::segment::Segment;

/// 依起點排序並合併重疊或相接的區段
#[must_use]
pub fn merge_segments(segments: &[Segment]) -> Vec<Segment> {
    let mut sorted = segments.to_vec();
    sorted.sort_by_key(|s| (s.start, s.end));

    let mut merged: Vec<Segment> = Vec::with_capacity(sorted.len());
    for segment in sorted {
        match merged.last_mut() {
            Some(last) if segment.start <= last.end => {
                last.end = last.end.max(segment.end);
                last.has_motion |= segment.has_motion;
                last.has_objects |= segment.has_objects;
            }
            _ => merged.push(segment),
        }
    }
    merged
}
