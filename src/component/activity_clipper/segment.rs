/// 活動區段（影格索引，含前後緩衝）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
    pub has_motion: bool,
    pub has_objects: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Idle,
    Open(Segment),
}

/// 將逐幀的動態 / 物件訊號轉為區段
#[derive(Debug)]
pub struct SegmentBuilder {
    buffer_frames: u64,
    state: BuilderState,
    closed: Vec<Segment>,
}

impl SegmentBuilder {
    #[must_use]
    pub const fn new(buffer_frames: u64) -> Self {
        Self {
            buffer_frames,
            state: BuilderState::Idle,
            closed: Vec::new(),
        }
    }

    /// `trunc(buffer_seconds * fps)`
    #[must_use]
    pub fn buffer_frames_for(buffer_seconds: f64, fps: f64) -> u64 {
        (buffer_seconds * fps).max(0.0) as u64
    }

    pub fn observe(&mut self, frame_index: u64, has_motion: bool, has_objects: bool) {
        let active = has_motion || has_objects;

        match &mut self.state {
            BuilderState::Idle if active => {
                self.state = BuilderState::Open(Segment {
                    start: frame_index.saturating_sub(self.buffer_frames),
                    end: frame_index,
                    has_motion,
                    has_objects,
                });
            }
            BuilderState::Idle => {}
            BuilderState::Open(segment) if active => {
                segment.end = segment.end.max(frame_index);
                segment.has_motion |= has_motion;
                segment.has_objects |= has_objects;
            }
            BuilderState::Open(segment) => {
                if frame_index.saturating_sub(segment.end) > self.buffer_frames {
                    let mut closed = *segment;
                    closed.end += self.buffer_frames;
                    self.closed.push(closed);
                    self.state = BuilderState::Idle;
                }
            }
        }
    }

    /// 目前已關閉的區段數（進度回報用）
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    /// 串流結束：關閉仍開啟的區段，結尾不超過最後一幀
    #[must_use]
    pub fn finish(mut self, total_frames: u64) -> Vec<Segment> {
        if let BuilderState::Open(mut segment) = self.state {
            let last_frame = total_frames.saturating_sub(1).max(segment.end);
            segment.end = (segment.end + self.buffer_frames).min(last_frame);
            self.closed.push(segment);
        }
        self.closed
    }
}
