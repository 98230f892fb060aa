//! Key-frame selection for frame-list animations.
//!
//! Frame numbers are derived from elapsed state time exactly like a libGDX
//! `Animation`: `frame = floor(state_time / frame_duration)`, then folded by
//! the play mode.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayMode {
    #[default]
    Normal,
    Reversed,
    Loop,
    LoopReversed,
    LoopPingPong,
}

impl PlayMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "normal" => Some(Self::Normal),
            "reversed" => Some(Self::Reversed),
            "loop" => Some(Self::Loop),
            "loop_reversed" => Some(Self::LoopReversed),
            "loop_pingpong" => Some(Self::LoopPingPong),
            _ => None,
        }
    }

    pub fn is_looping(self) -> bool {
        matches!(self, Self::Loop | Self::LoopReversed | Self::LoopPingPong)
    }

    /// Play mode used when the caller forces looping on or off.
    pub fn with_looping(self, looping: bool) -> Self {
        match (looping, self) {
            (true, Self::Normal) => Self::Loop,
            (true, Self::Reversed) => Self::LoopReversed,
            (true, other) => other,
            (false, Self::LoopReversed) => Self::Reversed,
            (false, other) if other.is_looping() => Self::Loop,
            (false, other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation<T> {
    frames: Vec<T>,
    frame_duration: f32,
    play_mode: PlayMode,
}

impl<T> Animation<T> {
    pub fn new(frame_duration: f32, frames: Vec<T>, play_mode: PlayMode) -> Self {
        let frame_duration = if frame_duration.is_finite() && frame_duration > 0.0 {
            frame_duration
        } else {
            f32::EPSILON
        };
        Self {
            frames,
            frame_duration,
            play_mode,
        }
    }

    pub fn single(frame: T) -> Self {
        Self::new(1.0, vec![frame], PlayMode::Normal)
    }

    pub fn frames(&self) -> &[T] {
        &self.frames
    }

    pub fn frame_duration(&self) -> f32 {
        self.frame_duration
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn duration(&self) -> f32 {
        self.frames.len() as f32 * self.frame_duration
    }

    pub fn key_frame_index(&self, state_time: f32) -> usize {
        key_frame_index_for(
            self.frames.len(),
            self.frame_number(state_time),
            self.play_mode,
        )
    }

    /// Frame for the animation's own play mode.
    pub fn key_frame(&self, state_time: f32) -> Option<&T> {
        self.frames.get(self.key_frame_index(state_time))
    }

    pub fn key_frame_looping(&self, state_time: f32, looping: bool) -> Option<&T> {
        let mode = self.play_mode.with_looping(looping);
        let index = key_frame_index_for(self.frames.len(), self.frame_number(state_time), mode);
        self.frames.get(index)
    }

    pub fn is_finished(&self, state_time: f32) -> bool {
        match self.frames.len().checked_sub(1) {
            Some(last) => last < self.frame_number(state_time),
            None => true,
        }
    }

    fn frame_number(&self, state_time: f32) -> usize {
        if !state_time.is_finite() || state_time <= 0.0 {
            return 0;
        }
        (state_time / self.frame_duration) as usize
    }
}

fn key_frame_index_for(len: usize, frame_number: usize, mode: PlayMode) -> usize {
    if len <= 1 {
        return 0;
    }

    match mode {
        PlayMode::Normal => frame_number.min(len - 1),
        PlayMode::Loop => frame_number % len,
        PlayMode::LoopPingPong => {
            let folded = frame_number % (len * 2 - 2);
            if folded >= len {
                len - 2 - (folded - len)
            } else {
                folded
            }
        }
        PlayMode::Reversed => len.saturating_sub(frame_number + 1),
        PlayMode::LoopReversed => len - (frame_number % len) - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(count: usize) -> Vec<usize> {
        (0..count).collect()
    }

    fn sequence(animation: &Animation<usize>, steps: usize) -> Vec<usize> {
        (0..steps)
            .map(|step| animation.key_frame_index(step as f32 * animation.frame_duration() + 0.001))
            .collect()
    }

    #[test]
    fn normal_holds_last_frame() {
        let animation = Animation::new(0.1, frames(3), PlayMode::Normal);
        assert_eq!(sequence(&animation, 6), vec![0, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn loop_wraps_around() {
        let animation = Animation::new(0.1, frames(3), PlayMode::Loop);
        assert_eq!(sequence(&animation, 7), vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn ping_pong_bounces_without_repeating_ends() {
        let animation = Animation::new(0.1, frames(4), PlayMode::LoopPingPong);
        assert_eq!(sequence(&animation, 9), vec![0, 1, 2, 3, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn reversed_plays_once_backwards() {
        let animation = Animation::new(0.1, frames(3), PlayMode::Reversed);
        assert_eq!(sequence(&animation, 5), vec![2, 1, 0, 0, 0]);
    }

    #[test]
    fn loop_reversed_wraps_backwards() {
        let animation = Animation::new(0.1, frames(3), PlayMode::LoopReversed);
        assert_eq!(sequence(&animation, 6), vec![2, 1, 0, 2, 1, 0]);
    }

    #[test]
    fn single_frame_always_returns_first() {
        let animation = Animation::new(0.1, frames(1), PlayMode::LoopPingPong);
        assert_eq!(animation.key_frame_index(50.0), 0);
    }

    #[test]
    fn forced_looping_promotes_one_shot_modes() {
        assert_eq!(PlayMode::Normal.with_looping(true), PlayMode::Loop);
        assert_eq!(PlayMode::Reversed.with_looping(true), PlayMode::LoopReversed);
        assert_eq!(
            PlayMode::LoopPingPong.with_looping(true),
            PlayMode::LoopPingPong
        );
    }

    #[test]
    fn forced_non_looping_demotes_loop_modes() {
        assert_eq!(PlayMode::LoopReversed.with_looping(false), PlayMode::Reversed);
        assert_eq!(PlayMode::LoopPingPong.with_looping(false), PlayMode::Loop);
        assert_eq!(PlayMode::Loop.with_looping(false), PlayMode::Loop);
        assert_eq!(PlayMode::Normal.with_looping(false), PlayMode::Normal);
    }

    #[test]
    fn key_frame_looping_uses_promoted_mode() {
        let animation = Animation::new(0.5, vec!["a", "b"], PlayMode::Normal);
        assert_eq!(animation.key_frame(1.6), Some(&"b"));
        assert_eq!(animation.key_frame_looping(1.6, true), Some(&"b"));
        assert_eq!(animation.key_frame_looping(1.1, true), Some(&"a"));
    }

    #[test]
    fn is_finished_after_last_frame_elapses() {
        let animation = Animation::new(0.1, frames(3), PlayMode::Normal);
        assert!(!animation.is_finished(0.25));
        assert!(animation.is_finished(0.31));
    }

    #[test]
    fn empty_animation_yields_no_frame() {
        let animation: Animation<usize> = Animation::new(0.1, Vec::new(), PlayMode::Loop);
        assert_eq!(animation.key_frame(1.0), None);
        assert!(animation.is_finished(0.0));
    }

    #[test]
    fn negative_and_nan_state_time_start_at_first_frame() {
        let animation = Animation::new(0.1, frames(3), PlayMode::Loop);
        assert_eq!(animation.key_frame_index(-1.0), 0);
        assert_eq!(animation.key_frame_index(f32::NAN), 0);
    }

    #[test]
    fn play_mode_parse_accepts_known_tokens() {
        assert_eq!(PlayMode::parse("loop_pingpong"), Some(PlayMode::LoopPingPong));
        assert_eq!(PlayMode::parse("bounce"), None);
    }
}
