/// Score and lives for one play session, with the eased values the HUD shows.
#[derive(Debug, Clone, PartialEq)]
struct ValueManager {
    score: u32,
    score_visual: f32,
    lives: i32,
    lives_visual: f32,
    time_left_game_over_delay: f32,
    time_left_live_lost: f32,
}

impl ValueManager {
    fn new() -> Self {
        Self {
            score: 0,
            score_visual: 0.0,
            lives: LIVES_START,
            lives_visual: LIVES_START as f32,
            time_left_game_over_delay: 0.0,
            time_left_live_lost: 0.0,
        }
    }

    fn is_game_over(&self) -> bool {
        self.lives < 0
    }

    fn add_score(&mut self, amount: u32) {
        self.score = self.score.saturating_add(amount);
    }

    fn add_life(&mut self) {
        self.lives += 1;
    }

    fn lose_life(&mut self) {
        self.lives -= 1;
        if self.is_game_over() {
            self.time_left_game_over_delay = GAME_OVER_DELAY_SECONDS;
        } else {
            self.time_left_live_lost = LIVE_LOST_DELAY_SECONDS;
        }
    }

    fn is_score_easing(&self) -> bool {
        self.score_visual < self.score as f32
    }

    fn ease(&mut self, dt: f32) {
        let lives = self.lives as f32;
        if self.lives_visual > lives {
            self.lives_visual = (self.lives_visual - LIVES_EASE_PER_SECOND * dt).max(lives);
        } else if self.lives_visual < lives {
            self.lives_visual = lives;
        }

        let score = self.score as f32;
        if self.score_visual < score {
            self.score_visual = (self.score_visual + SCORE_EASE_PER_SECOND * dt).min(score);
        }
    }

    /// Counts the live-lost delay down; true once it has run out.
    fn tick_live_lost(&mut self, dt: f32) -> bool {
        self.time_left_live_lost -= dt;
        self.time_left_live_lost <= 0.0
    }

    fn tick_game_over(&mut self, dt: f32) -> bool {
        self.time_left_game_over_delay -= dt;
        self.time_left_game_over_delay <= 0.0
    }
}
