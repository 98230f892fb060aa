/// Horizontal follow camera; the view height never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CameraRig {
    x: f32,
}

impl CameraRig {
    fn new(player_x: f32, map_width: f32) -> Self {
        Self {
            x: Self::target(player_x, map_width),
        }
    }

    fn target(player_x: f32, map_width: f32) -> f32 {
        let min = V_WIDTH / 2.0;
        let max = (map_width - V_WIDTH / 2.0).max(min);
        player_x.clamp(min, max)
    }

    /// Eases toward the player; `None` (dead player) holds position.
    fn follow(&mut self, player_x: Option<f32>, map_width: f32) {
        let Some(player_x) = player_x else {
            return;
        };
        let target = Self::target(player_x, map_width);
        self.x += (target - self.x) * CAMERA_LERP;
        if (target - self.x).abs() < CAMERA_SNAP_DISTANCE {
            self.x = target;
        }
    }

    fn apply(&self, world: &mut SceneWorld) {
        let camera = world.camera_mut();
        camera.position = Vec2::new(self.x, V_HEIGHT / 2.0);
        camera.viewport_width = V_WIDTH;
        camera.viewport_height = V_HEIGHT;
    }
}
