/// Routes the contacts reported by the last physics steps to the actors
/// involved. Handlers only flip flags and queue destruction; bodies are
/// removed by the owning actor's next update.
fn dispatch_contacts(
    level: &mut Level,
    contacts: &[Contact],
    values: &mut ValueManager,
    indicators: &mut ScoreIndicators,
) {
    for contact in contacts {
        dispatch_contact(level, contact, values, indicators);
    }
}

fn pair(contact: &Contact, first: FixtureRole, second: FixtureRole) -> Option<(u64, u64)> {
    contact
        .match_roles(first.id(), second.id())
        .map(|(a, b)| (a.owner, b.owner))
}

fn dispatch_contact(
    level: &mut Level,
    contact: &Contact,
    values: &mut ValueManager,
    indicators: &mut ScoreIndicators,
) {
    let begin = contact.is_begin();

    for solid in [FixtureRole::Ground, FixtureRole::Crate] {
        if pair(contact, FixtureRole::PlayerFoot, solid).is_some() {
            let player = &mut level.player;
            if begin {
                player.foot_contacts += 1;
            } else {
                player.foot_contacts = player.foot_contacts.saturating_sub(1);
            }
            return;
        }
        if let Some((id, _)) = pair(contact, FixtureRole::RobotFoot, solid) {
            if let Some(robot) = level.robot_mut(id) {
                robot.track_ground(begin);
            }
            return;
        }
    }

    if pair(contact, FixtureRole::PlayerBody, FixtureRole::Ladder).is_some() {
        let player = &mut level.player;
        if begin {
            player.ladder_contacts += 1;
        } else {
            player.ladder_contacts = player.ladder_contacts.saturating_sub(1);
        }
        return;
    }

    for kind in [PickupKind::Coin, PickupKind::Feather] {
        if let Some((_, id)) = pair(contact, FixtureRole::PlayerBody, kind.role()) {
            if begin && !level.player.is_dead() {
                let collected = level
                    .pickup_mut(id)
                    .is_some_and(|pickup| pickup.collect(values, indicators));
                if collected && kind == PickupKind::Feather {
                    level.player.grant_feather();
                }
            }
            return;
        }
    }

    if let Some((_, id)) = pair(contact, FixtureRole::PlayerBody, FixtureRole::ZombieSensor) {
        let Level {
            physics,
            player,
            zombies,
            ..
        } = level;
        if let Some(zombie) = zombies.iter_mut().find(|zombie| zombie.core.id == id) {
            if begin {
                zombie.attack(player, physics, values);
            } else {
                zombie.stop_attack();
            }
        }
        return;
    }

    if let Some((_, id)) = pair(contact, FixtureRole::PlayerBody, FixtureRole::RobotBody) {
        if let Some(robot) = level.robot_mut(id) {
            robot.set_touching_player(begin);
        }
        return;
    }

    if let Some((_, id)) = pair(contact, FixtureRole::PlayerBody, FixtureRole::Bullet) {
        if begin {
            let live = level.projectile_mut(id).is_some_and(|bullet| {
                let live = bullet.is_live();
                bullet.expire();
                live
            });
            if live {
                level.player.die(&mut level.physics, values);
            }
        }
        return;
    }

    for (sensor, right_side) in [
        (FixtureRole::PlayerAttackLeft, false),
        (FixtureRole::PlayerAttackRight, true),
    ] {
        for target in [FixtureRole::ZombieBody, FixtureRole::RobotBody, FixtureRole::Crate] {
            if let Some((_, id)) = pair(contact, sensor, target) {
                level
                    .player
                    .track_attack_target(right_side, (target, id), begin);
                return;
            }
        }
    }

    for target in [
        FixtureRole::ZombieBody,
        FixtureRole::RobotBody,
        FixtureRole::Crate,
        FixtureRole::Ground,
    ] {
        if let Some((kunai, id)) = pair(contact, FixtureRole::Kunai, target) {
            if begin {
                let live = level.projectile_mut(kunai).is_some_and(|projectile| {
                    let live = projectile.is_live();
                    projectile.expire();
                    live
                });
                if live {
                    strike(level, (target, id), values, indicators);
                }
            }
            return;
        }
    }

    for target in [FixtureRole::Ground, FixtureRole::Crate] {
        if let Some((bullet, _)) = pair(contact, FixtureRole::Bullet, target) {
            if begin {
                if let Some(projectile) = level.projectile_mut(bullet) {
                    projectile.expire();
                }
            }
            return;
        }
    }

    if !begin {
        return;
    }
    for obstacle in [FixtureRole::Boundary, FixtureRole::Crate] {
        if let Some((id, _)) = pair(contact, FixtureRole::ZombieBody, obstacle) {
            if let Some(zombie) = level.zombie_mut(id) {
                zombie.reverse();
            }
            return;
        }
    }
    if let Some((id, _)) = pair(contact, FixtureRole::RobotBody, FixtureRole::Boundary) {
        if let Some(robot) = level.robot_mut(id) {
            robot.reverse();
        }
        return;
    }
    if let Some((id, _)) = pair(contact, FixtureRole::RobotBody, FixtureRole::Crate) {
        if let Some(robot) = level.robot_mut(id) {
            robot.request_jump();
        }
    }
}

/// Melee or kunai hit on an enemy or crate. Ground hits only stop the kunai.
fn strike(
    level: &mut Level,
    (role, id): AttackTarget,
    values: &mut ValueManager,
    indicators: &mut ScoreIndicators,
) {
    match role {
        FixtureRole::ZombieBody => {
            let Level {
                physics, zombies, ..
            } = level;
            if let Some(zombie) = zombies.iter_mut().find(|zombie| zombie.core.id == id) {
                zombie.killed(physics);
            }
        }
        FixtureRole::RobotBody => {
            let Level {
                physics, robots, ..
            } = level;
            if let Some(robot) = robots.iter_mut().find(|robot| robot.core.id == id) {
                robot.hit(physics);
            }
        }
        FixtureRole::Crate => {
            if let Some(item) = level.crate_mut(id) {
                item.smash(values, indicators);
            }
        }
        _ => {}
    }
}

/// Kills whatever sits in the facing attack sensor while a melee swing runs.
fn resolve_player_melee(
    level: &mut Level,
    values: &mut ValueManager,
    indicators: &mut ScoreIndicators,
) {
    for target in level.player.take_melee_targets() {
        strike(level, target, values, indicators);
    }
}
