use taggame_core::{AgentSnapshot, Vector2};

use crate::arena::Arena;

/// Read-only view handed to a chaser when it picks its velocity.
///
/// `agents` is the roster as it was at the start of the tick, so every chaser
/// sees the same world regardless of roster order.
pub struct SteeringContext<'a> {
    pub agents: &'a [AgentSnapshot],
    /// Roster index of the agent being steered.
    pub me: usize,
    pub arena: &'a Arena,
    pub max_velocity: f64,
    /// Simulation time the chosen velocity will be applied for.
    pub dt: f64,
    /// The tag cooldown is still running at the start of the tick.
    pub tagger_resting: bool,
    pub pursuit_speed_fraction: f64,
    pub flee_speed_fraction: f64,
    pub wall_avoid_margin: f64,
}

/// Distance a pursuing tagger stops inside contact range, so the tag still
/// registers after rounding.
const CONTACT_SLACK: f64 = 1e-6;

/// Below this length the flee heading is treated as cancelled by the walls.
const CORNERED_HEADING: f64 = 0.25;

/// Spread between the fixed escape directions of agents stacked on the arena
/// center.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Built-in chaser heuristic: the tagger pursues the nearest runner once its
/// cooldown has run out, runners flee the tagger.
pub fn chaser_velocity(ctx: &SteeringContext<'_>) -> Vector2 {
    let Some(me) = ctx.agents.get(ctx.me) else {
        return Vector2::ZERO;
    };
    if me.is_tagger() {
        pursue(ctx, me)
    } else {
        flee(ctx, me)
    }
}

/// Index of the runner closest to `me`. Ties go to the earlier roster entry.
pub fn nearest_runner(agents: &[AgentSnapshot], me: usize) -> Option<usize> {
    let origin = agents.get(me)?.position;
    let mut best: Option<(usize, f64)> = None;
    for (i, agent) in agents.iter().enumerate() {
        if i == me || agent.is_tagger() {
            continue;
        }
        let dist = origin.distance(agent.position);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.map(|(i, _)| i)
}

fn pursue(ctx: &SteeringContext<'_>, me: &AgentSnapshot) -> Vector2 {
    // A fresh tagger sleeps off the cooldown, giving the runner that tagged it
    // a head start
    if ctx.tagger_resting {
        return Vector2::ZERO;
    }
    let Some(target) = nearest_runner(ctx.agents, ctx.me) else {
        return Vector2::ZERO;
    };
    let target = &ctx.agents[target];
    // Lead the target by its last velocity, so a runner that keeps moving
    // is met where it ends the tick
    let aim = target.position + target.velocity * ctx.dt;
    let offset = aim - me.position;
    let dist = offset.length();

    let mut speed = ctx.pursuit_speed_fraction * ctx.max_velocity;
    // Arrive at contact range instead of on top of the target
    if ctx.dt > 0.0 {
        let gap = (dist - (me.radius + target.radius) + CONTACT_SLACK).max(0.0);
        speed = speed.min(gap / ctx.dt);
    }
    offset.normalize_or_zero() * speed
}

fn flee(ctx: &SteeringContext<'_>, me: &AgentSnapshot) -> Vector2 {
    let Some(tagger) = ctx.agents.iter().find(|a| a.is_tagger()) else {
        return Vector2::ZERO;
    };
    let mut away = (me.position - tagger.position).normalize_or_zero();
    if away == Vector2::ZERO {
        away = escape_direction(ctx, me);
    }

    let mut heading = away + wall_repulsion(ctx, me);
    if heading.length() < CORNERED_HEADING {
        heading = slide_along_wall(ctx, me, away);
    }
    heading.normalize_or_zero() * (ctx.flee_speed_fraction * ctx.max_velocity)
}

/// Direction for a runner stacked exactly on the tagger: away from the arena
/// center, or a fixed per-roster-slot angle when sitting on the center too.
fn escape_direction(ctx: &SteeringContext<'_>, me: &AgentSnapshot) -> Vector2 {
    let outward = (me.position - ctx.arena.center()).normalize_or_zero();
    if outward != Vector2::ZERO {
        return outward;
    }
    let angle = ctx.me as f64 * GOLDEN_ANGLE;
    Vector2::new(angle.cos(), angle.sin())
}

/// Perpendicular to `away`, on the side facing the arena center.
fn slide_along_wall(ctx: &SteeringContext<'_>, me: &AgentSnapshot, away: Vector2) -> Vector2 {
    let tangent = Vector2::new(-away.y, away.x);
    if tangent.dot(ctx.arena.center() - me.position) < 0.0 {
        -tangent
    } else {
        tangent
    }
}

/// Push away from walls closer than the avoid margin, growing linearly from
/// zero at the margin to one at contact.
fn wall_repulsion(ctx: &SteeringContext<'_>, me: &AgentSnapshot) -> Vector2 {
    let margin = ctx.wall_avoid_margin;
    if margin <= 0.0 {
        return Vector2::ZERO;
    }
    let push = |gap: f64| ((margin - gap) / margin).clamp(0.0, 1.0);

    let p = me.position;
    let left = p.x - me.radius;
    let right = ctx.arena.width - p.x - me.radius;
    let bottom = p.y - me.radius;
    let top = ctx.arena.height - p.y - me.radius;

    Vector2::new(push(left) - push(right), push(bottom) - push(top))
}

#[cfg(test)]
mod tests {
    use taggame_core::Role;
    use taggame_core::test_helpers::make_agent;

    use super::*;

    const ARENA: Arena = Arena {
        width: 800.0,
        height: 600.0,
    };

    fn ctx<'a>(agents: &'a [AgentSnapshot], me: usize, dt: f64) -> SteeringContext<'a> {
        SteeringContext {
            agents,
            me,
            arena: &ARENA,
            max_velocity: 5.0,
            dt,
            tagger_resting: false,
            pursuit_speed_fraction: 1.0,
            flee_speed_fraction: 0.8,
            wall_avoid_margin: 30.0,
        }
    }

    #[test]
    fn tagger_pursues_nearest_runner() {
        let agents = vec![
            make_agent("agent", 700.0, 300.0, 10.0, Role::Runner),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger),
            make_agent("chaser-2", 400.0, 200.0, 10.0, Role::Runner),
        ];
        let v = chaser_velocity(&ctx(&agents, 1, 1.0));
        assert!(v.y < 0.0 && v.x.abs() < 1e-12, "Should head for chaser-2: {v:?}");
        assert!((v.length() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_runner_ties_go_to_roster_order() {
        let agents = vec![
            make_agent("agent", 300.0, 300.0, 10.0, Role::Runner),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger),
            make_agent("chaser-2", 500.0, 300.0, 10.0, Role::Runner),
        ];
        assert_eq!(nearest_runner(&agents, 1), Some(0));
    }

    #[test]
    fn lone_tagger_stands_still() {
        let agents = vec![make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger)];
        assert_eq!(chaser_velocity(&ctx(&agents, 0, 1.0)), Vector2::ZERO);
    }

    #[test]
    fn pursuit_stops_at_contact_range() {
        let agents = vec![
            make_agent("agent", 430.0, 300.0, 10.0, Role::Runner),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger),
        ];
        // 16 units of sim time at speed 5 would cover 80, contact is 10 away
        let v = chaser_velocity(&ctx(&agents, 1, 16.0));
        let travelled = v.x * 16.0;
        assert!(travelled > 10.0 && travelled < 10.0 + 1e-5, "{travelled}");
    }

    #[test]
    fn pursuit_leads_a_moving_runner() {
        let mut runner = make_agent("agent", 440.0, 300.0, 10.0, Role::Runner);
        runner.velocity = Vector2::new(0.0, 2.0);
        let agents = vec![runner, make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger)];
        let v = chaser_velocity(&ctx(&agents, 1, 8.0));
        // Aims at (440, 316), where the runner will be after the tick
        assert!((v.y / v.x - 0.4).abs() < 1e-9, "{v:?}");
        let end = Vector2::new(400.0, 300.0) + v * 8.0;
        let contact = end.distance(Vector2::new(440.0, 316.0));
        assert!(contact <= 20.0 && contact > 20.0 - 1e-5, "{contact}");
    }

    #[test]
    fn touching_tagger_does_not_stack_on_runner() {
        let agents = vec![
            make_agent("agent", 415.0, 300.0, 10.0, Role::Runner),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger),
        ];
        let v = chaser_velocity(&ctx(&agents, 1, 16.0));
        assert!(v.length() * 16.0 <= 1e-5, "Should hold at contact: {v:?}");
    }

    #[test]
    fn resting_tagger_stands_still() {
        let agents = vec![
            make_agent("agent", 700.0, 300.0, 10.0, Role::Runner),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger),
        ];
        let resting = SteeringContext {
            tagger_resting: true,
            ..ctx(&agents, 1, 1.0)
        };
        assert_eq!(chaser_velocity(&resting), Vector2::ZERO);
    }

    #[test]
    fn runner_flees_tagger() {
        let agents = vec![
            make_agent("agent", 300.0, 300.0, 10.0, Role::Tagger),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Runner),
        ];
        let v = chaser_velocity(&ctx(&agents, 1, 1.0));
        assert!(v.x > 0.0);
        assert!(v.y.abs() < 1e-12);
        assert!((v.length() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn runner_on_top_of_tagger_escapes_outward() {
        let agents = vec![
            make_agent("agent", 300.0, 300.0, 10.0, Role::Tagger),
            make_agent("chaser-1", 300.0, 300.0, 10.0, Role::Runner),
        ];
        let v = chaser_velocity(&ctx(&agents, 1, 1.0));
        // Center is at (400, 300), so outward is -x
        assert!((v.x + 4.0).abs() < 1e-9, "{v:?}");
        assert!(v.y.abs() < 1e-12);
    }

    #[test]
    fn stacked_on_center_still_escapes() {
        let agents = vec![
            make_agent("agent", 400.0, 300.0, 10.0, Role::Tagger),
            make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Runner),
        ];
        let v = chaser_velocity(&ctx(&agents, 1, 1.0));
        assert!((v.length() - 4.0).abs() < 1e-9, "{v:?}");
    }

    #[test]
    fn cornered_runner_slides_along_wall() {
        // Tagger to the left, runner pinned against the right wall
        let agents = vec![
            make_agent("agent", 600.0, 300.0, 10.0, Role::Tagger),
            make_agent("chaser-1", 790.0, 300.0, 10.0, Role::Runner),
        ];
        let v = chaser_velocity(&ctx(&agents, 1, 1.0));
        assert!(v.x.abs() <= 1e-12, "Should not push into the wall: {v:?}");
        assert!((v.y.abs() - 4.0).abs() < 1e-9, "Should slide along it: {v:?}");
    }

    #[test]
    fn wall_repulsion_vanishes_in_open_space() {
        let me = make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Runner);
        let agents = [me.clone()];
        assert_eq!(wall_repulsion(&ctx(&agents, 0, 1.0), &me), Vector2::ZERO);
    }
}
