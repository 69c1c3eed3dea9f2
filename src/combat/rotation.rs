//! Priority rotation: picks the next action from resources, debuff timers and the
//! time to the next energy tick. Pure, so it can be tested without a running fight.

use serde::Serialize;

use crate::combat::fighter::{BITE_COST, ENERGY_PER_TICK, INNERVATE_COST, MANGLE_COST, RIP_COST};
use crate::data::strategy::{Builder, Finisher, StrategyConfig};

/// Innervate is skipped this close to the end of the fight.
const INNERVATE_END_MARGIN: f64 = 1.6;
/// Below this energy a shift is always worth it.
const SHIFT_ENERGY_FLOOR: f64 = 10.0;
/// Below this energy Mangle waits on a shift rather than an energy tick.
const MANGLE_SHIFT_ENERGY: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Rip,
    Bite,
    Mangle,
    Shred,
    Claw,
    Shift,
    Innervate,
    Wait,
}

/// Snapshot of everything the rotation looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationContext {
    pub time: f64,
    pub next_tick: f64,
    pub fight_length: f64,
    pub energy: f64,
    pub combo_points: u8,
    pub mana: f64,
    pub shift_cost: f64,
    pub omen_proc: bool,
    pub cat_form: bool,
    pub innervate_ready: bool,
    pub rip_active: bool,
    pub rip_end: f64,
    pub mangle_active: bool,
    pub mangle_end: f64,
}

impl RotationContext {
    pub fn out_of_mana(&self) -> bool {
        self.mana < self.shift_cost
    }

    fn can_afford(&self, cost: f64) -> bool {
        self.omen_proc || self.energy >= cost
    }
}

fn builder_action(strategy: &StrategyConfig) -> Action {
    match strategy.default_builder {
        Builder::Shred => Action::Shred,
        Builder::Claw => Action::Claw,
    }
}

fn innervate_or_shift(ctx: &RotationContext, strategy: &StrategyConfig) -> Action {
    let innervate_threshold = 2.0 * ctx.shift_cost + INNERVATE_COST;
    if strategy.use_innervate
        && ctx.mana <= innervate_threshold
        && ctx.time < ctx.fight_length - INNERVATE_END_MARGIN
        && ctx.innervate_ready
    {
        Action::Innervate
    } else {
        Action::Shift
    }
}

/// Wait for the next energy tick, unless it is further away than `max_wait_time`
/// (zero always waits).
fn wait_or_shift(ctx: &RotationContext, strategy: &StrategyConfig) -> Action {
    if strategy.max_wait_time > 0.0 && ctx.next_tick - ctx.time > strategy.max_wait_time {
        return innervate_or_shift(ctx, strategy);
    }
    Action::Wait
}

pub fn choose_action(ctx: &RotationContext, strategy: &StrategyConfig) -> Action {
    // Innervate leaves cat form; the next decision always shifts back.
    if !ctx.cat_form {
        return Action::Shift;
    }

    let energy = ctx.energy;
    let cp = ctx.combo_points;
    let rips = strategy.finisher == Finisher::Rip;
    let rip_cp = strategy.min_combos_for_rip;

    let rip_trick = strategy.use_rip_trick
        && cp >= strategy.rip_trick_cp
        && energy >= strategy.rip_trick_min;
    let rip_now = rips && !ctx.rip_active && (cp >= rip_cp || rip_trick);

    let bite_finisher = strategy.finisher == Finisher::Bite && cp >= strategy.min_combos_for_bite;
    let biteweave = strategy.use_biteweave
        && rips
        && ctx.rip_active
        && ctx.rip_end - ctx.time >= strategy.bite_time
        && cp >= strategy.min_combos_for_bite;
    let bite_trick = strategy.use_bite_trick
        && ctx.rip_active
        && cp >= strategy.bite_trick_cp
        && energy >= BITE_COST
        && energy <= strategy.bite_trick_max
        && !ctx.omen_proc;
    let bite_now = !rip_now && (bite_finisher || biteweave || bite_trick);

    let mangle_now = !rip_now && !bite_now && !ctx.mangle_active;
    let rip_next = rip_now || (rips && cp >= rip_cp && ctx.rip_end <= ctx.next_tick);
    let mangle_next = !rip_next && (mangle_now || ctx.mangle_end <= ctx.next_tick);

    let builder = builder_action(strategy);
    let builder_cost = strategy.builder_cost();

    if ctx.out_of_mana() || !strategy.powershift {
        // No-shift rotation: act when affordable, otherwise wait for energy.
        return if rip_now && ctx.can_afford(RIP_COST) {
            Action::Rip
        } else if bite_now && ctx.can_afford(BITE_COST) {
            Action::Bite
        } else if mangle_now && ctx.can_afford(MANGLE_COST) {
            Action::Mangle
        } else if !rip_now && !bite_now && !mangle_now && ctx.can_afford(builder_cost) {
            builder
        } else {
            Action::Wait
        };
    }

    if energy < SHIFT_ENERGY_FLOOR {
        return innervate_or_shift(ctx, strategy);
    }
    if rip_now {
        return if ctx.can_afford(RIP_COST) { Action::Rip } else { Action::Wait };
    }
    if bite_now {
        return if ctx.can_afford(BITE_COST) { Action::Bite } else { Action::Wait };
    }
    if mangle_now {
        if energy < MANGLE_SHIFT_ENERGY && !rip_next {
            return innervate_or_shift(ctx, strategy);
        }
        return if ctx.can_afford(MANGLE_COST) { Action::Mangle } else { Action::Wait };
    }
    if energy >= builder_cost - ENERGY_PER_TICK {
        if ctx.can_afford(builder_cost) {
            return builder;
        }
        if strategy.use_mangle_trick && energy >= MANGLE_COST {
            return Action::Mangle;
        }
        return wait_or_shift(ctx, strategy);
    }
    if !rip_next && (energy < MANGLE_SHIFT_ENERGY || !mangle_next) {
        return innervate_or_shift(ctx, strategy);
    }
    Action::Wait
}
